//! API Handlers
use almanac_core::{ErrorKind, RunResult, ALMANAC_VERSION};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agents::{AgentError, TODAY_IN_HISTORY_AGENT};
use crate::state::AppState;

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "almanac-api", "version": ALMANAC_VERSION })),
    )
}

pub async fn describe_pipeline(State(state): State<AppState>) -> Json<Value> {
    let pipeline = &state.pipeline;
    Json(json!({
        "id": pipeline.id(),
        "steps": pipeline.step_ids(),
        "input": pipeline.input_shape().field_names().collect::<Vec<_>>(),
        "output": pipeline.output_shape().field_names().collect::<Vec<_>>(),
        "deterministic": pipeline.deterministic(),
        "agents": state.agents.ids(),
    }))
}

fn run_status(result: &RunResult) -> StatusCode {
    match result.error_kind() {
        None => StatusCode::OK,
        Some(ErrorKind::InputValidationError) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorKind::OutputValidationError) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(ErrorKind::StepExecutionError) => StatusCode::BAD_GATEWAY,
    }
}

/// Runs the pipeline once with the request body as initial input. A missing
/// body is an empty input; a body that is not a JSON object is reported as
/// an input validation failure like any other.
pub async fn run_pipeline(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<RunResult>) {
    let result: RunResult = state.pipeline.run_json(&body).await.into();
    state.metrics.record_run("http", &result);
    (run_status(&result), Json(result))
}

/// Inbound agent message. The text may arrive as `message`, `text` or
/// `content`; the first non-blank one wins.
#[derive(Debug, Default)]
pub struct A2aRequest {
    pub message: Option<String>,
    pub text: Option<String>,
    pub content: Option<String>,
    pub channel_id: Option<String>,
    pub user_id: Option<String>,
    pub agent: Option<String>,
}

impl A2aRequest {
    /// Reads whatever the body offers. An empty or malformed body, or a
    /// field that is not a string, counts as absent.
    pub fn from_body(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| value.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        };

        Self {
            message: field(&["message"]),
            text: field(&["text"]),
            content: field(&["content"]),
            channel_id: field(&["channel_id", "channelId"]),
            user_id: field(&["user_id", "userId"]),
            agent: field(&["agent"]),
        }
    }

    pub fn text(&self) -> &str {
        [&self.message, &self.text, &self.content]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("today")
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct A2aResponse {
    pub response: String,
    pub success: bool,
    pub agent: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn a2a_message(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<A2aResponse>) {
    let req = A2aRequest::from_body(&body);
    let agent = req.agent.clone().unwrap_or_else(|| TODAY_IN_HISTORY_AGENT.to_string());
    respond(&state, &agent, &req).await
}

pub async fn a2a_agent_message(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<A2aResponse>) {
    respond(&state, &agent_id, &A2aRequest::from_body(&body)).await
}

async fn respond(state: &AppState, agent: &str, req: &A2aRequest) -> (StatusCode, Json<A2aResponse>) {
    let request_id = uuid::Uuid::new_v4();
    let message = req.text();
    tracing::info!(
        %request_id,
        agent,
        user = req.user_id.as_deref().unwrap_or("-"),
        channel = req.channel_id.as_deref().unwrap_or("-"),
        "agent request"
    );

    let (status, response, error) = match state.agents.respond(agent, message).await {
        Ok(text) => {
            state.metrics.record_agent(agent, "ok");
            (StatusCode::OK, text, None)
        }
        Err(err) => {
            tracing::warn!(%request_id, agent, error = %err, "agent request failed");
            let status = match &err {
                AgentError::UnknownAgent(_) => {
                    state.metrics.record_agent("unknown", "unknown_agent");
                    StatusCode::NOT_FOUND
                }
                AgentError::Generation { .. } => {
                    state.metrics.record_agent(agent, "error");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, err.fallback_reply().to_string(), Some(err.to_string()))
        }
    };

    let body = A2aResponse {
        response,
        success: error.is_none(),
        agent: agent.to_string(),
        timestamp: Utc::now(),
        error,
    };
    (status, Json(body))
}

pub async fn a2a_ping() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "agent": TODAY_IN_HISTORY_AGENT,
            "timestamp": Utc::now(),
        })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a2a_text_precedence() {
        let req = A2aRequest::from_body(br#"{ "text": "history 6 12", "content": "x" }"#);
        assert_eq!(req.text(), "history 6 12");

        let req = A2aRequest::from_body(br#"{ "message": "  ", "content": "11/11" }"#);
        assert_eq!(req.text(), "11/11");

        assert_eq!(A2aRequest::default().text(), "today");
    }

    #[test]
    fn test_a2a_camel_case_ids() {
        let req = A2aRequest::from_body(br#"{ "channelId": "c1", "user_id": "u1" }"#);
        assert_eq!(req.channel_id.as_deref(), Some("c1"));
        assert_eq!(req.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_a2a_lenient_body() {
        for body in [&b""[..], b"not json", b"[1, 2]", br#"{ "message": 5, "agent": null }"#] {
            let req = A2aRequest::from_body(body);
            assert_eq!(req.text(), "today");
            assert!(req.agent.is_none());
        }
        let req = A2aRequest::from_body(br#"{ "message": 5, "text": "11/11" }"#);
        assert_eq!(req.text(), "11/11");
    }
}
