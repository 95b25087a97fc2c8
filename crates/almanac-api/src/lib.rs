//! Almanac API: REST endpoints, agent messages and the daily scheduler
pub mod agents;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod scheduler;
pub mod state;

pub use agents::{Agent, AgentError, AgentRegistry};
pub use config::AppConfig;
pub use state::AppState;

use almanac_stages::history_pipeline;
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/v1/health", get(handlers::health))
        .route("/v1/pipeline", get(handlers::describe_pipeline))
        .route("/v1/pipeline/run", post(handlers::run_pipeline))
        .route("/a2a/message", post(handlers::a2a_message))
        .route("/a2a/agents/{agent_id}/message", post(handlers::a2a_agent_message))
        .route("/a2a/ping", post(handlers::a2a_ping))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wires adapters, pipeline and agents from `config`
pub fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let client = config.http_client()?;
    let facts = config.fact_source(client.clone());
    let generator = config.text_generator(client);

    let pipeline = history_pipeline(facts, generator.clone(), config.today()?)?;
    let agents = AgentRegistry::with_defaults(generator);
    let metrics = metrics::Metrics::new().context("registering metrics")?;
    Ok(AppState::new(pipeline, agents, metrics))
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    tracing::info!(
        pipeline = %state.pipeline.id(),
        route = %state.pipeline.route(),
        fact_source = ?config.fact_source,
        generator = ?config.generator,
        "almanac ready"
    );

    let schedule = if config.schedule {
        Some(scheduler::spawn_daily(state.clone(), config.schedule_at, config.offset()?))
    } else {
        None
    };

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;

    tracing::info!("Almanac API listening on {}", config.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await
        .context("server error")?;

    if let Some(handle) = schedule {
        handle.abort();
    }
    Ok(())
}
