//! Declared shapes: the field contracts steps publish for their input and output
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::error::ConfigError;

/// Type of a single declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Array, optionally with a declared item type
    Array(Option<Box<FieldType>>),
    Object,
    Any,
}

impl FieldType {
    pub fn array_of(item: FieldType) -> Self {
        FieldType::Array(Some(Box::new(item)))
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Any => true,
            Self::Array(item) => match (value.as_array(), item) {
                (Some(values), Some(item)) => values.iter().all(|v| item.matches(v)),
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }

    fn from_doc(doc: &PropertyDoc) -> Result<Self, String> {
        let kind = doc.kind.as_deref().unwrap_or("any");
        Ok(match kind {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "any" => Self::Any,
            "array" => match &doc.items {
                Some(items) => Self::array_of(Self::from_doc(items)?),
                None => Self::Array(None),
            },
            other => return Err(format!("unsupported type `{}`", other)),
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Object => write!(f, "object"),
            Self::Any => write!(f, "any"),
            Self::Array(None) => write!(f, "array"),
            Self::Array(Some(item)) => write!(f, "array<{}>", item),
        }
    }
}

/// JSON type name of a concrete value, used in mismatch reports
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
}

/// A single contract breach found while checking a mapping against a shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("missing required field `{field}`")]
    Missing { field: String },

    #[error("field `{field}` expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("undeclared field `{field}`")]
    Undeclared { field: String },

    /// The initial input as a whole is not a JSON object
    #[error("input must be a JSON object, found {found}")]
    NotAMapping { found: String },
}

impl Violation {
    /// Offending field, if the breach concerns one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Missing { field } | Self::TypeMismatch { field, .. } | Self::Undeclared { field } => Some(field),
            Self::NotAMapping { .. } => None,
        }
    }
}

/// Every violation found in one check, in field declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().filter_map(Violation::field).collect()
    }

    fn into_result<T>(self, ok: T) -> Result<T, Violations> {
        if self.0.is_empty() {
            Ok(ok)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Declared shape of a mapping.
///
/// An empty shape accepts anything. A strict shape additionally rejects keys
/// it does not declare; step outputs are always checked strictly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shape {
    fields: Vec<Field>,
    strict: bool,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.push(name.into(), ty, true);
        self
    }

    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.push(name.into(), ty, false);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn push(&mut self, name: String, ty: FieldType, required: bool) {
        self.fields.retain(|f| f.name != name);
        self.fields.push(Field { name, ty, required });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Loads a shape from a JSON Schema subset: an `object` with
    /// `properties`, `required`, optional `items` and `additionalProperties`.
    pub fn from_json_schema(name: &str, bytes: &[u8]) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSchema {
            schema: name.to_string(),
            reason,
        };

        let doc: SchemaDoc = serde_json::from_slice(bytes).map_err(|e| invalid(e.to_string()))?;
        if let Some(kind) = doc.kind.as_deref() {
            if kind != "object" {
                return Err(invalid(format!("top-level type must be object, got `{}`", kind)));
            }
        }
        if let Some(unknown) = doc.required.iter().find(|r| !doc.properties.contains_key(*r)) {
            return Err(invalid(format!("required field `{}` has no property", unknown)));
        }

        let mut shape = Shape::new();
        for (field, property) in &doc.properties {
            let ty = FieldType::from_doc(property).map_err(|e| invalid(format!("{}: {}", field, e)))?;
            let required = doc.required.iter().any(|r| r == field);
            shape.push(field.clone(), ty, required);
        }
        shape.strict = !doc.additional_properties;
        Ok(shape)
    }

    /// Extracts the declared fields present in `source`, checking types and
    /// required presence. Keys the shape does not declare are left behind.
    pub fn extract(&self, source: &Map<String, Value>) -> Result<Map<String, Value>, Violations> {
        let mut violations = Violations::default();
        let mut extracted = Map::new();

        for field in &self.fields {
            match source.get(&field.name) {
                Some(value) if field.ty.matches(value) => {
                    extracted.insert(field.name.clone(), value.clone());
                }
                Some(Value::Null) if !field.required => {}
                Some(value) => violations.0.push(Violation::TypeMismatch {
                    field: field.name.clone(),
                    expected: field.ty.to_string(),
                    found: json_kind(value),
                }),
                None if field.required => violations.0.push(Violation::Missing {
                    field: field.name.clone(),
                }),
                None => {}
            }
        }

        violations.into_result(extracted)
    }

    /// Checks a caller-supplied mapping. Same as [`Shape::extract`], plus
    /// undeclared keys are violations when the shape is strict.
    pub fn check_input(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, Violations> {
        let extracted = self.extract(input);
        let mut undeclared = self.undeclared(input);
        match extracted {
            Ok(map) => undeclared.into_result(map),
            Err(mut violations) => {
                violations.0.append(&mut undeclared.0);
                Err(violations)
            }
        }
    }

    /// Checks a step's output: declared types, required presence, and no
    /// undeclared keys regardless of strictness.
    pub fn check_output(&self, output: &Map<String, Value>) -> Result<(), Violations> {
        let mut violations = match self.extract(output) {
            Ok(_) => Violations::default(),
            Err(v) => v,
        };
        for key in output.keys().filter(|k| !self.declares(k)) {
            violations.0.push(Violation::Undeclared { field: key.clone() });
        }
        violations.into_result(())
    }

    fn undeclared(&self, input: &Map<String, Value>) -> Violations {
        if !self.strict {
            return Violations::default();
        }
        Violations(
            input
                .keys()
                .filter(|k| !self.declares(k))
                .map(|k| Violation::Undeclared { field: k.clone() })
                .collect(),
        )
    }
}

#[derive(Deserialize)]
struct SchemaDoc {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, PropertyDoc>,
    #[serde(default)]
    required: Vec<String>,
    #[serde(rename = "additionalProperties", default = "allow_additional")]
    additional_properties: bool,
}

fn allow_additional() -> bool {
    true
}

#[derive(Deserialize)]
struct PropertyDoc {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    items: Option<Box<PropertyDoc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_shape_accepts_anything() {
        let shape = Shape::empty();
        assert!(shape.extract(&Map::new()).unwrap().is_empty());
        assert!(shape.check_input(&map(json!({ "x": 1 }))).unwrap().is_empty());
    }

    #[test]
    fn test_extract_reports_missing_and_mismatch() {
        let shape = Shape::new()
            .required("events", FieldType::String)
            .required("count", FieldType::Integer);

        let err = shape.extract(&map(json!({ "count": "three" }))).unwrap_err();
        assert_eq!(err.fields(), vec!["events", "count"]);
        assert!(matches!(err.0[0], Violation::Missing { .. }));
        assert!(matches!(err.0[1], Violation::TypeMismatch { found: "string", .. }));
    }

    #[test]
    fn test_extract_leaves_undeclared_keys_behind() {
        let shape = Shape::new().required("events", FieldType::String);
        let out = shape.extract(&map(json!({ "events": "a", "other": 1 }))).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["events"], "a");
    }

    #[test]
    fn test_optional_null_is_treated_as_absent() {
        let shape = Shape::new().optional("date", FieldType::String);
        let out = shape.extract(&map(json!({ "date": null }))).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_strict_input_rejects_unknown_keys() {
        let shape = Shape::new().optional("date", FieldType::String).strict();
        let err = shape.check_input(&map(json!({ "dat": "today" }))).unwrap_err();
        assert_eq!(err.0, vec![Violation::Undeclared { field: "dat".into() }]);
    }

    #[test]
    fn test_output_is_always_strict() {
        let shape = Shape::new().required("summary", FieldType::String);
        assert!(shape.check_output(&map(json!({ "summary": "ok" }))).is_ok());

        let err = shape
            .check_output(&map(json!({ "summary": "ok", "events": "leak" })))
            .unwrap_err();
        assert_eq!(err.fields(), vec!["events"]);
    }

    #[test]
    fn test_typed_arrays() {
        let ty = FieldType::array_of(FieldType::Object);
        assert!(ty.matches(&json!([])));
        assert!(ty.matches(&json!([{ "year": 1918 }])));
        assert!(!ty.matches(&json!([1, 2])));
        assert_eq!(ty.to_string(), "array<object>");
    }

    #[test]
    fn test_from_json_schema() {
        let doc = br#"{
            "type": "object",
            "properties": {
                "events": { "type": "string" },
                "facts": { "type": "array", "items": { "type": "object" } }
            },
            "required": ["events"],
            "additionalProperties": false
        }"#;

        let shape = Shape::from_json_schema("fetch.out", doc).unwrap();
        assert!(shape.is_strict());
        assert!(shape.field("events").unwrap().required);
        assert!(!shape.field("facts").unwrap().required);
        assert_eq!(shape.field("facts").unwrap().ty, FieldType::array_of(FieldType::Object));
    }

    #[test]
    fn test_from_json_schema_rejects_bad_documents() {
        let not_object = br#"{ "type": "string" }"#;
        assert!(matches!(
            Shape::from_json_schema("bad", not_object),
            Err(ConfigError::InvalidSchema { .. })
        ));

        let dangling = br#"{ "type": "object", "properties": {}, "required": ["x"] }"#;
        assert!(Shape::from_json_schema("bad", dangling).is_err());

        let unknown_type = br#"{ "properties": { "x": { "type": "date" } } }"#;
        assert!(Shape::from_json_schema("bad", unknown_type).is_err());
    }
}
