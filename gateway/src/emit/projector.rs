//! Column projection
//!
//! Picks and orders the header values an encoder writes. With a column list,
//! every listed column appears in the output, in list order, with `None` for
//! values that could not be found. With `json_body`, a JSON object body backs
//! columns the headers do not carry.

use crate::config::SerializerConfig;
use crate::event::Event;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

/// Projected header map; `None` marks a column with no value
pub type Projected = IndexMap<String, Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnProjector {
    columns: Option<Vec<String>>,
    json_body: bool,
}

impl ColumnProjector {
    pub fn new(columns: Option<Vec<String>>, json_body: bool) -> Self {
        Self { columns, json_body }
    }

    pub fn from_config(config: &SerializerConfig) -> Self {
        Self::new(config.columns.clone(), config.json_body)
    }

    /// Project an event's headers (and JSON body fields, when enabled)
    pub fn project(&self, event: &Event) -> Projected {
        let body = if self.json_body {
            body_fields(event)
        } else {
            Map::new()
        };

        match &self.columns {
            Some(columns) => columns
                .iter()
                .map(|key| {
                    let value = match event.headers.get(key) {
                        Some(value) => Some(value.clone()),
                        None => body.get(key).and_then(|v| field_text(key, v)),
                    };
                    (key.clone(), value)
                })
                .collect(),
            None => {
                let mut projected: Projected = event
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), Some(v.clone())))
                    .collect();
                for (key, value) in &body {
                    if !projected.contains_key(key) {
                        projected.insert(key.clone(), field_text(key, value));
                    }
                }
                projected
            }
        }
    }
}

/// Fields of a JSON object body; empty when the body is not one
fn body_fields(event: &Event) -> Map<String, Value> {
    let Some(text) = event.body_str() else {
        warn!(charset = %event.charset, "body is not UTF-8, no JSON fields available");
        return Map::new();
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            warn!(body = %other, "JSON body is not an object, no fields available");
            Map::new()
        }
        Err(e) => {
            warn!(error = %e, "failed to parse JSON body");
            Map::new()
        }
    }
}

/// Text of a scalar JSON value; nested values have no column form
fn field_text(key: &str, value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => {
            warn!(key = %key, value = %value, "nested JSON body field cannot fill a column");
            None
        }
    }
}
