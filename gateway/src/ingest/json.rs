//! JSON batch ingestor
//!
//! Accepts a JSON array of events:
//!
//! ```text
//! [{"headers": {"a": "b", "c": "d"}, "body": "random_body"},
//!  {"headers": {"e": "f"}, "body": "random_body2"}]
//! ```
//!
//! Each element becomes one Event whose body is the `body` string encoded in
//! the request charset. Elements without a `headers` object carry nothing the
//! pipeline can attribute and are skipped.

use crate::error::{KeruuError, Result};
use crate::event::{Event, Headers};
use crate::ingest::{Ingestor, RequestContext};
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

/// One element of the inbound array
#[derive(Debug, Deserialize)]
struct JsonEvent {
    #[serde(default)]
    headers: Option<Headers>,
    #[serde(default)]
    body: Option<String>,
}

/// Decodes `[{headers, body}, ...]` request bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonIngestor;

impl JsonIngestor {
    pub fn new() -> Self {
        Self
    }
}

impl Ingestor for JsonIngestor {
    fn name(&self) -> &'static str {
        "json"
    }

    fn ingest(&self, ctx: &RequestContext, data: &[u8]) -> Result<Vec<Event>> {
        let charset = ctx.resolve_charset()?;
        let text = charset.decode(data).map_err(|e| {
            KeruuError::BadRequest(format!("request body is not valid {charset}: {e}"))
        })?;

        let elements: Vec<JsonEvent> = serde_json::from_str(&text)?;

        let mut events = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let Some(headers) = element.headers else {
                debug!(index, "event without headers, body discarded");
                continue;
            };
            let body = element.body.unwrap_or_default();
            events.push(Event {
                headers,
                body: Bytes::from(charset.encode(&body)),
                charset,
            });
        }
        Ok(events)
    }
}
