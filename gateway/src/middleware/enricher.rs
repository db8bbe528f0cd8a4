//! Enricher middleware
//!
//! Merges a metadata map into every event's headers. Metadata wins when a key
//! is already present in the client-supplied headers.

use crate::event::{Event, Headers};
use crate::middleware::Middleware;

/// Adds a fixed set of headers to each event
#[derive(Debug, Clone)]
pub struct Enricher {
    metadata: Headers,
}

impl Enricher {
    /// Create an enricher that adds `metadata` to all events
    pub fn with_static(metadata: Headers) -> Self {
        Self { metadata }
    }
}

impl Middleware for Enricher {
    fn name(&self) -> &'static str {
        "enricher"
    }

    fn process(&self, mut event: Event) -> Option<Event> {
        for (key, value) in &self.metadata {
            event.headers.insert(key.clone(), value.clone());
        }
        Some(event)
    }
}
