//! Middleware system for keruu
//!
//! Middleware processes events between ingestion and the caller. Each stage
//! can modify an event or drop it. Stages are synchronous: nothing on the
//! ingest path waits on I/O.
//!
//! # Event Flow
//!
//! ```text
//! Ingestor ──► Middleware Chain ──► validated events
//!                  │
//!                  ├─► Enrich (request metadata into headers)
//!                  └─► Validate (drop events with bad header values)
//! ```

pub mod enricher;
pub mod validator;

use crate::event::Event;

pub use enricher::Enricher;
pub use validator::{ValidationResult, Validator};

/// Middleware trait for event processing
///
/// # Return Value
///
/// - `Some(event)` - Pass the event through (possibly modified)
/// - `None` - Drop the event
pub trait Middleware: Send + Sync {
    /// Middleware name for identification and logging
    fn name(&self) -> &'static str;

    /// Process an event
    fn process(&self, event: Event) -> Option<Event>;
}

/// Runs events through multiple middleware in order
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create an empty middleware chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Builder form of [`MiddlewareChain::add`]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    /// Process an event through all middleware in order
    ///
    /// Returns `None` as soon as any middleware drops the event.
    pub fn process(&self, mut event: Event) -> Option<Event> {
        for mw in &self.middlewares {
            event = mw.process(event)?;
        }
        Some(event)
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }
}
