//! keruu - event intake gateway
//!
//! Normalizes batches of JSON events posted by browsers and serializes them
//! for storage or forwarding.
//!
//! # Architecture
//!
//! ```text
//! request body ──► Ingestor ──► Middleware (enrich, validate) ──► Emitter ──► sink
//!                                   ▲
//!                    IdentityAssigner (client id, session id, cookies)
//! ```
//!
//! Ingestors and emitters are pluggable via traits.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod config;
pub mod emit;
pub mod error;
pub mod event;
pub mod identity;
pub mod ingest;
pub mod middleware;
pub mod normalizer;

pub use config::Config;
pub use emit::{ColumnProjector, Emitter, EventEncoder, EventFormat};
pub use error::{KeruuError, Result};
pub use event::{Charset, Event, Headers};
pub use identity::{CookieDirective, IdentityAssigner};
pub use ingest::{Ingestor, JsonIngestor, RequestContext};
pub use middleware::{Middleware, MiddlewareChain, Validator};
pub use normalizer::{EventNormalizer, NormalizedBatch};
