//! Event normalizer - one request body in, validated events out
//!
//! ```text
//! body ──► Ingestor ──► Enricher(request metadata) ──► Validator ──► events
//!                             ▲
//!            IdentityAssigner ┘ (durable id, session id, cookie directives)
//! ```
//!
//! Metadata merged into every event:
//!
//! | header            | value                                              |
//! |-------------------|----------------------------------------------------|
//! | `Date-Time`       | request time, `yyyyMMdd HH:mm:ss` local            |
//! | `User-Agent`      | request header, `-` when absent                    |
//! | `Referer`         | request header, `-` when absent                    |
//! | `X-Forwarded-For` | first hop of the request header, else `127.0.0.1`  |
//! | durable cookie    | resolved durable client id                         |
//! | session cookie    | resolved session id                                |

use crate::config::{Config, IdentityConfig};
use crate::error::Result;
use crate::event::{Event, Headers};
use crate::identity::{CookieDirective, IdentityAssigner, date_stamp};
use crate::ingest::{Ingestor, JsonIngestor, RequestContext};
use crate::middleware::{Enricher, MiddlewareChain, Validator};
use chrono::{DateTime, Utc};
use tracing::debug;

pub const DATE_TIME: &str = "Date-Time";
pub const USER_AGENT: &str = "User-Agent";
pub const REFERER: &str = "Referer";
pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";

/// Placeholder for absent `User-Agent`/`Referer` request headers
pub const MISSING_HEADER: &str = "-";
/// Client address used when no forwarded-for hop is available
pub const LOOPBACK: &str = "127.0.0.1";

/// Outcome of normalizing one request
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Events that passed validation, in request order
    pub events: Vec<Event>,
    /// Cookies the HTTP layer should set on the response
    pub cookies: Vec<CookieDirective>,
    /// Events decoded from the request
    pub received: usize,
    /// Events dropped by validation
    pub dropped: usize,
}

/// Turns raw request bodies into validated, identity-tagged events
pub struct EventNormalizer {
    ingestor: Box<dyn Ingestor>,
    identity: IdentityAssigner,
    validator: Validator,
}

impl EventNormalizer {
    /// Create a normalizer decoding JSON batches
    pub fn new(identity: IdentityConfig, validate_headers: Vec<String>) -> Result<Self> {
        Ok(Self {
            ingestor: Box::new(JsonIngestor::new()),
            identity: IdentityAssigner::new(identity),
            validator: Validator::headers(validate_headers)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.identity.clone(), config.validate_headers.clone())
    }

    /// Replace the body decoder
    pub fn with_ingestor<I: Ingestor + 'static>(mut self, ingestor: I) -> Self {
        self.ingestor = Box::new(ingestor);
        self
    }

    /// Normalize one request body at the current time
    pub fn normalize(&self, ctx: &RequestContext, body: &[u8]) -> Result<NormalizedBatch> {
        self.normalize_at(ctx, body, Utc::now())
    }

    /// Normalize one request body as if received at `now`.
    ///
    /// Charset and JSON errors are returned before identity is resolved, so a
    /// rejected request produces neither events nor cookies.
    pub fn normalize_at(
        &self,
        ctx: &RequestContext,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<NormalizedBatch> {
        let decoded = self.ingestor.ingest(ctx, body).inspect_err(|e| {
            debug!(ingestor = self.ingestor.name(), error = %e, "request rejected");
        })?;
        let received = decoded.len();

        let (metadata, cookies) = self.request_metadata(ctx, now);
        let chain = MiddlewareChain::new()
            .with(Enricher::with_static(metadata))
            .with(self.validator.clone());

        let events: Vec<Event> = decoded
            .into_iter()
            .filter_map(|event| chain.process(event))
            .collect();
        let dropped = received - events.len();

        debug!(
            ingestor = self.ingestor.name(),
            received,
            accepted = events.len(),
            dropped,
            "request normalized"
        );

        Ok(NormalizedBatch {
            events,
            cookies,
            received,
            dropped,
        })
    }

    /// Build the metadata headers for a request, plus any cookies to set
    pub fn request_metadata(
        &self,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> (Headers, Vec<CookieDirective>) {
        let durable = self.identity.resolve_durable_id(&ctx.cookies, now);
        let session = self.identity.resolve_session_id(&ctx.cookies, now);
        let config = self.identity.config();

        let mut metadata = Headers::with_capacity(6);
        metadata.insert(DATE_TIME.to_string(), date_stamp(now));
        metadata.insert(
            USER_AGENT.to_string(),
            ctx.user_agent.clone().unwrap_or_else(|| MISSING_HEADER.to_string()),
        );
        metadata.insert(
            REFERER.to_string(),
            ctx.referer.clone().unwrap_or_else(|| MISSING_HEADER.to_string()),
        );
        metadata.insert(
            X_FORWARDED_FOR.to_string(),
            client_ip(ctx.forwarded_for.as_deref()),
        );
        metadata.insert(config.durable.name.clone(), durable.id);
        metadata.insert(config.session.name.clone(), session.id);

        let cookies = [durable.set_cookie, session.set_cookie]
            .into_iter()
            .flatten()
            .collect();
        (metadata, cookies)
    }
}

/// First hop of an `X-Forwarded-For` chain, or the loopback address
pub fn client_ip(forwarded_for: Option<&str>) -> String {
    forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map_or_else(|| LOOPBACK.to_string(), str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::KeruuError;
    use chrono::TimeZone;

    const NOW_MS: i64 = 1_504_088_201_813;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(NOW_MS).unwrap()
    }

    fn normalizer(validate: &[&str]) -> EventNormalizer {
        EventNormalizer::new(
            IdentityConfig::default(),
            validate.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_client_ip() {
        assert_eq!(client_ip(Some("10.0.0.1, 10.0.0.2")), "10.0.0.1");
        assert_eq!(client_ip(Some("10.0.0.9")), "10.0.0.9");
        assert_eq!(client_ip(Some("")), LOOPBACK);
        assert_eq!(client_ip(Some(" ,10.0.0.2")), LOOPBACK);
        assert_eq!(client_ip(None), LOOPBACK);
    }

    #[test]
    fn test_metadata_merged_into_every_event() {
        let ctx = RequestContext::new()
            .with_user_agent("curl/8.0")
            .with_forwarded_for("10.1.1.1, 10.2.2.2")
            .with_cookie("uuid_tt_dd", "7_20170830 10:00:00");
        let body = br#"[{"headers": {"app": "shop"}, "body": "a"},
                        {"headers": {}, "body": "b"}]"#;

        let batch = normalizer(&[]).normalize_at(&ctx, body, now()).unwrap();
        assert_eq!(batch.received, 2);
        assert_eq!(batch.events.len(), 2);

        for event in &batch.events {
            let get = |k: &str| event.headers.get(k).map(String::as_str);
            assert_eq!(get(USER_AGENT), Some("curl/8.0"));
            assert_eq!(get(REFERER), Some("-"));
            assert_eq!(get(X_FORWARDED_FOR), Some("10.1.1.1"));
            assert_eq!(get(DATE_TIME), Some(date_stamp(now()).as_str()));
            assert_eq!(get("uuid_tt_dd"), Some("7_20170830 10:00:00"));
            assert_eq!(get("dc_session_id"), Some(NOW_MS.to_string().as_str()));
        }

        // durable id came from the cookie; only the new session is set
        assert_eq!(batch.cookies.len(), 1);
        assert_eq!(batch.cookies[0].name, "dc_session_id");
    }

    #[test]
    fn test_metadata_overwrites_client_headers() {
        let ctx = RequestContext::new().with_user_agent("real");
        let body = br#"[{"headers": {"User-Agent": "fake", "dc_session_id": "1"}, "body": ""}]"#;

        let batch = normalizer(&[]).normalize_at(&ctx, body, now()).unwrap();
        let headers = &batch.events[0].headers;
        assert_eq!(headers.get(USER_AGENT).map(String::as_str), Some("real"));
        assert_eq!(
            headers.get("dc_session_id").map(String::as_str),
            Some(NOW_MS.to_string().as_str())
        );
    }

    #[test]
    fn test_invalid_events_dropped_and_counted() {
        let body = br#"[{"headers": {"app": "shop"}, "body": "1"},
                        {"headers": {"app": "!!"}, "body": "2"},
                        {"headers": {"page": "x"}, "body": "3"},
                        {"headers": {"app": "blog"}, "body": "4"}]"#;

        let batch = normalizer(&["app"])
            .normalize_at(&RequestContext::new(), body, now())
            .unwrap();

        let bodies: Vec<&str> = batch.events.iter().filter_map(Event::body_str).collect();
        assert_eq!(bodies, vec!["1", "4"]);
        assert_eq!(batch.received, 4);
        assert_eq!(batch.dropped, 2);
    }

    #[test]
    fn test_validation_sees_injected_metadata() {
        let batch = normalizer(&["dc_session_id"])
            .normalize_at(&RequestContext::new(), br#"[{"headers": {}}]"#, now())
            .unwrap();
        assert_eq!(batch.events.len(), 1);
    }

    #[test]
    fn test_new_client_gets_both_cookies() {
        let batch = normalizer(&[])
            .normalize_at(&RequestContext::new(), b"[]", now())
            .unwrap();
        let names: Vec<&str> = batch.cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["uuid_tt_dd", "dc_session_id"]);
    }

    #[test]
    fn test_malformed_request_yields_no_events_or_cookies() {
        let err = normalizer(&[])
            .normalize_at(&RequestContext::new(), b"[{\"headers\": {}", now())
            .unwrap_err();
        assert!(matches!(err, KeruuError::BadRequest(_)));
    }
}
