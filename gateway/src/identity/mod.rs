//! Client identity resolution
//!
//! Two identifiers are attached to every ingested event:
//!
//! - a durable client id, minted once and kept for as long as the client
//!   presents the cookie
//! - a session id, the epoch-millis timestamp of the session start, re-minted
//!   once the session has been idle longer than the configured window
//!
//! Resolution never fails. Missing, empty or unreadable cookies all degrade to
//! minting a fresh value.
//!
//! ```text
//! session cookie "1504088201813_0.053"
//!                 └─────┬─────┘
//!                 compared against now
//! ```

pub mod cookie;

use crate::config::IdentityConfig;
use chrono::{DateTime, Local, Utc};
use tracing::debug;
use uuid::Uuid;

pub use cookie::{CookieDirective, find_cookie, parse_cookie_header};

/// Durable id cookie lifetime (one year)
pub const DURABLE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 365;

/// Format of the date stamp in minted durable ids and the `Date-Time` header
pub const DATE_TIME_FORMAT: &str = "%Y%m%d %H:%M:%S";

/// A resolved identifier and the cookie to set, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: String,
    pub set_cookie: Option<CookieDirective>,
}

/// Format `now` as a local-time date stamp (`yyyyMMdd HH:mm:ss`)
pub fn date_stamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format(DATE_TIME_FORMAT).to_string()
}

/// Resolves durable and session identifiers from request cookies
#[derive(Debug, Clone)]
pub struct IdentityAssigner {
    config: IdentityConfig,
}

impl IdentityAssigner {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Resolve the durable client id.
    ///
    /// A present, non-empty cookie is reused as is. Otherwise a new id of the
    /// form `<random i64>_<date stamp>` is minted.
    pub fn resolve_durable_id(&self, cookies: &[(String, String)], now: DateTime<Utc>) -> Resolved {
        let settings = &self.config.durable;
        if let Some(id) = find_cookie(cookies, &settings.name).filter(|v| !v.is_empty()) {
            return Resolved {
                id: id.to_string(),
                set_cookie: None,
            };
        }

        let entropy = Uuid::new_v4().as_u64_pair().0 as i64;
        let id = format!("{entropy}_{}", date_stamp(now));
        debug!(cookie = %settings.name, id = %id, "minted durable id");

        let set_cookie = settings
            .write
            .then(|| CookieDirective::for_cookie(settings, id.clone(), DURABLE_MAX_AGE_SECS));
        Resolved { id, set_cookie }
    }

    /// Resolve the session id.
    ///
    /// The part of the cookie before the first `_` is read as the session
    /// start in epoch millis. Sessions idle longer than the configured window,
    /// and cookies that cannot be read, get a fresh id of `now` in millis.
    pub fn resolve_session_id(&self, cookies: &[(String, String)], now: DateTime<Utc>) -> Resolved {
        let settings = &self.config.session;
        let now_ms = now.timestamp_millis();

        match find_cookie(cookies, &settings.name).filter(|v| !v.is_empty()) {
            Some(current) if !self.session_expired(current, now_ms) => Resolved {
                id: current.to_string(),
                set_cookie: None,
            },
            _ => {
                let id = now_ms.to_string();
                debug!(cookie = %settings.name, id = %id, "minted session id");
                let max_age = i64::try_from(self.config.session_idle.as_secs()).unwrap_or(i64::MAX);
                let set_cookie = settings
                    .write
                    .then(|| CookieDirective::for_cookie(settings, id.clone(), max_age));
                Resolved { id, set_cookie }
            }
        }
    }

    fn session_expired(&self, value: &str, now_ms: i64) -> bool {
        let timestamp = value.split_once('_').map_or(value, |(ts, _)| ts);
        match timestamp.parse::<i64>() {
            Ok(started_ms) => {
                let idle_ms = i64::try_from(self.config.session_idle.as_millis()).unwrap_or(i64::MAX);
                now_ms.saturating_sub(started_ms) > idle_ms
            }
            Err(e) => {
                debug!(value = %value, error = %e, "unreadable session cookie, re-minting");
                true
            }
        }
    }
}
