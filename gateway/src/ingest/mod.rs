//! Ingestor system for keruu
//!
//! Ingestors decode a raw request body into Events. The request side of the
//! exchange (declared charset, client headers, cookies) travels alongside in a
//! [`RequestContext`].

pub mod json;

use crate::error::{KeruuError, Result};
use crate::event::{Charset, Event};
use crate::identity::parse_cookie_header;
use http::HeaderMap;
use http::header::{CONTENT_TYPE, COOKIE, REFERER, USER_AGENT};
use tracing::{debug, warn};

pub use json::JsonIngestor;

/// Request-side inputs for ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Declared character set of the body, `None` when not specified
    pub charset: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Raw `X-Forwarded-For` header
    pub forwarded_for: Option<String>,
    /// Request cookies in header order
    pub cookies: Vec<(String, String)>,
}

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from HTTP request headers.
    ///
    /// The charset comes from the `Content-Type` parameter; cookies are
    /// gathered from every `Cookie` header. Values that are not visible ASCII
    /// are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);

        let charset = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_param);

        let cookies = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_cookie_header)
            .collect();

        Self {
            charset,
            user_agent: text(USER_AGENT.as_str()),
            referer: text(REFERER.as_str()),
            forwarded_for: text(X_FORWARDED_FOR),
            cookies,
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_forwarded_for(mut self, forwarded_for: impl Into<String>) -> Self {
        self.forwarded_for = Some(forwarded_for.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Resolve the body charset: UTF-8 when undeclared, UTF-8/16/32 otherwise
    pub fn resolve_charset(&self) -> Result<Charset> {
        match self.charset.as_deref() {
            None => {
                debug!("charset not declared, using UTF-8");
                Ok(Charset::Utf8)
            }
            Some(declared) => declared.parse().map_err(|name: String| {
                warn!(charset = %name, "unsupported character set in request");
                KeruuError::UnsupportedEncoding(name)
            }),
        }
    }
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Ingestor trait - decodes request bodies into Events
///
/// # Example
///
/// ```ignore
/// struct LineIngestor;
///
/// impl Ingestor for LineIngestor {
///     fn name(&self) -> &'static str { "lines" }
///
///     fn ingest(&self, ctx: &RequestContext, data: &[u8]) -> Result<Vec<Event>> {
///         let charset = ctx.resolve_charset()?;
///         let text = charset.decode(data).map_err(KeruuError::BadRequest)?;
///         Ok(text.lines().map(|l| Event::from_text(l, charset)).collect())
///     }
/// }
/// ```
pub trait Ingestor: Send + Sync {
    /// Ingestor name for identification and logging
    fn name(&self) -> &'static str;

    /// Decode a request body into Events, in request order
    fn ingest(&self, ctx: &RequestContext, data: &[u8]) -> Result<Vec<Event>>;
}
