//! Configuration for keruu
//!
//! Every option has a dotted key (`cookie.domain`, `jsonBody`, ...) and an
//! environment variable. [`Config::from_lookup`] reads any key/value source;
//! [`Config::from_env`] maps the keys onto `KERUU_*` variables.

use crate::error::{KeruuError, Result};
use std::env;
use std::time::Duration;

pub const COOKIE_DOMAIN: &str = "cookie.domain";
pub const COOKIE_PATH: &str = "cookie.path";
pub const COOKIE_ID: &str = "cookie.id";
pub const SESSION_ID: &str = "session.id";
pub const SESSION_IDLE_SECS: &str = "session.idle.secs";
pub const WRITE_COOKIE: &str = "write.cookie";
pub const VALIDATE_HEADERS: &str = "validate.headers";
pub const APPEND_NEWLINE: &str = "appendNewline";
pub const COLUMNS: &str = "columns";
pub const FORMAT: &str = "format";
pub const DELIMITER: &str = "delimiter";
pub const JSON_BODY: &str = "jsonBody";
pub const LOG_LEVEL: &str = "log.level";
pub const LOG_FORMAT: &str = "log.format";

/// Option keys paired with the environment variables `from_env` reads
const ENV_VARS: &[(&str, &str)] = &[
    (COOKIE_DOMAIN, "KERUU_COOKIE_DOMAIN"),
    (COOKIE_PATH, "KERUU_COOKIE_PATH"),
    (COOKIE_ID, "KERUU_COOKIE_ID"),
    (SESSION_ID, "KERUU_SESSION_ID"),
    (SESSION_IDLE_SECS, "KERUU_SESSION_IDLE_SECS"),
    (WRITE_COOKIE, "KERUU_WRITE_COOKIE"),
    (VALIDATE_HEADERS, "KERUU_VALIDATE_HEADERS"),
    (APPEND_NEWLINE, "KERUU_APPEND_NEWLINE"),
    (COLUMNS, "KERUU_COLUMNS"),
    (FORMAT, "KERUU_FORMAT"),
    (DELIMITER, "KERUU_DELIMITER"),
    (JSON_BODY, "KERUU_JSON_BODY"),
    (LOG_LEVEL, "KERUU_LOG_LEVEL"),
    (LOG_FORMAT, "KERUU_LOG_FORMAT"),
];

/// Main configuration for keruu
#[derive(Debug, Clone)]
pub struct Config {
    /// Cookie identity settings
    pub identity: IdentityConfig,

    /// Header names whose values must pass the validation rule
    pub validate_headers: Vec<String>,

    /// Event serializer settings
    pub serializer: SerializerConfig,

    /// Log level
    pub log_level: String,

    /// Log format (json or pretty)
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            validate_headers: Vec::new(),
            serializer: SerializerConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Settings for one identity dimension (durable id or session id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    /// Cookie name, also the event header the resolved value is stored under
    pub name: String,
    pub path: String,
    pub domain: String,
    /// Emit `Set-Cookie` directives for newly minted values
    pub write: bool,
}

/// Identity cookie configuration, shared read-only across requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub durable: CookieSpec,
    pub session: CookieSpec,
    /// Idle window after which a session id is re-minted; also its cookie max-age
    pub session_idle: Duration,
}

pub const DEFAULT_DURABLE_COOKIE: &str = "uuid_tt_dd";
pub const DEFAULT_SESSION_COOKIE: &str = "dc_session_id";
pub const DEFAULT_COOKIE_PATH: &str = "/";
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

impl Default for IdentityConfig {
    fn default() -> Self {
        let cookie = |name: &str| CookieSpec {
            name: name.to_string(),
            path: DEFAULT_COOKIE_PATH.to_string(),
            domain: String::new(),
            write: true,
        };
        Self {
            durable: cookie(DEFAULT_DURABLE_COOKIE),
            session: cookie(DEFAULT_SESSION_COOKIE),
            session_idle: DEFAULT_SESSION_IDLE,
        }
    }
}

/// Settings for the header-and-body event serializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerConfig {
    /// Append `\n` after each NATIVE record
    pub append_newline: bool,

    /// Ordered columns to project; `None` serializes every header
    pub columns: Option<Vec<String>>,

    /// Output format name; checked when the first event is written
    pub format: String,

    /// CSV field delimiter
    pub delimiter: u8,

    /// Treat bodies as JSON objects whose fields back missing columns
    pub json_body: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            append_newline: true,
            columns: None,
            format: "NATIVE".to_string(),
            delimiter: b'\t',
            json_body: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| {
            ENV_VARS
                .iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, var)| env::var(var).ok())
        })
    }

    /// Load configuration from any key/value source keyed by option name
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(domain) = lookup(COOKIE_DOMAIN) {
            config.identity.durable.domain = domain.clone();
            config.identity.session.domain = domain;
        }

        if let Some(path) = lookup(COOKIE_PATH) {
            config.identity.durable.path = path.clone();
            config.identity.session.path = path;
        }

        if let Some(name) = lookup(COOKIE_ID) {
            config.identity.durable.name = non_empty(COOKIE_ID, name)?;
        }

        if let Some(name) = lookup(SESSION_ID) {
            config.identity.session.name = non_empty(SESSION_ID, name)?;
        }

        if let Some(secs) = lookup(SESSION_IDLE_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| KeruuError::Config(format!("invalid {SESSION_IDLE_SECS}: {e}")))?;
            config.identity.session_idle = Duration::from_secs(secs);
        }

        if let Some(write) = lookup(WRITE_COOKIE) {
            let write = parse_bool(WRITE_COOKIE, &write)?;
            config.identity.durable.write = write;
            config.identity.session.write = write;
        }

        if let Some(names) = lookup(VALIDATE_HEADERS) {
            config.validate_headers = if names.trim().is_empty() {
                Vec::new()
            } else {
                names.split(',').map(|n| n.trim().to_string()).collect()
            };
        }

        if let Some(append) = lookup(APPEND_NEWLINE) {
            config.serializer.append_newline = parse_bool(APPEND_NEWLINE, &append)?;
        }

        if let Some(columns) = lookup(COLUMNS) {
            config.serializer.columns = Some(columns.split_whitespace().map(str::to_string).collect());
        }

        if let Some(format) = lookup(FORMAT) {
            config.serializer.format = format;
        }

        if let Some(delimiter) = lookup(DELIMITER) {
            if let Some(first) = delimiter.chars().next() {
                config.serializer.delimiter = u8::try_from(first)
                    .ok()
                    .filter(u8::is_ascii)
                    .ok_or_else(|| {
                        KeruuError::Config(format!(
                            "invalid {DELIMITER}: '{first}' is not a single-byte character"
                        ))
                    })?;
            }
        }

        if let Some(json_body) = lookup(JSON_BODY) {
            config.serializer.json_body = parse_bool(JSON_BODY, &json_body)?;
        }

        if let Some(level) = lookup(LOG_LEVEL) {
            config.log_level = level;
        }

        if let Some(format) = lookup(LOG_FORMAT) {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(KeruuError::Config(format!(
                        "invalid {LOG_FORMAT}: {other} (expected 'json' or 'pretty')"
                    )))
                }
            };
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(KeruuError::Config(format!(
            "invalid {key}: {other} (expected 'true' or 'false')"
        ))),
    }
}

fn non_empty(key: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        Err(KeruuError::Config(format!("{key} must not be empty")))
    } else {
        Ok(value)
    }
}
