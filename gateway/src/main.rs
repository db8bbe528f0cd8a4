//! keruu gateway - one-shot intake driver
//!
//! Reads one request body (a JSON event batch) from stdin, normalizes it and
//! writes the surviving events to stdout with the configured serializer.
//! Logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! echo '[{"headers": {"app": "shop"}, "body": "hello"}]' | cargo run
//!
//! # CSV with projected columns
//! KERUU_FORMAT=CSV KERUU_DELIMITER=, KERUU_COLUMNS="app Date-Time" cargo run < batch.json
//! ```
//!
//! ## Environment Variables
//!
//! - `KERUU_REQUEST_CHARSET`: declared charset of the stdin body (default: UTF-8)
//! - `KERUU_COOKIE_ID` / `KERUU_SESSION_ID`: identity cookie names
//! - `KERUU_VALIDATE_HEADERS`: comma-separated headers to validate
//! - `KERUU_FORMAT`, `KERUU_COLUMNS`, `KERUU_DELIMITER`, `KERUU_JSON_BODY`,
//!   `KERUU_APPEND_NEWLINE`: serializer settings
//! - `KERUU_LOG_LEVEL` (default: "info"), `KERUU_LOG_FORMAT` ("pretty" or "json")

use anyhow::Context;
use keruu_gateway::config::{Config, LogFormat};
use keruu_gateway::{Emitter, EventEncoder, EventNormalizer, RequestContext};
use std::io::{self, Read};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(
        durable_cookie = %config.identity.durable.name,
        session_cookie = %config.identity.session.name,
        format = %config.serializer.format,
        "Starting keruu gateway"
    );

    let normalizer = EventNormalizer::from_config(&config)?;

    let mut body = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut body)
        .context("failed to read request body from stdin")?;

    let mut ctx = RequestContext::new();
    if let Ok(charset) = std::env::var("KERUU_REQUEST_CHARSET") {
        ctx = ctx.with_charset(charset);
    }

    let batch = match normalizer.normalize(&ctx, &body) {
        Ok(batch) => batch,
        Err(e) if e.is_client_error() => {
            warn!(error = %e, status = %http::StatusCode::from(&e), "request rejected");
            return Err(e.into());
        }
        Err(e) => return Err(e).context("failed to normalize request"),
    };

    for cookie in &batch.cookies {
        info!(set_cookie = %cookie, "cookie issued");
    }

    let mut encoder = EventEncoder::new(io::stdout().lock(), config.serializer.clone());
    encoder.emit(&batch.events)?;
    encoder.flush()?;

    info!(
        received = batch.received,
        written = batch.events.len(),
        dropped = batch.dropped,
        "keruu gateway done"
    );
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
}
