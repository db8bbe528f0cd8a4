//! Validator middleware
//!
//! Checks a configured set of header values against a shared syntactic rule:
//! the value must contain at least one run of ASCII letters, digits or
//! underscores. The match is unanchored, so `"abc!"` passes while `"!!"` and
//! `""` do not. Events that fail are dropped.

use crate::error::{KeruuError, Result};
use crate::event::Event;
use crate::middleware::Middleware;
use regex::Regex;

/// Pattern every validated header value must contain
pub const WORD_PATTERN: &str = "[0-9A-Za-z_]+";

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Event is valid
    Valid,
    /// Event is invalid with reason
    Invalid(String),
}

/// Header validator middleware
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use keruu_gateway::event::Event;
/// use keruu_gateway::middleware::{ValidationResult, Validator};
///
/// let validator = Validator::headers(vec!["app".to_string()]).unwrap();
/// let event = Event::new(Bytes::new()).with_header("app", "shop_01");
/// assert_eq!(validator.validate(&event), ValidationResult::Valid);
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    headers: Vec<String>,
    rule: Regex,
}

impl Validator {
    /// Validate the named headers, in order. An empty list accepts everything.
    pub fn headers(headers: Vec<String>) -> Result<Self> {
        let rule = Regex::new(WORD_PATTERN)
            .map_err(|e| KeruuError::Config(format!("validation rule: {e}")))?;
        if headers.iter().any(|h| h.trim().is_empty()) {
            tracing::warn!(
                ?headers,
                "validation set contains an empty header name, every event will be rejected"
            );
        }
        Ok(Self { headers, rule })
    }

    /// Check an event; the first failing header decides the reason
    pub fn validate(&self, event: &Event) -> ValidationResult {
        for name in &self.headers {
            if name.trim().is_empty() {
                return ValidationResult::Invalid("empty header name in validation set".to_string());
            }
            let Some(value) = event.headers.get(name) else {
                return ValidationResult::Invalid(format!("missing header '{name}'"));
            };
            if !self.rule.is_match(value) {
                return ValidationResult::Invalid(format!(
                    "header '{name}' value '{value}' does not match {WORD_PATTERN}"
                ));
            }
        }
        ValidationResult::Valid
    }
}

impl Middleware for Validator {
    fn name(&self) -> &'static str {
        "validator"
    }

    fn process(&self, event: Event) -> Option<Event> {
        match self.validate(&event) {
            ValidationResult::Valid => Some(event),
            ValidationResult::Invalid(reason) => {
                tracing::debug!(reason = %reason, "validation failed, event dropped");
                None
            }
        }
    }
}
