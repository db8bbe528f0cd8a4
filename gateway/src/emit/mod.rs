//! Emitter system for keruu
//!
//! Emitters serialize validated events to an output. The built-in
//! [`EventEncoder`] writes line-oriented text (NATIVE or CSV) to any
//! `std::io::Write` sink.

pub mod encoder;
pub mod projector;

use crate::error::Result;
use crate::event::Event;
use std::fmt;
use std::str::FromStr;

pub use encoder::EventEncoder;
pub use projector::{ColumnProjector, Projected};

/// Emitter trait - writes Events to a destination
///
/// Emitters own their destination and take `&mut self`: one emitter, one
/// writer at a time.
///
/// # Example
///
/// ```ignore
/// struct CountingEmitter {
///     seen: usize,
/// }
///
/// impl Emitter for CountingEmitter {
///     fn name(&self) -> &'static str { "counting" }
///
///     fn emit(&mut self, events: &[Event]) -> Result<()> {
///         self.seen += events.len();
///         Ok(())
///     }
/// }
/// ```
pub trait Emitter {
    /// Emitter name for identification and logging
    fn name(&self) -> &'static str;

    /// Emit events in order
    fn emit(&mut self, events: &[Event]) -> Result<()>;

    /// Push any buffered output to the destination
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Output encodings understood by [`EventEncoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFormat {
    #[default]
    Native,
    Csv,
}

impl FromStr for EventFormat {
    type Err = String;

    /// Format names are matched exactly (`NATIVE`, `CSV`)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "NATIVE" => Ok(EventFormat::Native),
            "CSV" => Ok(EventFormat::Csv),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for EventFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventFormat::Native => f.write_str("NATIVE"),
            EventFormat::Csv => f.write_str("CSV"),
        }
    }
}
