//! Event envelope for keruu
//!
//! An Event is an ordered header map plus an opaque body. The body is kept as
//! `Bytes` so encoders and downstream stages can share it without copying.
//!
//! ```text
//! JSON element {"headers": {...}, "body": "..."}
//!                     │
//!                     ▼
//! Event { headers (insertion ordered), body (charset encoded), charset }
//! ```

use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Ordered header map, keys unique, insertion order kept for output
pub type Headers = IndexMap<String, String>;

/// Text encodings accepted for request bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Utf16,
    Utf32,
}

impl Charset {
    /// Canonical name, as declared in `Content-Type: ...; charset=`
    pub fn as_str(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Utf16 => "UTF-16",
            Charset::Utf32 => "UTF-32",
        }
    }

    /// Encode text in this charset.
    ///
    /// UTF-16 output starts with a big-endian byte-order mark followed by
    /// big-endian units. UTF-32 output is big-endian without a mark.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Utf16 => {
                let mut out = Vec::with_capacity(2 + text.len() * 2);
                out.extend_from_slice(&[0xFE, 0xFF]);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                out
            }
            Charset::Utf32 => text
                .chars()
                .flat_map(|c| u32::from(c).to_be_bytes())
                .collect(),
        }
    }

    /// Decode bytes in this charset.
    ///
    /// UTF-16 honours a byte-order mark in either order and defaults to
    /// big-endian. UTF-32 is big-endian, with an optional leading mark.
    pub fn decode(&self, data: &[u8]) -> Result<String, String> {
        match self {
            Charset::Utf8 => std::str::from_utf8(data)
                .map(str::to_owned)
                .map_err(|e| format!("invalid UTF-8: {e}")),
            Charset::Utf16 => decode_utf16(data),
            Charset::Utf32 => decode_utf32(data),
        }
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("utf-8") {
            Ok(Charset::Utf8)
        } else if trimmed.eq_ignore_ascii_case("utf-16") {
            Ok(Charset::Utf16)
        } else if trimmed.eq_ignore_ascii_case("utf-32") {
            Ok(Charset::Utf32)
        } else {
            Err(trimmed.to_string())
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_utf16(data: &[u8]) -> Result<String, String> {
    if data.len() % 2 != 0 {
        return Err(format!("UTF-16 input has odd length {}", data.len()));
    }
    let (little_endian, data) = match data {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, data),
    };
    let units = data.chunks_exact(2).map(|pair| {
        let pair = [pair[0], pair[1]];
        if little_endian {
            u16::from_le_bytes(pair)
        } else {
            u16::from_be_bytes(pair)
        }
    });
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|e| format!("invalid UTF-16: {e}"))
}

fn decode_utf32(data: &[u8]) -> Result<String, String> {
    if data.len() % 4 != 0 {
        return Err(format!("UTF-32 input length {} is not a multiple of 4", data.len()));
    }
    let data = data.strip_prefix(&[0x00, 0x00, 0xFE, 0xFF]).unwrap_or(data);
    data.chunks_exact(4)
        .map(|quad| {
            let code = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
            char::from_u32(code).ok_or_else(|| format!("invalid UTF-32 code point {code:#x}"))
        })
        .collect()
}

/// An ingested event: ordered headers and an opaque body
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use keruu_gateway::event::Event;
///
/// let event = Event::new(Bytes::from("page_view"))
///     .with_header("app", "shop")
///     .with_header("page", "checkout");
/// assert_eq!(event.headers.get("app").map(String::as_str), Some("shop"));
/// assert_eq!(event.body_str(), Some("page_view"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Header map (propagated through the pipeline and serialized first)
    pub headers: Headers,

    /// Body bytes, already encoded in `charset`
    pub body: Bytes,

    /// Declared encoding of `body`
    pub charset: Charset,
}

impl Event {
    /// Create a UTF-8 event with no headers
    pub fn new(body: Bytes) -> Self {
        Self {
            headers: Headers::new(),
            body,
            charset: Charset::Utf8,
        }
    }

    /// Create an event from a body string, encoding it in `charset`
    pub fn from_text(body: &str, charset: Charset) -> Self {
        Self {
            headers: Headers::new(),
            body: Bytes::from(charset.encode(body)),
            charset,
        }
    }

    /// Add a header, replacing any previous value under the same key
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Body as UTF-8 text, `None` if the bytes are not valid UTF-8
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
