//! Header-and-body event encoder
//!
//! Writes each event as one line on a byte sink.
//!
//! ```text
//! NATIVE   {header1=value1, header2=null} <body bytes>\n
//! CSV      "value1","","<body text>"\n
//! ```
//!
//! NATIVE output is not escaped. CSV output quotes every field; a record with
//! no fields is a bare `\n`. Each line is rendered in full before it reaches
//! the sink and is flushed after writing. Once a sink write fails the encoder
//! refuses further events, so a partial line is never followed by another.

use crate::config::SerializerConfig;
use crate::emit::projector::{ColumnProjector, Projected};
use crate::emit::{Emitter, EventFormat};
use crate::error::{KeruuError, Result};
use crate::event::Event;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::{self, Write};
use tracing::{debug, error, trace, warn};

/// Encodes events onto a single sink
///
/// One encoder owns one sink; `&mut self` on every write keeps callers to a
/// single writer at a time.
pub struct EventEncoder<W: Write> {
    config: SerializerConfig,
    projector: ColumnProjector,
    /// CSV writer settings, created on the first CSV write and reused
    csv: Option<WriterBuilder>,
    sink: W,
    failed: bool,
}

impl<W: Write> EventEncoder<W> {
    pub fn new(sink: W, config: SerializerConfig) -> Self {
        debug!(
            format = %config.format,
            columns = ?config.columns,
            json_body = config.json_body,
            "starting event encoder"
        );
        Self {
            projector: ColumnProjector::from_config(&config),
            config,
            csv: None,
            sink,
            failed: false,
        }
    }

    /// Project and write one event
    pub fn write(&mut self, event: &Event) -> Result<()> {
        if self.failed {
            return Err(sink_failed());
        }
        let headers = self.projector.project(event);
        let line = match self.config.format.parse::<EventFormat>() {
            Ok(EventFormat::Native) => self.native_line(&headers, event),
            Ok(EventFormat::Csv) => self.csv_line(&headers, event)?,
            Err(format) => {
                return Err(KeruuError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid format {format}"),
                )));
            }
        };
        self.write_line(&line)
    }

    /// Flush buffered output to the sink
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and hand back the sink
    pub fn into_inner(mut self) -> Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        let written = self
            .sink
            .write_all(line)
            .and_then(|()| self.sink.flush());
        if let Err(e) = written {
            error!(error = %e, "sink write failed, encoder disabled");
            self.failed = true;
            return Err(e.into());
        }
        Ok(())
    }

    fn native_line(&self, headers: &Projected, event: &Event) -> Vec<u8> {
        let rendered = render_headers(headers);
        let mut line = Vec::with_capacity(rendered.len() + event.body.len() + 2);
        line.extend_from_slice(rendered.as_bytes());
        line.push(b' ');
        line.extend_from_slice(&event.body);
        if self.config.append_newline {
            line.push(b'\n');
        }
        line
    }

    fn csv_line(&mut self, headers: &Projected, event: &Event) -> Result<Vec<u8>> {
        let mut values: Vec<&str> = headers
            .values()
            .map(|v| v.as_deref().unwrap_or_default())
            .collect();

        if !self.config.json_body {
            let body = event.body_str().unwrap_or_else(|| {
                warn!(charset = %event.charset, "body is not UTF-8, writing empty body field");
                ""
            });
            trace!(body = %body, "writing event with body");
            values.push(body);
        }

        if values.is_empty() {
            return Ok(b"\n".to_vec());
        }

        let delimiter = self.config.delimiter;
        let builder = self.csv.get_or_insert_with(|| {
            debug!(delimiter = %char::from(delimiter), "creating csv writer");
            let mut builder = WriterBuilder::new();
            builder
                .delimiter(delimiter)
                .quote_style(QuoteStyle::Always)
                .terminator(Terminator::Any(b'\n'))
                .flexible(true)
                .has_headers(false);
            builder
        });

        // render into a scratch buffer so a failed record never reaches the sink
        let mut record = builder.from_writer(Vec::new());
        record.write_record(&values)?;
        record
            .into_inner()
            .map_err(|e| KeruuError::Serialization(e.to_string()))
    }
}

impl<W: Write> Emitter for EventEncoder<W> {
    fn name(&self) -> &'static str {
        "encoder"
    }

    fn emit(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            self.write(event)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        EventEncoder::flush(self)
    }
}

fn sink_failed() -> KeruuError {
    KeruuError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "encoder sink failed on an earlier write",
    ))
}

/// Render a header map as `{k=v, k=v}`, with `null` for missing values
pub fn render_headers(headers: &Projected) -> String {
    let body = headers
        .iter()
        .map(|(k, v)| format!("{k}={}", v.as_deref().unwrap_or("null")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::event::Charset;
    use bytes::Bytes;

    fn event(body: &str, headers: usize) -> Event {
        (1..=headers).fold(Event::from_text(body, Charset::Utf8), |e, i| {
            e.with_header(format!("header{i}"), format!("value{i}"))
        })
    }

    fn encode(config: SerializerConfig, events: &[Event]) -> String {
        let mut encoder = EventEncoder::new(Vec::new(), config);
        encoder.emit(events).unwrap();
        String::from_utf8(encoder.into_inner().unwrap()).unwrap()
    }

    fn csv_config(columns: Option<&str>, json_body: bool) -> SerializerConfig {
        SerializerConfig {
            columns: columns.map(|c| c.split_whitespace().map(str::to_string).collect()),
            format: "CSV".to_string(),
            delimiter: b',',
            json_body,
            ..SerializerConfig::default()
        }
    }

    #[test]
    fn test_native_format() {
        let output = encode(SerializerConfig::default(), &[event("body text", 2)]);
        assert_eq!(output, "{header1=value1, header2=value2} body text\n");
    }

    #[test]
    fn test_native_without_newline() {
        let config = SerializerConfig {
            append_newline: false,
            ..SerializerConfig::default()
        };
        let output = encode(config, &[event("a", 1), event("b", 0)]);
        assert_eq!(output, "{header1=value1} a{} b");
    }

    #[test]
    fn test_native_writes_body_bytes_verbatim() {
        let config = SerializerConfig {
            columns: Some(vec!["missing".to_string()]),
            ..SerializerConfig::default()
        };
        let event = Event::new(Bytes::from(vec![0xFF, b'\n']));
        let mut encoder = EventEncoder::new(Vec::new(), config);
        encoder.write(&event).unwrap();
        assert_eq!(
            encoder.into_inner().unwrap(),
            b"{missing=null} \xFF\n\n".to_vec()
        );
    }

    #[test]
    fn test_csv_columns_with_json_body() {
        let output = encode(
            csv_config(Some("header3 header2 id value"), true),
            &[event(r#"{"id": "1", "value": "value1"}"#, 3)],
        );
        assert_eq!(output, "\"value3\",\"value2\",\"1\",\"value1\"\n");
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_csv_appends_body_without_json_body() {
        let output = encode(csv_config(Some("header1 nope"), false), &[event("say \"hi\"", 1)]);
        assert_eq!(output, "\"value1\",\"\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_csv_default_tab_delimiter_and_writer_reuse() {
        let config = SerializerConfig {
            format: "CSV".to_string(),
            ..SerializerConfig::default()
        };
        let output = encode(config, &[event("b1", 1), event("b2", 2)]);
        assert_eq!(
            output,
            "\"value1\"\t\"b1\"\n\"value1\"\t\"value2\"\t\"b2\"\n"
        );
    }

    /// Accepts whole writes until `limit` bytes, then rejects everything
    struct FailingSink {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.data.len() + buf.len() > self.limit {
                return Err(io::Error::other("sink full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_csv_mixed_field_counts() {
        let config = SerializerConfig {
            format: "CSV".to_string(),
            ..SerializerConfig::default()
        };
        let output = encode(config, &[event("b1", 1), event("b2", 2), event("b1", 1)]);
        assert_eq!(
            output,
            "\"value1\"\t\"b1\"\n\"value1\"\t\"value2\"\t\"b2\"\n\"value1\"\t\"b1\"\n"
        );
    }

    #[test]
    fn test_csv_flushes_each_record() {
        let sink = FailingSink {
            data: Vec::new(),
            limit: usize::MAX,
        };
        let mut encoder = EventEncoder::new(sink, csv_config(None, false));
        assert!(encoder.csv.is_none());
        encoder.write(&event("x", 1)).unwrap();
        assert!(encoder.csv.is_some());
        assert_eq!(encoder.sink.data, b"\"value1\",\"x\"\n".to_vec());
    }

    #[test]
    fn test_failed_sink_disables_encoder() {
        let sink = FailingSink {
            data: Vec::new(),
            limit: 16,
        };
        let mut encoder = EventEncoder::new(sink, csv_config(None, false));

        encoder.write(&event("x", 1)).unwrap();
        let err = encoder.write(&event("a longer body", 2)).unwrap_err();
        assert!(matches!(err, KeruuError::Io(_)));

        // a short record would fit, but the encoder no longer accepts events
        let err = encoder.write(&event("", 0)).unwrap_err();
        match err {
            KeruuError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected IO error, got {other:?}"),
        }

        let sink = encoder.into_inner().unwrap();
        assert_eq!(sink.data, b"\"value1\",\"x\"\n".to_vec());
    }

    #[test]
    fn test_csv_empty_record_is_bare_newline() {
        let output = encode(
            csv_config(None, true),
            &[Event::from_text("not json", Charset::Utf8), event("{}", 1)],
        );
        assert_eq!(output, "\n\"value1\"\n");
    }

    #[test]
    fn test_csv_invalid_utf8_body_is_empty_field() {
        let event = Event::new(Bytes::from(vec![0xC3])).with_header("k", "v");
        let output = encode(csv_config(None, false), &[event]);
        assert_eq!(output, "\"v\",\"\"\n");
    }

    #[test]
    fn test_invalid_format_is_io_error() {
        let config = SerializerConfig {
            format: "XML".to_string(),
            ..SerializerConfig::default()
        };
        let mut encoder = EventEncoder::new(Vec::new(), config);
        let err = encoder.write(&event("x", 1)).unwrap_err();
        match err {
            KeruuError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
            other => panic!("expected IO error, got {other:?}"),
        }
    }

    #[test]
    fn test_render_headers() {
        let mut headers = Projected::new();
        assert_eq!(render_headers(&headers), "{}");
        headers.insert("a".into(), Some("1".into()));
        headers.insert("b".into(), None);
        assert_eq!(render_headers(&headers), "{a=1, b=null}");
    }
}
