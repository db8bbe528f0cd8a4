//! Encoder benchmarks
//!
//! Measures NATIVE vs CSV serialization, with and without JSON-body projection.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keruu_gateway::config::SerializerConfig;
use keruu_gateway::{Charset, Event, EventEncoder};
use std::hint::black_box;

fn make_event() -> Event {
    Event::from_text(
        r#"{"user_id": "12345", "email": "test@example.com", "name": "Test User"}"#,
        Charset::Utf8,
    )
    .with_header("app", "shop")
    .with_header("page", "checkout")
    .with_header("Date-Time", "20240101 00:00:00")
    .with_header("uuid_tt_dd", "-6453820193748201_20240101 00:00:00")
    .with_header("dc_session_id", "1704067200000")
}

fn bench_formats(c: &mut Criterion) {
    let events: Vec<Event> = (0..1000).map(|_| make_event()).collect();

    let mut group = c.benchmark_group("encoder");
    group.throughput(Throughput::Elements(events.len() as u64));

    let configs = [
        ("native", SerializerConfig::default()),
        (
            "csv",
            SerializerConfig {
                format: "CSV".to_string(),
                ..SerializerConfig::default()
            },
        ),
        (
            "csv_json_columns",
            SerializerConfig {
                format: "CSV".to_string(),
                columns: Some(
                    ["app", "user_id", "email", "dc_session_id"]
                        .map(str::to_string)
                        .to_vec(),
                ),
                json_body: true,
                ..SerializerConfig::default()
            },
        ),
    ];

    for (name, config) in configs {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut encoder = EventEncoder::new(Vec::with_capacity(256 * 1024), config.clone());
                for event in &events {
                    encoder.write(black_box(event)).ok();
                }
                black_box(encoder.into_inner().ok())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_formats);
criterion_main!(benches);
