//! Normalizer benchmarks
//!
//! Measures decode + enrich + validate for a 100-event request.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keruu_gateway::config::IdentityConfig;
use keruu_gateway::{EventNormalizer, RequestContext};
use std::hint::black_box;

fn make_body(count: usize) -> Vec<u8> {
    let events: Vec<String> = (0..count)
        .map(|i| format!(r#"{{"headers": {{"app": "shop", "seq": "{i}"}}, "body": "event {i}"}}"#))
        .collect();
    format!("[{}]", events.join(",")).into_bytes()
}

fn bench_normalize(c: &mut Criterion) {
    let body = make_body(100);
    let normalizer = EventNormalizer::new(
        IdentityConfig::default(),
        vec!["app".to_string(), "seq".to_string()],
    )
    .expect("normalizer");

    let returning = RequestContext::new()
        .with_user_agent("Mozilla/5.0")
        .with_forwarded_for("203.0.113.7")
        .with_cookie("uuid_tt_dd", "-6453_20240101 00:00:00")
        .with_cookie("dc_session_id", "4102444800000");

    let mut group = c.benchmark_group("normalizer");
    group.throughput(Throughput::Elements(100));

    group.bench_function("new_client", |b| {
        b.iter(|| black_box(normalizer.normalize(&RequestContext::new(), black_box(&body))))
    });

    group.bench_function("returning_client", |b| {
        b.iter(|| black_box(normalizer.normalize(&returning, black_box(&body))))
    });

    group.finish();
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
