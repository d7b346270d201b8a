//! Performance benchmarks for the per-tick hot path
//!
//! Everything measured here runs once per request on the requester task, so
//! it has to stay small next to the network round trip it reports on.

use chrono::{Local, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http_latency_probe::{
    logging::RequestEvent,
    requester::ResolveOverride,
};
use std::time::Duration;

fn bench_event_lines(c: &mut Criterion) {
    let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
    let mut group = c.benchmark_group("event_lines");

    for body_len in [16usize, 1024, 64 * 1024] {
        let body = "x".repeat(body_len);
        let event = RequestEvent::slow_at(at, Duration::from_millis(612), body, 4_611_686_018_427_387_904);

        group.bench_with_input(BenchmarkId::new("slow_to_line", body_len), &event, |b, event| {
            b.iter(|| black_box(event.to_line()))
        });
        group.bench_with_input(BenchmarkId::new("slow_to_json", body_len), &event, |b, event| {
            b.iter(|| black_box(serde_json::to_string(event).unwrap()))
        });
    }

    let error = RequestEvent::error_at(
        at,
        Duration::from_millis(3),
        "error sending request: tcp connect error: Connection refused (os error 111)",
    );
    group.bench_function("error_to_line", |b| b.iter(|| black_box(error.to_line())));

    group.finish();
}

fn bench_resolve_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_override");

    group.bench_function("parse_valid", |b| {
        b.iter(|| ResolveOverride::parse(black_box("example.com:443:203.0.113.5")).unwrap())
    });
    group.bench_function("parse_invalid", |b| {
        b.iter(|| ResolveOverride::parse(black_box("example.com:443")).is_err())
    });
    group.bench_function("dial_target", |b| {
        let resolve = ResolveOverride::parse("example.com:443:203.0.113.5").unwrap();
        b.iter(|| black_box(resolve.dial_target()))
    });

    group.finish();
}

criterion_group!(benches, bench_event_lines, bench_resolve_parse);
criterion_main!(benches);
