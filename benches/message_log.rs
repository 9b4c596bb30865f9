//! Benchmarks for message log appends and derived views
//!
//! Searches rebuild a filtered view over the whole log on every keystroke,
//! so they are measured at log sizes a long test session reaches.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use netpulse::{FrameDraft, FrameKind, LogQuery, MessageLog};
use std::hint::black_box;

fn filled_log(size: usize) -> MessageLog {
    let mut log = MessageLog::new();
    for n in 0..size {
        let draft = match n % 4 {
            0 => FrameDraft::outbound(FrameKind::HeartbeatPing, r#"{"type":"PING"}"#),
            1 => FrameDraft::inbound(FrameKind::HeartbeatPong, "ack"),
            2 => FrameDraft::outbound(FrameKind::Json, format!(r#"{{"type":"MESSAGE","n":{n}}}"#)),
            _ => FrameDraft::inbound(FrameKind::Text, format!("echo {n}")),
        };
        log.append(draft, n as i64);
    }
    log
}

fn bench_append(c: &mut Criterion) {
    c.bench_function("append_1000", |b| {
        b.iter(|| black_box(filled_log(1_000)));
    });
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for size in [1_000usize, 10_000] {
        let log = filled_log(size);
        let text = LogQuery::text("MESSAGE");
        let kinds = LogQuery::all().with_kinds([FrameKind::HeartbeatPing, FrameKind::HeartbeatPong]);

        group.bench_with_input(BenchmarkId::new("text", size), &log, |b, log| {
            b.iter(|| black_box(log.search(black_box(&text))))
        });
        group.bench_with_input(BenchmarkId::new("kinds", size), &log, |b, log| {
            b.iter(|| black_box(log.search(black_box(&kinds))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_search);
criterion_main!(benches);
