// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

//! Stream consumption throughput.
//!
//! Measures:
//! - Framing + accumulation of a whole stream delivered in one chunk
//! - The same stream delivered in small network-sized chunks
//! - Recovery of payloads split by stray newlines (hold + join path)
//!
//! Run: cargo bench --bench stream_throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chatstream::stream::StreamProcessor;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn sse_body(events: usize) -> Vec<u8> {
    let mut out = String::from(": connected\n\n");
    for i in 0..events {
        let json = serde_json::json!({
            "id": "chatcmpl-bench",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": format!("token {i} ")}}]
        });
        out.push_str(&format!("data: {json}\n\n"));
    }
    out.push_str("data: [DONE]\n\n");
    out.into_bytes()
}

/// Every payload broken once by a bare newline.
fn split_body(events: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..events {
        out.push_str(&format!(
            "data: {{\"choices\":[{{\"delta\":\n{{\"content\":\"token {i} \"}}}}]}}\n\n"
        ));
    }
    out.push_str("data: [DONE]\n\n");
    out.into_bytes()
}

fn consume(chunks: std::slice::Chunks<'_, u8>) -> usize {
    let mut processor = StreamProcessor::default();
    let mut sink = |content: &str| {
        black_box(content.len());
    };
    for chunk in chunks {
        processor.push(chunk, &mut sink);
    }
    processor.close(&mut sink);
    processor.content().len()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_chunk_sizes(c: &mut Criterion) {
    let body = sse_body(1_000);
    let mut group = c.benchmark_group("stream_chunk_size");
    group.throughput(Throughput::Bytes(body.len() as u64));

    for size in [16usize, 256, 4096, body.len()] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| consume(black_box(&body).chunks(size)))
        });
    }
    group.finish();
}

fn bench_split_payloads(c: &mut Criterion) {
    let body = split_body(1_000);
    let mut group = c.benchmark_group("stream_split_payloads");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("held_and_joined", |b| {
        b.iter(|| consume(black_box(&body).chunks(4096)))
    });
    group.finish();
}

criterion_group!(benches, bench_chunk_sizes, bench_split_payloads);
criterion_main!(benches);
