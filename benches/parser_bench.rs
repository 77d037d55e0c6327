//! Benchmarks for fs-bucket
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fs_bucket::batch::PathStreamParser;
use std::collections::VecDeque;

fn batch_body(count: usize) -> Vec<u8> {
    let paths: Vec<String> = (0..count)
        .map(|i| format!("/data/project/subdir_{}/file_{:06}.bin", i % 100, i))
        .collect();
    serde_json::json!({ "paths": paths, "note": {"skipped": [1, 2, 3]} })
        .to_string()
        .into_bytes()
}

fn parse_in_chunks(body: &[u8], chunk_size: usize) -> usize {
    let mut parser = PathStreamParser::new();
    let mut out = VecDeque::new();
    let mut count = 0;

    for chunk in body.chunks(chunk_size) {
        parser.feed(chunk, &mut out).unwrap();
        count += out.drain(..).count();
    }
    parser.finish().unwrap();
    count
}

fn benchmark_path_parser(c: &mut Criterion) {
    let body = batch_body(10_000);

    c.bench_function("parse_10k_paths_64k_chunks", |b| {
        b.iter(|| black_box(parse_in_chunks(black_box(&body), 64 * 1024)))
    });

    c.bench_function("parse_10k_paths_16b_chunks", |b| {
        b.iter(|| black_box(parse_in_chunks(black_box(&body), 16)))
    });
}

fn benchmark_escaped_paths(c: &mut Criterion) {
    let paths: Vec<String> = (0..1_000)
        .map(|i| format!("/tmp/quote\"d \\ dir/\u{00e9}t\u{00e9}_{}", i))
        .collect();
    let body = serde_json::json!({ "paths": paths }).to_string().into_bytes();

    c.bench_function("parse_1k_escaped_paths", |b| {
        b.iter(|| black_box(parse_in_chunks(black_box(&body), 4096)))
    });
}

fn benchmark_sha256(c: &mut Criterion) {
    use fs_bucket::content::sha256_hex;

    let data = vec![0xABu8; 1024 * 1024];
    c.bench_function("sha256_1mib", |b| b.iter(|| black_box(sha256_hex(black_box(&data)))));
}

criterion_group!(
    benches,
    benchmark_path_parser,
    benchmark_escaped_paths,
    benchmark_sha256,
);

criterion_main!(benches);
