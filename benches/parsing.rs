//! Benchmarks for design tree loading.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tablemail::design;

fn bench_parse_single_node(c: &mut Criterion) {
    let json = r#"{"type":"TEXT","id":"t","characters":"Hello","fontSize":16}"#;
    c.bench_function("parse_single_node", |b| {
        b.iter(|| design::parse(black_box(json)).unwrap())
    });
}

fn bench_parse_newsletter(c: &mut Criterion) {
    let json = include_str!("../tests/fixtures/newsletter.json");
    c.bench_function("parse_newsletter", |b| {
        b.iter(|| design::parse(black_box(json)).unwrap())
    });
}

criterion_group!(benches, bench_parse_single_node, bench_parse_newsletter);
criterion_main!(benches);
