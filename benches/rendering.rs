//! Benchmarks for email rendering.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tablemail::design;
use tablemail::host::NullHost;
use tablemail::render::{self, RenderOptions, style};

fn bench_render_newsletter(c: &mut Criterion) {
    let tree = design::parse(include_str!("../tests/fixtures/newsletter.json")).unwrap();
    let options = RenderOptions::default();

    c.bench_function("render_newsletter", |b| {
        b.iter(|| render::parse_tree(black_box(&tree), &options, &mut NullHost))
    });
}

fn bench_accumulate_styles(c: &mut Criterion) {
    let candidate = "font-family:'Inter', Arial, Helvetica, sans-serif;font-size:16px;\
                     padding:0;color:#000000;margin-top:0px;color:#333333;border:1px solid #cccccc";
    c.bench_function("accumulate_styles", |b| {
        b.iter(|| style::accumulate(black_box(candidate)))
    });
}

criterion_group!(benches, bench_render_newsletter, bench_accumulate_styles);
criterion_main!(benches);
