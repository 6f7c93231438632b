//! Benchmarks for the pagination engine

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use page_flow::layout::{estimate, BreakPlan, RenderedExtent};
use page_flow::render::ATTR_LINES;
use page_flow::{Direction, Document, HeadlessView, Node, PaginationOptions, Paginator};

fn paragraph(lines: u32) -> Node {
    Node::paragraph(40).with_attr(ATTR_LINES, lines.to_string())
}

/// `blocks` paragraphs with a page break after every `every`th one
fn document(blocks: usize, every: usize) -> Document {
    let mut doc = Document::new();
    for i in 0..blocks {
        doc.push(paragraph(3 + (i % 5) as u32));
        if every > 0 && i % every == every - 1 {
            let index = doc.len();
            doc.insert_page_break(index, Direction::After);
        }
    }
    doc
}

fn settled(doc: Document) -> Paginator<HeadlessView> {
    let options = PaginationOptions::default();
    let view = HeadlessView::new(&options).expect("default options");
    let mut paginator = Paginator::new(options, doc, view).expect("default options");
    paginator.pump();
    paginator
}

fn bench_plan_small(c: &mut Criterion) {
    let paginator = settled(document(50, 10));
    let metrics = *paginator.engine().metrics();
    c.bench_function("plan_small_document", |b| {
        b.iter(|| BreakPlan::compute(black_box(paginator.view()), &metrics));
    });
}

fn bench_plan_large(c: &mut Criterion) {
    let paginator = settled(document(1000, 20));
    let metrics = *paginator.engine().metrics();
    c.bench_function("plan_large_document", |b| {
        b.iter(|| BreakPlan::compute(black_box(paginator.view()), &metrics));
    });
}

fn bench_estimate(c: &mut Criterion) {
    let paginator = settled(document(1000, 0));
    let metrics = *paginator.engine().metrics();
    c.bench_function("estimate_page_count", |b| {
        b.iter(|| {
            let extent = RenderedExtent::read(black_box(paginator.view()));
            estimate(extent, paginator.page_count(), &metrics)
        });
    });
}

fn bench_pump_from_scratch(c: &mut Criterion) {
    c.bench_function("pump_100_blocks", |b| {
        b.iter(|| settled(black_box(document(100, 10))).page_count());
    });
}

fn bench_edit_and_pump(c: &mut Criterion) {
    c.bench_function("edit_and_pump", |b| {
        let mut paginator = settled(document(200, 10));
        b.iter(|| {
            paginator.insert(0, paragraph(2));
            paginator.pump();
            paginator.remove(0);
            paginator.pump();
        });
    });
}

criterion_group!(
    benches,
    bench_plan_small,
    bench_plan_large,
    bench_estimate,
    bench_pump_from_scratch,
    bench_edit_and_pump,
);
criterion_main!(benches);
