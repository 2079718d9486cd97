use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use web_answer::retrieval::chunking::RecursiveSplitter;

fn sample_document() -> String {
    (0..400)
        .map(|i| {
            format!(
                "Paragraph {} describes the history of the city, its monuments and \
                 the people who lived there across several centuries of change.",
                i
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = sample_document();
    let splitter = RecursiveSplitter::new(800, 50).expect("valid window");
    c.bench_function("chunking", |b| {
        b.iter(|| splitter.split_text(black_box(&document)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
