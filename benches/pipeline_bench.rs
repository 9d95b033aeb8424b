use criterion::{criterion_group, criterion_main, Criterion};

// Split + render benchmarks; no browser involved. Run with:
//    cargo bench

fn sample_document(sections: usize) -> String {
    let mut doc = String::from("# Weekly notes\n\nA short intro paragraph.\n\n");
    for i in 0..sections {
        doc.push_str(&format!("## Topic {}\n\nSome *text* with a [link](https://example.com).\n\n", i));
        doc.push_str("```rust\nfn main() {\n    println!(\"hello\");\n}\n```\n\n");
        doc.push_str("| a | b |\n|---|---|\n| 1 | 2 |\n\n");
    }
    doc
}

fn bench_split(c: &mut Criterion) {
    let doc = sample_document(50);
    c.bench_function("split_document_50_sections", |b| {
        b.iter(|| notesnap::split_document(&doc))
    });
}

fn bench_render(c: &mut Criterion) {
    let doc = sample_document(10);
    let blocks = notesnap::split_document(&doc);
    let renderer = notesnap::MarkupRenderer::new(&notesnap::Theme::default(), ".").expect("renderer");

    c.bench_function("render_blocks_10_sections", |b| {
        b.iter(|| {
            for block in &blocks {
                let _ = renderer.render_block(block);
            }
        })
    });
}

criterion_group!(benches, bench_split, bench_render);
criterion_main!(benches);
