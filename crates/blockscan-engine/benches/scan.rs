use blockscan_engine::{BlockDef, Grammar, Part, scan};
use criterion::{Criterion, criterion_group, criterion_main};

fn csv_content(rows: usize) -> String {
    let mut out = String::new();
    for i in 0..rows {
        out.push_str(&format!("field{i},\"quoted, {i}\",<tag {i}>,plain text {i},"));
    }
    out
}

fn csv_grammar() -> Grammar {
    BlockDef::new()
        .split(",")
        .strip(" ")
        .block("quotes", BlockDef::delimited("\"", "\"").escaped_stop("\\\""))
        .block("tag", BlockDef::delimited("<", ">").split(" "))
        .resolve()
        .unwrap()
}

fn reparse_grammar() -> Grammar {
    BlockDef::new()
        .split(",")
        .block(
            "quotes",
            BlockDef::delimited("\"", "\"")
                .handle(|parts, _| Ok(parts.first().cloned().unwrap_or_default()))
                .reparse(true),
        )
        .resolve()
        .unwrap()
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    group.sample_size(10);

    let content = csv_content(1_000);
    let grammar = csv_grammar();
    group.bench_function("csv_with_blocks", |b| {
        b.iter(|| {
            let parts: Part = scan(std::hint::black_box(&content), &grammar).unwrap();
            std::hint::black_box(parts);
        });
    });

    let grammar = reparse_grammar();
    group.bench_function("csv_with_reparse", |b| {
        b.iter(|| {
            let parts = scan(std::hint::black_box(&content), &grammar).unwrap();
            std::hint::black_box(parts);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
