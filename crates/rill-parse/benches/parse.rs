use std::hint::black_box;

use codspeed_criterion_compat::{
    BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};
use rill_parse::{TextChange, parse, with_change};
use text_size::{TextRange, TextSize};

fn program(statements: usize) -> String {
    let mut text = String::new();
    for i in 0..statements {
        text.push_str(&format!("let v{i} = {i} * 3 + 1;\n"));
        text.push_str(&format!("print v{i}; // running total\n"));
    }
    text
}

fn benchmark_parser(c: &mut Criterion) {
    let inputs =
        [("Small", program(8)), ("Medium", program(128)), ("Large", program(1024))];

    let mut group = c.benchmark_group("Parser Benchmark");
    for (name, text) in &inputs {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", name), text, |b, text| {
            b.iter(|| black_box(parse(text.as_str())));
        });
    }
    group.finish();
}

fn benchmark_incremental(c: &mut Criterion) {
    let text = program(1024);
    let tree = parse(text.as_str());
    // Re-type the literal in the middle of the program.
    let offset = text.len() as u32 / 2;
    let offset = (offset..text.len() as u32)
        .find(|&i| text.as_bytes()[i as usize] == b'1')
        .unwrap();
    let change = TextChange::new(
        TextRange::at(TextSize::new(offset), TextSize::new(1)),
        TextSize::new(1),
    );

    let mut group = c.benchmark_group("Incremental Benchmark");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("with_change", |b| {
        b.iter(|| black_box(with_change(&tree, change, "7").unwrap()));
    });
    group.bench_function("reparse_from_scratch", |b| {
        let mut edited = text.clone();
        edited.replace_range(offset as usize..offset as usize + 1, "7");
        b.iter(|| black_box(parse(edited.as_str())));
    });
    group.finish();
}

criterion_group!(benches, benchmark_parser, benchmark_incremental);
criterion_main!(benches);
