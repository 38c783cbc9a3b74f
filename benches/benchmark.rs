use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use csv_scanner::{CsvScan, MemoryFile, ScanOptions, bind::parse_schema};
use jemallocator::Jemalloc;
use std::{fmt::Write, sync::Arc};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const ROWS: usize = 1_000_000;
const SCHEMA: &str = r#"{"id": "bigint", "value": "bigint", "price": "double", "category": "varchar"}"#;

fn generate_csv(rows: usize) -> String {
    let mut out = String::with_capacity(rows * 32);
    for i in 0..rows {
        writeln!(out, "{},{},{:.2},cat_{}", i, i * 10, (i as f64) * 1.5, i % 100).unwrap();
    }
    out
}

fn scan_throughput(c: &mut Criterion) {
    let data = Arc::new(MemoryFile::new(generate_csv(ROWS)));
    let schema = parse_schema(SCHEMA).unwrap();

    let mut group = c.benchmark_group("CsvScan");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ROWS as u64));

    for buffer_size in [1 << 16, 1 << 20, 32_000_000] {
        group.bench_function(format!("collect_batches/buffer_{buffer_size}"), |b| {
            let scan = CsvScan::bind(
                data.clone(),
                schema.clone(),
                ScanOptions::default().with_buffer_size(buffer_size),
            )
            .unwrap();
            b.iter(|| scan.collect_batches().unwrap())
        });
    }

    group.bench_function("collect_and_concat", |b| {
        let scan = CsvScan::bind(data.clone(), schema.clone(), ScanOptions::default()).unwrap();
        b.iter(|| scan.collect().unwrap())
    });

    group.finish();
}

criterion_group!(benches, scan_throughput);
criterion_main!(benches);
