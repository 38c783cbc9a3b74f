use csv_scanner::{CsvScan, ScanOptions, bind::parse_schema};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

const SCHEMA: &str = r#"{"id": "bigint", "value": "bigint", "price": "double", "category": "varchar"}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _profiler = dhat::Profiler::new_heap();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/data_10m.csv".to_string());
    let scan = CsvScan::open(&path, parse_schema(SCHEMA)?, ScanOptions::default())?;

    let mut rows = 0;
    for batch in scan.collect_batches()? {
        rows += batch.len();
    }

    println!("Scanned {rows} rows. See dhat-heap.json for details");
    Ok(())
}
