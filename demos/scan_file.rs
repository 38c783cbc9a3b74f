use csv_scanner::{CsvScan, ScanOptions, bind::parse_schema};

use crate::utils::{SAMPLE_SCHEMA, sample_csv_path};
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = sample_csv_path();
    let scan = CsvScan::open(&path, parse_schema(SAMPLE_SCHEMA)?, ScanOptions::default())?;
    println!("Estimated rows: {}", scan.estimate_row_count());

    // Whole file as one columnar table
    let table = scan.collect()?;
    println!("Rows read: {}", table.len());

    let prices = table.column(2).and_then(|c| c.as_f64()).unwrap_or_default();
    let total: f64 = prices.iter().sum();
    println!("Sum of 'price': {total:.2}");

    let (schema, chunk) = table.to_arrow(scan.schema());
    println!("Arrow fields: {:?}", schema.fields.iter().map(|f| &f.name).collect::<Vec<_>>());
    println!("Arrow arrays: {}", chunk.arrays().len());

    Ok(())
}
