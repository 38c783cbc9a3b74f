use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Writes a headerless CSV matching
/// `{"id": "bigint", "value": "bigint", "price": "double", "category": "varchar"}`.
fn main() -> std::io::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/data_10m.csv".to_string());
    let rows: u64 = args
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(10_000_000);

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    let mut rng = rand::rng();
    for i in 0..rows {
        let value = rng.random_range(1..1000);
        let price = rng.random_range(0.0..500.0);
        let category =
            ["US", "EU", "ASIA", "AFRICA", "AUSTRALIA", "SOUTH AMERICA"][rng.random_range(0..6)];
        writeln!(writer, "{},{},{:.2},{}", i, value, price, category)?;
    }
    writer.flush()?;

    println!("Sample CSV generated: {} ({} rows)", path, rows);
    Ok(())
}
