use std::{path::PathBuf, process::ExitCode, time::Instant};

use clap::Parser;
use csv_scanner::{CsvScan, DEFAULT_BATCH_SIZE, DEFAULT_BUFFER_SIZE, ScanOptions, bind::parse_schema};
use tracing_subscriber::EnvFilter;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Scan a CSV file in parallel and print what was read
#[derive(Debug, Parser)]
#[command(name = "csv-scanner", version)]
struct Cli {
    /// CSV file without a header row
    file: PathBuf,

    /// Column list, e.g. '{"id": "bigint", "value": "double", "name": "varchar"}'
    #[arg(long)]
    schema: String,

    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Print the first N rows
    #[arg(long, default_value_t = 5)]
    head: usize,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> csv_scanner::Result<()> {
    let mut options = ScanOptions::new()
        .with_buffer_size(cli.buffer_size)
        .with_batch_size(cli.batch_size);
    if let Some(threads) = cli.threads {
        options = options.with_threads(threads);
    }

    let scan = CsvScan::open(&cli.file, parse_schema(&cli.schema)?, options)?;
    println!(
        "{}: ~{} rows estimated",
        scan.display_name(),
        scan.estimate_row_count()
    );

    let started = Instant::now();
    let batches = scan.collect_batches()?;
    let elapsed = started.elapsed();

    let blocks = batches
        .iter()
        .map(|b| b.key().block_index)
        .max()
        .map_or(0, |last| last + 1);
    let rows: usize = batches.iter().map(|b| b.len()).sum();
    println!(
        "{rows} rows in {} batches from {blocks} blocks, {:.3}s",
        batches.len(),
        elapsed.as_secs_f64()
    );

    let header: Vec<&str> = scan.schema().names().collect();
    println!("{}", header.join(","));
    for row in batches.iter().flat_map(|b| b.rows()).take(cli.head) {
        let fields: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", fields.join(","));
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
