use std::{sync::Arc, thread};

use csv_scanner::{
    BlockIterator, CsvScan, MmapFile, ScanCoordinator, ScanOptions, bind::parse_schema,
};

use crate::utils::{SAMPLE_SCHEMA, sample_csv_path};
mod utils;

/// Drives the workers by hand, the way a host engine would, then restores
/// file order from the batch keys.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let file = Arc::new(MmapFile::open(sample_csv_path())?);
    let schema = Arc::new(parse_schema(SAMPLE_SCHEMA)?);
    let options = ScanOptions::default().with_buffer_size(1 << 20);
    let batch_size = options.batch_size;

    let coordinator = Arc::new(ScanCoordinator::new(
        BlockIterator::new(file.clone(), options.buffer_size),
        schema,
        options.threads,
    ));

    let handles: Vec<_> = (0..coordinator.max_workers())
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || -> csv_scanner::Result<_> {
                let mut batches = Vec::new();
                if let Some(mut worker) = coordinator.init_worker()? {
                    while let Some(batch) = worker.next_batch(&coordinator, batch_size)? {
                        batches.push(batch);
                    }
                }
                Ok(batches)
            })
        })
        .collect();

    let mut batches = Vec::new();
    for handle in handles {
        let worker_batches = handle.join().map_err(|_| "worker panicked")??;
        batches.extend(worker_batches);
    }
    batches.sort_by_key(|b| b.key());

    for batch in batches.iter().take(5) {
        println!(
            "block {:>4} batch {:>3} from reader {}: {} rows",
            batch.key().block_index,
            batch.key().sequence,
            batch.reader_index(),
            batch.len()
        );
    }
    println!("Progress: {:.1}%", coordinator.progress());

    // Same result through the built-in driver
    let scan = CsvScan::bind(file, parse_schema(SAMPLE_SCHEMA)?, options)?;
    println!("Rows: {}", scan.collect()?.len());
    Ok(())
}
