//! # csv-scanner
//!
//! `csv-scanner` reads flat, comma separated files into typed columnar batches
//! using several threads at once. It supports:
//!
//! - Splitting a file into large, newline-aligned blocks, so no row ever
//!   straddles two workers
//! - A shared coordinator that hands blocks out in file order under one lock
//! - Typed decoding of `VARCHAR`, `BIGINT` and `DOUBLE` columns
//! - Fixed-size batches that can be put back in file order by their key
//! - Arrow export of the decoded columns
//!
//! Fields are not quoted or escaped, the separator is always `,`, and the
//! column list is declared up front.
//!
//! # Example
//!
//! ```rust,no_run
//! use csv_scanner::{CsvScan, ScanOptions, bind::parse_schema};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = parse_schema(r#"{"id": "bigint", "value": "double", "category": "varchar"}"#)?;
//!     let scan = CsvScan::open("data.csv", schema, ScanOptions::default().with_threads(4))?;
//!
//!     println!("Estimated rows: {}", scan.estimate_row_count());
//!     for batch in scan.collect_batches()? {
//!         println!("{:?}: {} rows", batch.key(), batch.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod scanner;

#[cfg(feature = "python-bindings")]
pub mod python;

pub use scanner::{
    Result, ScanError, Value, bind,
    block::{Block, BlockIterator, DEFAULT_BUFFER_SIZE},
    column::{Batch, BatchKey, ColumnDef, ColumnType, ColumnVector, Schema},
    coordinator::{ScanCoordinator, ScanWorker},
    csv_scan::CsvScan,
    file::{FileHandle, MemoryFile, MmapFile},
    options::{DEFAULT_BATCH_SIZE, MIN_BUFFER_SIZE, ScanOptions},
    reader::RowParser,
};
