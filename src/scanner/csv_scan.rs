use rayon::{
    ThreadPoolBuilder,
    iter::{IntoParallelIterator, ParallelIterator},
};
use std::{path::Path, sync::Arc};

use crate::scanner::{
    Result, ScanError,
    block::BlockIterator,
    column::{Batch, Schema},
    coordinator::ScanCoordinator,
    file::{FileHandle, MmapFile},
    options::ScanOptions,
};

/// A bound CSV scan: file, schema and options, checked and ready to run
///
/// # Examples
///
/// ```rust,no_run
/// # use csv_scanner::{CsvScan, ScanOptions, bind::parse_schema};
/// let schema = parse_schema(r#"{"id": "bigint", "name": "varchar"}"#).unwrap();
/// let scan = CsvScan::open("data.csv", schema, ScanOptions::default()).unwrap();
/// let table = scan.collect().unwrap();
/// println!("{} rows", table.len());
/// ```
#[derive(Clone)]
pub struct CsvScan {
    file: Arc<dyn FileHandle>,
    schema: Arc<Schema>,
    options: ScanOptions,
}

impl CsvScan {
    /// Binds a scan over an already opened file.
    ///
    /// # Errors
    /// Returns [`ScanError::Config`] if the options are invalid.
    pub fn bind(file: Arc<dyn FileHandle>, schema: Schema, options: ScanOptions) -> Result<Self> {
        options.validate()?;
        tracing::info!(
            file = %file.path().map(|p| p.display().to_string()).unwrap_or_default(),
            size = file.size(),
            columns = schema.len(),
            buffer_size = options.buffer_size,
            "CSV scan bound"
        );
        Ok(CsvScan {
            file,
            schema: Arc::new(schema),
            options,
        })
    }

    /// Memory maps `path` and binds a scan over it.
    pub fn open(path: impl AsRef<Path>, schema: Schema, options: ScanOptions) -> Result<Self> {
        let file = MmapFile::open(path)?;
        Self::bind(Arc::new(file), schema, options)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Rough row count: assumes about five bytes per field.
    pub fn estimate_row_count(&self) -> u64 {
        let estimated_row_width = self.schema.len() as u64 * 5;
        self.file.size() / estimated_row_width
    }

    /// File name for display in plans.
    pub fn display_name(&self) -> String {
        self.file
            .path()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    /// Scan state cannot be persisted.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Err(ScanError::Unsupported("serializing a CSV scan"))
    }

    /// Creates the shared state for one execution of this scan.
    pub fn init(&self) -> ScanCoordinator {
        let iterator = BlockIterator::new(Arc::clone(&self.file), self.options.buffer_size);
        ScanCoordinator::new(iterator, Arc::clone(&self.schema), self.options.threads)
    }

    /// Runs the scan on a dedicated pool and returns all batches in file order.
    ///
    /// The first fatal error cancels the remaining workers and is returned.
    pub fn collect_batches(&self) -> Result<Vec<Batch>> {
        let coordinator = self.init();
        let workers = coordinator.max_workers();
        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        let batch_size = self.options.batch_size;

        let per_worker: Vec<Result<Vec<Batch>>> = pool.install(|| {
            (0..workers)
                .into_par_iter()
                .map(|_| {
                    let result = run_worker(&coordinator, batch_size);
                    if result.is_err() {
                        coordinator.cancel();
                    }
                    result
                })
                .collect()
        });

        let mut batches = Vec::new();
        for result in per_worker {
            batches.extend(result?);
        }
        batches.sort_by_key(Batch::key);

        tracing::info!(
            file = %self.display_name(),
            batches = batches.len(),
            rows = batches.iter().map(Batch::len).sum::<usize>(),
            "CSV scan finished"
        );
        Ok(batches)
    }

    /// Runs the scan and concatenates every row into one batch.
    pub fn collect(&self) -> Result<Batch> {
        Batch::concat(&self.schema, self.collect_batches()?)
    }
}

fn run_worker(coordinator: &ScanCoordinator, batch_size: usize) -> Result<Vec<Batch>> {
    let mut batches = Vec::new();
    let Some(mut worker) = coordinator.init_worker()? else {
        return Ok(batches);
    };
    while let Some(batch) = worker.next_batch(coordinator, batch_size)? {
        batches.push(batch);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{
        Value,
        column::{ColumnDef, ColumnType},
        file::MemoryFile,
    };
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", ColumnType::Int64),
            ColumnDef::new("value", ColumnType::Float64),
            ColumnDef::new("category", ColumnType::Text),
        ])
        .unwrap()
    }

    fn generated_csv(rows: usize) -> String {
        (0..rows)
            .map(|i| format!("{},{}.5,cat_{}\n", i, i * 10, i % 7))
            .collect()
    }

    fn scan(data: &str, options: ScanOptions) -> CsvScan {
        CsvScan::bind(Arc::new(MemoryFile::new(data)), schema(), options).unwrap()
    }

    #[test]
    fn test_bind_rejects_invalid_options() {
        let result = CsvScan::bind(
            Arc::new(MemoryFile::new("")),
            schema(),
            ScanOptions::new().with_buffer_size(100),
        );
        assert!(matches!(result, Err(ScanError::Config(_))));
    }

    #[test]
    fn test_parallel_scan_keeps_file_order() {
        let data = generated_csv(5_000);
        let options = ScanOptions::new()
            .with_buffer_size(1024)
            .with_threads(4)
            .with_batch_size(100);
        let batches = scan(&data, options).collect_batches().unwrap();

        assert!(batches.iter().all(|b| b.len() <= 100));
        assert!(batches.windows(2).all(|w| w[0].key() < w[1].key()));

        let ids: Vec<i64> = batches
            .iter()
            .flat_map(|b| b.column(0).unwrap().as_i64().unwrap().to_vec())
            .collect();
        assert_eq!(ids, (0..5_000).collect::<Vec<i64>>());
    }

    #[test]
    fn test_collect_concatenates_rows() {
        let table = scan("1,0.5,a\n2,1.5,b", ScanOptions::default())
            .collect()
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.row(1).unwrap(),
            vec![Value::from(2i64), Value::from(1.5), Value::from("b")]
        );
    }

    #[test]
    fn test_empty_file_yields_no_batches() {
        let batches = scan("", ScanOptions::default()).collect_batches().unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn test_parse_error_stops_the_scan() {
        let mut data = generated_csv(2_000);
        data.push_str("oops,1.0,x\n");
        data.push_str(&generated_csv(2_000));
        let options = ScanOptions::new().with_buffer_size(1024).with_threads(4);
        assert!(matches!(
            scan(&data, options).collect_batches(),
            Err(ScanError::Parse { .. })
        ));
    }

    #[test]
    fn test_estimate_row_count() {
        let scan = scan(&"x".repeat(150), ScanOptions::default());
        assert_eq!(scan.estimate_row_count(), 10);
    }

    #[test]
    fn test_serialize_is_unsupported() {
        let scan = scan("", ScanOptions::default());
        assert!(matches!(scan.serialize(), Err(ScanError::Unsupported(_))));
    }

    #[test]
    fn test_open_reads_from_disk() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "{}", generated_csv(10)).unwrap();

        let scan = CsvScan::open(tmp.path(), schema(), ScanOptions::default()).unwrap();
        assert_eq!(
            scan.display_name(),
            tmp.path().file_name().unwrap().to_string_lossy()
        );
        assert_eq!(scan.collect().unwrap().len(), 10);
    }
}
