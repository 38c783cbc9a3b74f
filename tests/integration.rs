use std::{
    io::{self, Write},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use csv_scanner::{
    Batch, BlockIterator, ColumnDef, ColumnType, CsvScan, FileHandle, MemoryFile, ScanCoordinator,
    ScanError, ScanOptions, Schema, Value, bind::parse_schema,
};
use tempfile::NamedTempFile;

const CSV: &str = "a,1,1.5\nb,2,2.5\nc,3,3.5\n";

fn xyz_schema() -> Schema {
    Schema::new(vec![
        ColumnDef::new("x", ColumnType::Text),
        ColumnDef::new("y", ColumnType::Int64),
        ColumnDef::new("z", ColumnType::Float64),
    ])
    .unwrap()
}

fn expected_rows() -> Vec<Vec<Value>> {
    vec![
        vec![Value::from("a"), Value::from(1i64), Value::from(1.5)],
        vec![Value::from("b"), Value::from(2i64), Value::from(2.5)],
        vec![Value::from("c"), Value::from(3i64), Value::from(3.5)],
    ]
}

/// Runs every worker of `coordinator` on its own thread, like a host would.
fn run_workers(coordinator: Arc<ScanCoordinator>, batch_size: usize) -> Vec<Batch> {
    let handles: Vec<_> = (0..coordinator.max_workers())
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let mut out = Vec::new();
                if let Some(mut worker) = coordinator.init_worker().unwrap() {
                    while let Some(batch) = worker.next_batch(&coordinator, batch_size).unwrap() {
                        assert_eq!(batch.reader_index(), worker.batch_index());
                        out.push(batch);
                    }
                }
                out
            })
        })
        .collect();
    handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect()
}

#[test]
fn test_two_workers_with_tiny_buffer_reassemble_in_order() {
    let file: Arc<dyn FileHandle> = Arc::new(MemoryFile::new(CSV));
    let schema = Arc::new(xyz_schema());
    let coordinator = Arc::new(ScanCoordinator::new(
        BlockIterator::new(file, 12),
        Arc::clone(&schema),
        2,
    ));
    assert_eq!(coordinator.max_workers(), 2);

    let mut batches = run_workers(Arc::clone(&coordinator), 2048);
    assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), 3);

    batches.sort_by_key(Batch::key);
    let rows: Vec<Vec<Value>> = batches.iter().flat_map(|b| b.rows()).collect();
    assert_eq!(rows, expected_rows());
    assert_eq!(coordinator.progress(), 100.0);
}

#[test]
fn test_buffer_smaller_than_a_row_fails() {
    let file: Arc<dyn FileHandle> = Arc::new(MemoryFile::new(CSV));
    let coordinator = ScanCoordinator::new(BlockIterator::new(file, 4), Arc::new(xyz_schema()), 2);
    assert!(matches!(
        coordinator.init_worker(),
        Err(ScanError::OversizedRow { .. })
    ));
}

#[test]
fn test_final_row_without_trailing_newline() {
    let data = CSV.trim_end();
    for buffer_size in [9, 12, 20, 1024] {
        let file: Arc<dyn FileHandle> = Arc::new(MemoryFile::new(data));
        let coordinator = Arc::new(ScanCoordinator::new(
            BlockIterator::new(file, buffer_size),
            Arc::new(xyz_schema()),
            4,
        ));
        let mut batches = run_workers(coordinator, 2048);
        batches.sort_by_key(Batch::key);
        let rows: Vec<Vec<Value>> = batches.iter().flat_map(|b| b.rows()).collect();
        assert_eq!(rows, expected_rows(), "buffer size {buffer_size}");
    }
}

#[test]
fn test_blocks_reconstruct_the_file() {
    let data: String = (0..500)
        .map(|i| format!("row_{i},{},{}.25\n", i * 3, i))
        .collect();
    let file: Arc<dyn FileHandle> = Arc::new(MemoryFile::new(data.as_str()));

    let blocks: Vec<_> = BlockIterator::new(file, 256)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert!(blocks.len() > 1);
    assert!(blocks.iter().all(|b| b.data().ends_with(b"\n")));

    let joined: Vec<u8> = blocks.iter().flat_map(|b| b.data().iter().copied()).collect();
    assert_eq!(joined, data.as_bytes());
}

#[test]
fn test_scan_file_on_disk_matches_input() {
    let mut tmp = NamedTempFile::new().unwrap();
    let rows = 20_000;
    for i in 0..rows {
        writeln!(tmp, "{},{}.5,name_{}", i, i, i % 13).unwrap();
    }
    tmp.flush().unwrap();

    let schema = parse_schema(r#"{"id": "bigint", "value": "double", "name": "varchar"}"#).unwrap();
    let options = ScanOptions::new()
        .with_buffer_size(4096)
        .with_threads(4)
        .with_batch_size(333);
    let scan = CsvScan::open(tmp.path(), schema, options).unwrap();
    let table = scan.collect().unwrap();

    assert_eq!(table.len(), rows);
    let ids = table.column(0).unwrap().as_i64().unwrap();
    assert!(ids.iter().copied().eq(0..rows as i64));
    let values = table.column(1).unwrap().as_f64().unwrap();
    assert_eq!(values[7], 7.5);
    let names = table.column(2).unwrap().as_text().unwrap();
    assert_eq!(names[14], "name_1");
}

#[test]
fn test_progress_never_decreases() {
    let data: String = (0..200).map(|i| format!("{i},{i},{i}\n")).collect();
    let file: Arc<dyn FileHandle> = Arc::new(MemoryFile::new(data));
    let schema = Arc::new(
        parse_schema(r#"{"a": "bigint", "b": "bigint", "c": "double"}"#).unwrap(),
    );
    let coordinator = ScanCoordinator::new(BlockIterator::new(file, 64), schema, 1);

    let mut worker = coordinator.init_worker().unwrap().unwrap();
    let mut last = coordinator.progress();
    while worker.next_batch(&coordinator, 4).unwrap().is_some() {
        let progress = coordinator.progress();
        assert!(progress >= last);
        assert!(progress <= 100.0);
        last = progress;
    }
    assert_eq!(last, 100.0);
}

struct FailingFile {
    data: MemoryFile,
    fail_from: u64,
    failed_reads: AtomicUsize,
}

impl FileHandle for FailingFile {
    fn size(&self) -> u64 {
        self.data.size()
    }

    fn read_at(&self, dst: &mut [u8], offset: u64) -> io::Result<usize> {
        if offset >= self.fail_from {
            self.failed_reads.fetch_add(1, Ordering::Relaxed);
            return Err(io::Error::other("disk went away"));
        }
        self.data.read_at(dst, offset)
    }
}

#[test]
fn test_read_failure_is_fatal() {
    let data: String = (0..1000).map(|i| format!("{i},{i},{i}.0\n")).collect();
    let file = Arc::new(FailingFile {
        data: MemoryFile::new(data),
        fail_from: 2048,
        failed_reads: AtomicUsize::new(0),
    });
    let schema = parse_schema(r#"{"a": "bigint", "b": "bigint", "c": "double"}"#).unwrap();
    let options = ScanOptions::new().with_buffer_size(1024).with_threads(2);

    let scan = CsvScan::bind(file.clone(), schema, options).unwrap();
    assert!(matches!(scan.collect_batches(), Err(ScanError::Io(_))));
    // Nothing retries a failed read
    assert_eq!(file.failed_reads.load(Ordering::Relaxed), 1);
}

#[test]
fn test_cardinality_estimate() {
    let schema = parse_schema(r#"{"a": "bigint", "b": "varchar"}"#).unwrap();
    let scan = CsvScan::bind(
        Arc::new(MemoryFile::new("x".repeat(1000))),
        schema,
        ScanOptions::default(),
    )
    .unwrap();
    assert_eq!(scan.estimate_row_count(), 100);
}
