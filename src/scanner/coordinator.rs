use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::scanner::{
    Result, ScanError,
    block::{Block, BlockIterator},
    column::{Batch, Schema},
    reader::RowParser,
};

/// Shared state of one scan: hands blocks out to workers in file order
///
/// The block iterator is the only state shared between workers and every
/// access to it goes through one mutex. The lock is held for a single block
/// read per request, file read included, and never while rows are parsed.
/// Progress is mirrored into an atomic so polling it never waits on a read.
pub struct ScanCoordinator {
    iterator: Mutex<BlockIterator>,
    schema: Arc<Schema>,
    max_workers: usize,
    file_size: u64,
    handed_out: AtomicU64,
    next_reader_index: AtomicU64,
    finished: AtomicBool,
}

impl ScanCoordinator {
    pub fn new(iterator: BlockIterator, schema: Arc<Schema>, thread_limit: usize) -> Self {
        let max_workers = Self::compute_max_workers(
            thread_limit,
            iterator.file_size(),
            iterator.buffer_size(),
        );
        ScanCoordinator {
            file_size: iterator.file_size(),
            handed_out: AtomicU64::new(iterator.current_offset()),
            iterator: Mutex::new(iterator),
            schema,
            max_workers,
            next_reader_index: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }

    fn compute_max_workers(thread_limit: usize, file_size: u64, buffer_size: usize) -> usize {
        let blocks = file_size.div_ceil(buffer_size as u64) + 1;
        let blocks = usize::try_from(blocks).unwrap_or(usize::MAX);
        thread_limit.min(blocks).max(1)
    }

    /// Upper bound on useful workers: never more than there are blocks to read.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Takes the next block, or `None` once the file is exhausted or the scan
    /// has been cancelled.
    ///
    /// An error is fatal for the whole scan: the caller gets it and every later
    /// request sees `None`.
    pub fn next_block(&self) -> Result<Option<Block>> {
        let mut iterator = self.iterator.lock();
        if self.finished.load(Ordering::Acquire) {
            return Ok(None);
        }
        match iterator.next_block() {
            Ok(block) => {
                self.handed_out
                    .store(iterator.current_offset(), Ordering::Release);
                if block.is_none() {
                    self.finished.store(true, Ordering::Release);
                }
                Ok(block)
            }
            Err(e) => {
                self.finished.store(true, Ordering::Release);
                Err(e)
            }
        }
    }

    pub fn next_reader_index(&self) -> u64 {
        self.next_reader_index.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_done(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Stops handing out blocks. Workers finish the block they hold and exit.
    pub fn cancel(&self) {
        if !self.finished.swap(true, Ordering::AcqRel) {
            tracing::debug!("CSV scan cancelled");
        }
    }

    /// Percentage of the file handed out to workers, in `[0, 100]`.
    pub fn progress(&self) -> f64 {
        if self.file_size == 0 {
            return 100.0;
        }
        let handed_out = self.handed_out.load(Ordering::Acquire);
        100.0 * (handed_out as f64 / self.file_size as f64)
    }

    /// Creates the local state for one worker.
    ///
    /// Returns `None` when there is no block left for it, which happens when
    /// more workers start than there are blocks.
    pub fn init_worker(&self) -> Result<Option<ScanWorker>> {
        if self.is_done() {
            return Ok(None);
        }
        let Some(block) = self.next_block()? else {
            return Ok(None);
        };
        let reader_index = self.next_reader_index();
        tracing::debug!(reader = reader_index, "CSV worker started");
        Ok(Some(ScanWorker {
            parser: RowParser::new(reader_index, Arc::clone(&self.schema), block),
            done: false,
        }))
    }
}

/// Per-worker scan state, owned by exactly one thread
#[derive(Debug)]
pub struct ScanWorker {
    parser: RowParser,
    done: bool,
}

impl ScanWorker {
    /// Stable ordering key of this worker's output.
    pub fn batch_index(&self) -> u64 {
        self.parser.reader_index()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Produces the next batch of at most `batch_size` rows.
    ///
    /// A batch never spans two blocks. When the current block is used up the
    /// worker asks the coordinator for another one; `Ok(None)` means this
    /// worker has no more data and will never produce any again.
    ///
    /// # Errors
    /// [`ScanError::Config`] if `batch_size` is zero, without touching any
    /// state. Any other error ends this worker.
    pub fn next_batch(
        &mut self,
        coordinator: &ScanCoordinator,
        batch_size: usize,
    ) -> Result<Option<Batch>> {
        if batch_size == 0 {
            return Err(ScanError::Config("batch size must be positive".into()));
        }

        while !self.done {
            if self.parser.is_exhausted() {
                match coordinator.next_block() {
                    Ok(Some(block)) => self.parser.update_block(block),
                    Ok(None) => {
                        tracing::debug!(reader = self.parser.reader_index(), "CSV worker finished");
                        self.done = true;
                    }
                    Err(e) => {
                        self.done = true;
                        return Err(e);
                    }
                }
                continue;
            }

            let mut batch = self.parser.new_batch(batch_size);
            if let Err(e) = self.parser.fill(&mut batch, batch_size) {
                self.done = true;
                return Err(e);
            }
            // Empty only when a truncated final row was dropped
            if !batch.is_empty() {
                return Ok(Some(batch));
            }
        }
        Ok(None)
    }
}
