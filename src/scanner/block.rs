use memchr::memrchr;
use std::sync::Arc;

use crate::scanner::{Result, ScanError, buffer::Buffer, file::FileHandle};

/// Default buffer size, large enough that most rows fit and reads stay few.
pub const DEFAULT_BUFFER_SIZE: usize = 32_000_000; // 32MB

/// An immutable, newline-aligned view over one filled [`Buffer`]
#[derive(Debug)]
pub struct Block {
    buffer: Buffer,
    valid_len: usize,
    index: u64,
    offset: u64,
}

impl Block {
    /// The usable bytes of this block. Ends with `\n` unless this is the
    /// final block of a file without a trailing newline.
    pub fn data(&self) -> &[u8] {
        &self.buffer.data()[..self.valid_len]
    }

    pub fn len(&self) -> usize {
        self.valid_len
    }

    pub fn is_empty(&self) -> bool {
        self.valid_len == 0
    }

    /// Position of this block in file order, starting at 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Absolute file offset of the first byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Splits a file into sequential, non-overlapping, newline-aligned blocks
pub struct BlockIterator {
    file: Arc<dyn FileHandle>,
    file_size: u64,
    buffer_size: usize,
    current_offset: u64,
    blocks_produced: u64,
    failed: bool,
}

impl BlockIterator {
    /// # Panics
    /// Panics if `buffer_size` is zero. Option binding rejects small sizes before
    /// an iterator is ever built.
    pub fn new(file: Arc<dyn FileHandle>, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer size must be positive");
        let file_size = file.size();
        BlockIterator {
            file,
            file_size,
            buffer_size,
            current_offset: 0,
            blocks_produced: 0,
            failed: false,
        }
    }

    /// Produces the next block, or `None` once the whole file has been handed out.
    ///
    /// Every block but the last ends on a newline. The bytes after the last
    /// newline of a full buffer are not kept; they are read again as the head
    /// of the following block.
    ///
    /// # Errors
    /// - [`ScanError::OversizedRow`] if a full buffer holds no newline
    /// - [`ScanError::Io`] if the read fails
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let offset = self.current_offset;
        let mut buffer = Buffer::allocate(self.buffer_size);
        let read_len = buffer.fill(self.file.as_ref(), offset)?;

        let valid_len = if offset + read_len as u64 >= self.file_size {
            read_len
        } else {
            // TODO: carry the tail over into the next buffer instead of re-reading it
            match memrchr(b'\n', buffer.data()) {
                Some(pos) => pos + 1,
                None => {
                    return Err(ScanError::OversizedRow {
                        offset,
                        buffer_size: self.buffer_size,
                    });
                }
            }
        };

        self.current_offset += valid_len as u64;
        let index = self.blocks_produced;
        self.blocks_produced += 1;

        tracing::debug!(block = index, offset, len = valid_len, "CSV block read");

        Ok(Some(Block {
            buffer,
            valid_len,
            index,
            offset,
        }))
    }

    /// Percentage of the file handed out so far, in `[0, 100]`.
    pub fn progress(&self) -> f64 {
        if self.file_size == 0 {
            return 100.0;
        }
        100.0 * (self.current_offset as f64 / self.file_size as f64)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }
}

impl Iterator for BlockIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_block() {
            Ok(block) => block.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
