use std::io;

use crate::scanner::{Result, file::FileHandle};

/// Fixed-capacity memory region filled from a byte range of the file
///
/// The allocation is reserved up front and released when the buffer is dropped.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    capacity: usize,
}

impl Buffer {
    pub fn allocate(capacity: usize) -> Self {
        Buffer {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reads `min(capacity, file_size - offset)` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read. Fails if `offset` is at or past the end
    /// of the file or if the handle delivers fewer bytes than it reported.
    pub fn fill(&mut self, file: &dyn FileHandle, offset: u64) -> Result<usize> {
        let file_size = file.size();
        if offset >= file_size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("buffer fill at offset {offset} is past end of file ({file_size} bytes)"),
            )
            .into());
        }

        let remaining = usize::try_from(file_size - offset).unwrap_or(usize::MAX);
        let nbytes = remaining.min(self.capacity);
        self.data.clear();
        self.data.resize(nbytes, 0);

        let mut filled = 0;
        while filled < nbytes {
            let n = file.read_at(&mut self.data[filled..], offset + filled as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("short read at offset {offset}: {filled} of {nbytes} bytes"),
                )
                .into());
            }
            filled += n;
        }

        Ok(nbytes)
    }

    /// The bytes read by the last `fill`.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
