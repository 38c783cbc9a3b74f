use memmap2::Mmap;
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

/// Read-only, positioned access to the bytes being scanned.
///
/// Implementations must be safe to read from several workers at once; the
/// scanner never writes through a handle.
pub trait FileHandle: Send + Sync {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Reads up to `dst.len()` bytes starting at `offset`, returning the number
    /// of bytes copied.
    fn read_at(&self, dst: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Path of the underlying file, if there is one.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// A memory mapped file on disk
#[derive(Debug)]
pub struct MmapFile {
    mmap: Option<Mmap>, // None for empty files
    path: PathBuf,
}

impl MmapFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // The file is opened read-only and never written through this map.
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(MmapFile {
            mmap,
            path: path.to_path_buf(),
        })
    }

    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl FileHandle for MmapFile {
    fn size(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn read_at(&self, dst: &mut [u8], offset: u64) -> io::Result<usize> {
        copy_at(self.bytes(), dst, offset)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// File contents held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        MemoryFile { data: data.into() }
    }
}

impl FileHandle for MemoryFile {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, dst: &mut [u8], offset: u64) -> io::Result<usize> {
        copy_at(&self.data, dst, offset)
    }
}

fn copy_at(src: &[u8], dst: &mut [u8], offset: u64) -> io::Result<usize> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start <= src.len())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read offset {offset} past end of file ({} bytes)", src.len()),
            )
        })?;
    let n = dst.len().min(src.len() - start);
    dst[..n].copy_from_slice(&src[start..start + n]);
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mmap_file_reads_at_offset() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "a,1\nb,2\n").unwrap();

        let file = MmapFile::open(tmp.path()).unwrap();
        assert_eq!(file.size(), 8);
        assert_eq!(file.path(), Some(tmp.path()));

        let mut dst = [0u8; 16];
        let n = file.read_at(&mut dst, 4).unwrap();
        assert_eq!(&dst[..n], b"b,2\n");
    }

    #[test]
    fn test_empty_file_maps_to_zero_size() {
        let tmp = NamedTempFile::new().unwrap();
        let file = MmapFile::open(tmp.path()).unwrap();
        assert_eq!(file.size(), 0);
    }

    #[test]
    fn test_read_past_end_fails() {
        let file = MemoryFile::new("abc");
        let mut dst = [0u8; 2];
        assert!(file.read_at(&mut dst, 10).is_err());
        assert_eq!(file.read_at(&mut dst, 3).unwrap(), 0);
    }
}
