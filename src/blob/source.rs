//! Byte sources for ingestion
//!
//! Ingestion pulls from a [`ByteSource`]: a finite byte stream whose exact
//! length is knowable before streaming begins. The pipeline reads a source
//! twice (checksum pre-pass, then chunking pass), so sources must support
//! `rewind`. At most one window is in flight at a time; the next window is
//! only pulled after the previous chunk insert has been acknowledged.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A finite, rewindable byte stream with a pre-flight length probe.
pub trait ByteSource {
    /// Exact number of bytes the stream will yield.
    fn size(&self) -> io::Result<u64>;

    /// Pulls the next window of at most `max_len` bytes.
    ///
    /// Returns `None` at end of stream. The final window may be shorter than
    /// `max_len`; every other window is exactly `max_len` bytes.
    fn next_window(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>>;

    /// Restarts the stream from the first byte.
    fn rewind(&mut self) -> io::Result<()>;
}

/// A file on disk. The length probe is a filesystem stat.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: File,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn next_window(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        let mut buffer = vec![0u8; max_len];
        let mut filled = 0;
        // File::read may return short counts; fill the window or hit EOF
        while filled < max_len {
            let n = self.file.read(&mut buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buffer.truncate(filled);
        Ok(Some(buffer))
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

/// An in-memory byte source.
#[derive(Debug, Clone)]
pub struct SliceSource {
    data: Vec<u8>,
    position: usize,
}

impl SliceSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }
}

impl ByteSource for SliceSource {
    fn size(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn next_window(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        if self.position >= self.data.len() {
            return Ok(None);
        }
        let end = self.data.len().min(self.position + max_len);
        let window = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(Some(window))
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.position = 0;
        Ok(())
    }
}
