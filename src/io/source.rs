// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use crate::errors::{Error, Result};

/// A random-access byte stream.
///
/// Implementations are synchronous: `read` either fills part of `buf` and returns the number of
/// bytes placed there, or returns `None` to signal end-of-stream. A `Some(0)` return is never
/// produced — callers may treat any `Some` as "at least one byte was read". Seeking past the end
/// of the stream is permitted; the next `read` call simply returns `None`.
pub trait ByteSource {
    /// Total length of the stream in bytes, if known.
    fn length(&self) -> u64;

    /// Current absolute byte offset.
    fn position(&self) -> u64;

    /// Reposition the stream to an absolute byte offset.
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Read up to `buf.len()` bytes, returning the count placed into `buf`, or `None` at EOF.
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;
}

/// A `ByteSource` backed by an open file handle.
pub struct FileSource {
    file: File,
    len: u64,
    pos: u64,
}

impl FileSource {
    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(FileSource { file, len, pos: 0 })
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl ByteSource for FileSource {
    fn length(&self) -> u64 {
        self.len
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos)).map_err(Error::from)?;
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        if buf.is_empty() {
            return Ok(Some(0));
        }

        // `Read::read` on a `File` can return short reads that are not EOF (e.g. when
        // interrupted), so loop until the buffer is filled, no progress is made, or the
        // underlying reader is interrupted.
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::from(e)),
            }
        }

        self.pos += filled as u64;

        if filled == 0 {
            Ok(None)
        } else {
            Ok(Some(filled))
        }
    }
}

/// A `ByteSource` backed by an in-memory buffer.
pub struct MemorySource {
    data: Vec<u8>,
    pos: u64,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        MemorySource { data, pos: 0 }
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        MemorySource::new(data)
    }
}

impl ByteSource for MemorySource {
    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        if self.pos >= self.data.len() as u64 {
            return Ok(None);
        }

        let start = self.pos as usize;
        let end = std::cmp::min(self.data.len(), start + buf.len());
        let n = end - start;

        buf[..n].copy_from_slice(&self.data[start..end]);
        self.pos += n as u64;

        Ok(Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reads_and_reports_eof() {
        let mut src = MemorySource::new(vec![1, 2, 3, 4, 5]);
        let mut buf = [0u8; 3];

        assert_eq!(src.read(&mut buf).unwrap(), Some(3));
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(src.read(&mut buf).unwrap(), Some(2));
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(src.read(&mut buf).unwrap(), None);
    }

    #[test]
    fn memory_source_seek_past_end_then_reads_none() {
        let mut src = MemorySource::new(vec![1, 2, 3]);
        src.seek(100).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(src.read(&mut buf).unwrap(), None);
    }

    #[test]
    fn memory_source_position_tracks_reads_and_seeks() {
        let mut src = MemorySource::new(vec![0u8; 16]);
        assert_eq!(src.position(), 0);
        src.seek(8).unwrap();
        assert_eq!(src.position(), 8);
        let mut buf = [0u8; 4];
        src.read(&mut buf).unwrap();
        assert_eq!(src.position(), 12);
    }
}
