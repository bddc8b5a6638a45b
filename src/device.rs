//! Output sink abstraction.
//!
//! Images are written by seeking to absolute positions and writing short
//! runs of bytes. Anything that is `Write + Seek` (a `File`, or a
//! `Cursor<Vec<u8>>` in tests) works as a sink.

use std::io::{self, Seek, SeekFrom, Write};

use crate::layout::SECTOR_SIZE;

/// A byte-addressable image being written.
pub trait ImageSink {
    /// Write `bytes` starting at absolute byte `offset`.
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()>;

    /// Write `bytes` at the start of sector `lba`.
    fn write_sector(&mut self, lba: u64, bytes: &[u8]) -> io::Result<()> {
        self.write_at(lba * SECTOR_SIZE as u64, bytes)
    }

    /// Establish the final length by writing its last byte. Everything not
    /// written afterwards reads as zero.
    fn preallocate(&mut self, len: u64) -> io::Result<()> {
        match len.checked_sub(1) {
            Some(last) => self.write_at(last, &[0]),
            None => Ok(()),
        }
    }
}

impl<T: Write + Seek> ImageSink for T {
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(bytes)
    }
}
