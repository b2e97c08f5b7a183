//! An absolute-offset view over a seekable byte stream.
//!
//! Every read names the file offset it starts at; there is no implicit cursor
//! that callers have to save and restore around nested reads.

use std::io::{Read, Seek, SeekFrom};

use scroll::ctx::{FromCtx, SizeWith};
use scroll::{Endian, IOread};

use crate::error;

/// A length-aware, bounds-checked reader over `R`
#[derive(Debug)]
pub struct Source<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> Source<R> {
    /// Wrap `inner`, measuring its total length once
    pub fn new(mut inner: R) -> error::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Source { inner, len })
    }

    /// Total length of the underlying stream in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the underlying stream holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes available from `offset` to the end of the stream
    pub fn remaining(&self, offset: u64) -> u64 {
        self.len.saturating_sub(offset)
    }

    /// An empty range is in bounds wherever it starts
    fn check_bounds(&self, offset: u64, size: u64) -> error::Result<()> {
        if size > 0 && (offset > self.len || size > self.remaining(offset)) {
            return Err(error::Error::Truncated {
                offset,
                size,
                len: self.len,
            });
        }
        Ok(())
    }

    /// Decode a `T` stored at the absolute `offset` with endianness `le`
    pub fn pread_at<T>(&mut self, offset: u64, le: Endian) -> error::Result<T>
    where
        T: FromCtx<Endian> + SizeWith<Endian>,
    {
        self.check_bounds(offset, T::size_with(&le) as u64)?;
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(self.inner.ioread_with::<T>(le)?)
    }

    /// Fill `buf` with the bytes starting at the absolute `offset`
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> error::Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.check_bounds(offset, buf.len() as u64)?;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }

    /// Read `size` bytes at `offset` into a fresh buffer.
    ///
    /// The range is checked against the stream length before anything is
    /// allocated, so `size` may come straight from untrusted input.
    pub fn read_vec_at(&mut self, offset: u64, size: u64) -> error::Result<Vec<u8>> {
        self.check_bounds(offset, size)?;
        let mut bytes = vec![0u8; size as usize];
        self.read_at(offset, &mut bytes)?;
        Ok(bytes)
    }

    /// Give back the wrapped stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}
