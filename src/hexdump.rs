//! `hexdump -C` style rendering of raw bytes.
//!
//! Bytes are split into rows of [`BYTES_PER_ROW`]. Each row shows the
//! address of its first byte, the bytes in hex, and the printable ASCII
//! characters among them:
//!
//! ```text
//! 00000100 41 42 43 44 45 46 47 48 49 4a 4b 4c 4d 4e 4f 50 ABCDEFGHIJKLMNOP
//! 00000110 51                                              Q
//! ```

use core::fmt;
use core::slice;

pub const BYTES_PER_ROW: usize = 16;

/// The character shown for `byte` in the ASCII column
#[inline]
pub fn printable(byte: u8) -> char {
    if (0x20..0x7f).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

/// A hex dump of `bytes`, addressed from `base`
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a> {
    bytes: &'a [u8],
    base: u64,
}

impl<'a> HexDump<'a> {
    pub fn new(bytes: &'a [u8], base: u64) -> Self {
        HexDump { bytes, base }
    }

    /// A fresh pass over the rows of this dump
    pub fn rows(&self) -> Rows<'a> {
        Rows {
            chunks: self.bytes.chunks(BYTES_PER_ROW),
            address: self.base,
        }
    }
}

/// Every row on its own line, followed by a blank line
impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{}", row)?;
        }
        writeln!(f)
    }
}

/// One line of a [`HexDump`]; holds at most [`BYTES_PER_ROW`] bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a> {
    pub address: u64,
    pub bytes: &'a [u8],
}

impl fmt::Display for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08x} ", self.address)?;
        for byte in self.bytes {
            write!(f, "{:02x} ", byte)?;
        }
        // keep the ascii column aligned on a short last row
        for _ in self.bytes.len()..BYTES_PER_ROW {
            f.write_str("   ")?;
        }
        for &byte in self.bytes {
            write!(f, "{}", printable(byte))?;
        }
        Ok(())
    }
}

/// Single-pass iterator over the rows of a [`HexDump`]
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    chunks: slice::Chunks<'a, u8>,
    address: u64,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.chunks.next()?;
        let row = Row {
            address: self.address,
            bytes,
        };
        self.address = self.address.wrapping_add(BYTES_PER_ROW as u64);
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl core::iter::FusedIterator for Rows<'_> {}
