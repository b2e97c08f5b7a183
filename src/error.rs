//! A custom atominfo error
//!

use core::fmt;
use core::result;
use std::error;
use std::io;

#[non_exhaustive]
#[derive(Debug)]
/// A custom atominfo error
pub enum Error {
    /// The binary is malformed somehow
    Malformed(String),
    /// The binary's magic is unknown or bad
    BadMagic(u64),
    /// A read of `size` bytes at `offset` runs past the end of a `len` byte stream
    Truncated { offset: u64, size: u64, len: u64 },
    /// An error emanating from reading and interpreting bytes
    Scroll(scroll::Error),
    /// An IO based error
    IO(io::Error),
}

impl Error {
    /// Whether this error means the input is not a well formed 64-bit Mach-o
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Malformed(_) | Error::BadMagic(_))
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IO(ref io) => Some(io),
            Error::Scroll(ref scroll) => Some(scroll),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IO(err)
    }
}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Error {
        Error::Scroll(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IO(ref err) => write!(fmt, "{}", err),
            Error::Scroll(ref err) => write!(fmt, "{}", err),
            Error::BadMagic(magic) => write!(fmt, "Invalid magic number: 0x{:x}", magic),
            Error::Malformed(ref msg) => write!(fmt, "Malformed entity: {}", msg),
            Error::Truncated { offset, size, len } => write!(
                fmt,
                "Truncated stream: {} bytes requested at {:#x}, but the input is only {:#x} bytes",
                size, offset, len
            ),
        }
    }
}

/// The result of every fallible atominfo operation
pub type Result<T> = result::Result<T, Error>;
