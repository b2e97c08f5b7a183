//! The 64-bit Mach-o header, and the magic numbers that identify it

use core::fmt;
use std::io::{Read, Seek};

use log::{debug, warn};
use scroll::{IOread, IOwrite, Pread, Pwrite, SizeWith};

use crate::error;
use crate::mach::constants::cputype::cpu_type_to_str;
use crate::mach::source::Source;

/// Mach Header magic constant
pub const MH_MAGIC: u32 = 0xfeed_face;
pub const MH_CIGAM: u32 = 0xcefa_edfe;
/// Mach Header magic constant for 64-bit
pub const MH_MAGIC_64: u32 = 0xfeed_facf;
pub const MH_CIGAM_64: u32 = 0xcffa_edfe;
/// Fat (multi-architecture) container magic, stored big endian
pub const FAT_MAGIC: u32 = 0xcafe_babe;
pub const FAT_CIGAM: u32 = 0xbeba_feca;

// Constants for the filetype field of the mach_header
/// relocatable object file
pub const MH_OBJECT: u32 = 0x1;
/// demand paged executable file
pub const MH_EXECUTE: u32 = 0x2;
/// fixed VM shared library file
pub const MH_FVMLIB: u32 = 0x3;
/// core file
pub const MH_CORE: u32 = 0x4;
/// preloaded executable file
pub const MH_PRELOAD: u32 = 0x5;
/// dynamically bound shared library
pub const MH_DYLIB: u32 = 0x6;
/// dynamic link editor
pub const MH_DYLINKER: u32 = 0x7;
/// dynamically bound bundle file
pub const MH_BUNDLE: u32 = 0x8;
/// shared library stub for static linking only, no section contents
pub const MH_DYLIB_STUB: u32 = 0x9;
/// companion file with only debug sections
pub const MH_DSYM: u32 = 0xa;
/// x86_64 kexts
pub const MH_KEXT_BUNDLE: u32 = 0xb;
/// a file composed of other Mach-Os to be run in the same userspace sharing a single linkedit
pub const MH_FILESET: u32 = 0xc;

pub fn filetype_to_str(filetype: u32) -> &'static str {
    match filetype {
        MH_OBJECT => "OBJECT",
        MH_EXECUTE => "EXECUTE",
        MH_FVMLIB => "FVMLIB",
        MH_CORE => "CORE",
        MH_PRELOAD => "PRELOAD",
        MH_DYLIB => "DYLIB",
        MH_DYLINKER => "DYLINKER",
        MH_BUNDLE => "BUNDLE",
        MH_DYLIB_STUB => "DYLIB_STUB",
        MH_DSYM => "DSYM",
        MH_KEXT_BUNDLE => "KEXT_BUNDLE",
        MH_FILESET => "FILESET",
        _ => "UNKNOWN FILETYPE",
    }
}

/// Names the container family a rejected magic belongs to, if it is one we know
pub fn magic_to_str(magic: u32) -> Option<&'static str> {
    match magic {
        MH_MAGIC => Some("32-bit Mach-o"),
        MH_CIGAM => Some("byte-swapped 32-bit Mach-o"),
        MH_CIGAM_64 => Some("byte-swapped 64-bit Mach-o"),
        // fat headers are big endian, so read little endian they show up swapped
        FAT_MAGIC | FAT_CIGAM => Some("fat (multi-architecture) Mach-o"),
        _ => None,
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, IOread, IOwrite, SizeWith)]
/// A 64-bit mach header
pub struct Header {
    /// mach magic number identifier
    pub magic: u32,
    /// cpu specifier
    pub cputype: u32,
    /// machine specifier
    pub cpusubtype: u32,
    /// type of file
    pub filetype: u32,
    /// number of load commands
    pub ncmds: u32,
    /// the size of all the load commands
    pub sizeofcmds: u32,
    /// flags
    pub flags: u32,
    /// reserved
    pub reserved: u32,
}

pub const SIZEOF_MACH_HEADER_64: usize = 32;

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Header")
            .field("magic", &format_args!("0x{:x}", self.magic))
            .field("cputype", &cpu_type_to_str(self.cputype))
            .field("cpusubtype", &format_args!("0x{:x}", self.cpusubtype))
            .field("filetype", &filetype_to_str(self.filetype))
            .field("ncmds", &self.ncmds)
            .field("sizeofcmds", &self.sizeofcmds)
            .field("flags", &format_args!("0x{:x}", self.flags))
            .field("reserved", &format_args!("0x{:x}", self.reserved))
            .finish()
    }
}

impl Header {
    /// Read and validate the header at the start of `source`.
    ///
    /// Only little endian 64-bit images are accepted; anything shorter than a
    /// header, or with any other magic, is a format error.
    pub fn parse<R: Read + Seek>(source: &mut Source<R>) -> error::Result<Header> {
        if source.len() < SIZEOF_MACH_HEADER_64 as u64 {
            return Err(error::Error::Malformed(format!(
                "input is {} bytes, smaller than a 64-bit mach header ({} bytes)",
                source.len(),
                SIZEOF_MACH_HEADER_64
            )));
        }
        let header: Header = source.pread_at(0, scroll::LE)?;
        if header.magic != MH_MAGIC_64 {
            if let Some(kind) = magic_to_str(header.magic) {
                warn!("{} binaries are not supported", kind);
            }
            return Err(error::Error::BadMagic(u64::from(header.magic)));
        }
        debug!("{:?}", header);
        Ok(header)
    }

    /// The size of this header on disk
    pub fn size(&self) -> usize {
        SIZEOF_MACH_HEADER_64
    }
}
