//! Load commands tell the kernel and dynamic linker how to load this binary; this
//! module walks them and decodes the `linkedit_data_command` family

use core::fmt::{self, Display};
use std::io::{Read, Seek};

use log::debug;
use scroll::{IOread, IOwrite, Pread, Pwrite, SizeWith};

use crate::error;
use crate::mach::header::Header;
use crate::mach::source::Source;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, IOread, IOwrite, SizeWith)]
/// Occurs at the beginning of every load command to serve as a sort of tagged union/enum discriminant
pub struct LoadCommandHeader {
    pub cmd: u32,
    pub cmdsize: u32,
}

impl Display for LoadCommandHeader {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "LoadCommandHeader: {} size: {}",
            cmd_to_str(self.cmd),
            self.cmdsize
        )
    }
}

pub const SIZEOF_LOAD_COMMAND: usize = 8;

/// The linkedit_data_command contains the offsets and sizes of a blob
/// of data in the __LINKEDIT segment.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, IOread, IOwrite, SizeWith)]
pub struct LinkeditDataCommand {
    /// LC_CODE_SIGNATURE, LC_SEGMENT_SPLIT_INFO, LC_FUNCTION_STARTS, LC_DATA_IN_CODE,
    /// LC_DYLIB_CODE_SIGN_DRS, LC_LINKER_OPTIMIZATION_HINT, LC_DYLD_EXPORTS_TRIE,
    /// LC_DYLD_CHAINED_FIXUPS or LC_ATOM_INFO.
    pub cmd: u32,
    /// sizeof(struct linkedit_data_command)
    pub cmdsize: u32,
    /// file offset of data in __LINKEDIT segment
    pub dataoff: u32,
    /// file size of data in __LINKEDIT segment
    pub datasize: u32,
}

pub const SIZEOF_LINKEDIT_DATA_COMMAND: usize = 16;

impl Display for LinkeditDataCommand {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "{}", cmd_to_str(self.cmd))?;
        writeln!(fmt, "  cmdsize {}", self.cmdsize)?;
        writeln!(fmt, "  offset {}", self.dataoff)?;
        writeln!(fmt, "  size {}", self.datasize)
    }
}

///////////////////////////////////////
// Constants, et. al
///////////////////////////////////////

pub const LC_REQ_DYLD: u32 = 0x8000_0000;
pub const LC_LOAD_WEAK_DYLIB: u32 = 0x18 | LC_REQ_DYLD;
pub const LC_RPATH: u32 = 0x1c | LC_REQ_DYLD;
pub const LC_REEXPORT_DYLIB: u32 = 0x1f | LC_REQ_DYLD;
pub const LC_DYLD_INFO_ONLY: u32 = 0x22 | LC_REQ_DYLD;
pub const LC_LOAD_UPWARD_DYLIB: u32 = 0x23 | LC_REQ_DYLD;
pub const LC_MAIN: u32 = 0x28 | LC_REQ_DYLD;
pub const LC_DYLD_EXPORTS_TRIE: u32 = 0x33 | LC_REQ_DYLD;
pub const LC_DYLD_CHAINED_FIXUPS: u32 = 0x34 | LC_REQ_DYLD;
pub const LC_FILESET_ENTRY: u32 = 0x35 | LC_REQ_DYLD;
pub const LC_SEGMENT: u32 = 0x1;
pub const LC_SYMTAB: u32 = 0x2;
pub const LC_SYMSEG: u32 = 0x3;
pub const LC_THREAD: u32 = 0x4;
pub const LC_UNIXTHREAD: u32 = 0x5;
pub const LC_LOADFVMLIB: u32 = 0x6;
pub const LC_IDFVMLIB: u32 = 0x7;
pub const LC_IDENT: u32 = 0x8;
pub const LC_FVMFILE: u32 = 0x9;
pub const LC_PREPAGE: u32 = 0xa;
pub const LC_DYSYMTAB: u32 = 0xb;
pub const LC_LOAD_DYLIB: u32 = 0xc;
pub const LC_ID_DYLIB: u32 = 0xd;
pub const LC_LOAD_DYLINKER: u32 = 0xe;
pub const LC_ID_DYLINKER: u32 = 0xf;
pub const LC_PREBOUND_DYLIB: u32 = 0x10;
pub const LC_ROUTINES: u32 = 0x11;
pub const LC_SUB_FRAMEWORK: u32 = 0x12;
pub const LC_SUB_UMBRELLA: u32 = 0x13;
pub const LC_SUB_CLIENT: u32 = 0x14;
pub const LC_SUB_LIBRARY: u32 = 0x15;
pub const LC_TWOLEVEL_HINTS: u32 = 0x16;
pub const LC_PREBIND_CKSUM: u32 = 0x17;
pub const LC_SEGMENT_64: u32 = 0x19;
pub const LC_ROUTINES_64: u32 = 0x1a;
pub const LC_UUID: u32 = 0x1b;
pub const LC_CODE_SIGNATURE: u32 = 0x1d;
pub const LC_SEGMENT_SPLIT_INFO: u32 = 0x1e;
pub const LC_LAZY_LOAD_DYLIB: u32 = 0x20;
pub const LC_ENCRYPTION_INFO: u32 = 0x21;
pub const LC_DYLD_INFO: u32 = 0x22;
pub const LC_VERSION_MIN_MACOSX: u32 = 0x24;
pub const LC_VERSION_MIN_IPHONEOS: u32 = 0x25;
pub const LC_FUNCTION_STARTS: u32 = 0x26;
pub const LC_DYLD_ENVIRONMENT: u32 = 0x27;
pub const LC_DATA_IN_CODE: u32 = 0x29;
pub const LC_SOURCE_VERSION: u32 = 0x2A;
pub const LC_DYLIB_CODE_SIGN_DRS: u32 = 0x2B;
pub const LC_ENCRYPTION_INFO_64: u32 = 0x2C;
pub const LC_LINKER_OPTION: u32 = 0x2D;
pub const LC_LINKER_OPTIMIZATION_HINT: u32 = 0x2E;
pub const LC_VERSION_MIN_TVOS: u32 = 0x2F;
pub const LC_VERSION_MIN_WATCHOS: u32 = 0x30;
pub const LC_NOTE: u32 = 0x31;
pub const LC_BUILD_VERSION: u32 = 0x32;
/// linker-generated atom info for mergeable libraries, a linkedit_data_command
pub const LC_ATOM_INFO: u32 = 0x36;

pub fn cmd_to_str(cmd: u32) -> &'static str {
    match cmd {
        LC_SEGMENT => "LC_SEGMENT",
        LC_SYMTAB => "LC_SYMTAB",
        LC_SYMSEG => "LC_SYMSEG",
        LC_THREAD => "LC_THREAD",
        LC_UNIXTHREAD => "LC_UNIXTHREAD",
        LC_LOADFVMLIB => "LC_LOADFVMLIB",
        LC_IDFVMLIB => "LC_IDFVMLIB",
        LC_IDENT => "LC_IDENT",
        LC_FVMFILE => "LC_FVMFILE",
        LC_PREPAGE => "LC_PREPAGE",
        LC_DYSYMTAB => "LC_DYSYMTAB",
        LC_LOAD_DYLIB => "LC_LOAD_DYLIB",
        LC_ID_DYLIB => "LC_ID_DYLIB",
        LC_LOAD_DYLINKER => "LC_LOAD_DYLINKER",
        LC_ID_DYLINKER => "LC_ID_DYLINKER",
        LC_PREBOUND_DYLIB => "LC_PREBOUND_DYLIB",
        LC_ROUTINES => "LC_ROUTINES",
        LC_SUB_FRAMEWORK => "LC_SUB_FRAMEWORK",
        LC_SUB_UMBRELLA => "LC_SUB_UMBRELLA",
        LC_SUB_CLIENT => "LC_SUB_CLIENT",
        LC_SUB_LIBRARY => "LC_SUB_LIBRARY",
        LC_TWOLEVEL_HINTS => "LC_TWOLEVEL_HINTS",
        LC_PREBIND_CKSUM => "LC_PREBIND_CKSUM",
        LC_LOAD_WEAK_DYLIB => "LC_LOAD_WEAK_DYLIB",
        LC_SEGMENT_64 => "LC_SEGMENT_64",
        LC_ROUTINES_64 => "LC_ROUTINES_64",
        LC_UUID => "LC_UUID",
        LC_RPATH => "LC_RPATH",
        LC_CODE_SIGNATURE => "LC_CODE_SIGNATURE",
        LC_SEGMENT_SPLIT_INFO => "LC_SEGMENT_SPLIT_INFO",
        LC_REEXPORT_DYLIB => "LC_REEXPORT_DYLIB",
        LC_LAZY_LOAD_DYLIB => "LC_LAZY_LOAD_DYLIB",
        LC_ENCRYPTION_INFO => "LC_ENCRYPTION_INFO",
        LC_DYLD_INFO => "LC_DYLD_INFO",
        LC_DYLD_INFO_ONLY => "LC_DYLD_INFO_ONLY",
        LC_LOAD_UPWARD_DYLIB => "LC_LOAD_UPWARD_DYLIB",
        LC_VERSION_MIN_MACOSX => "LC_VERSION_MIN_MACOSX",
        LC_VERSION_MIN_IPHONEOS => "LC_VERSION_MIN_IPHONEOS",
        LC_FUNCTION_STARTS => "LC_FUNCTION_STARTS",
        LC_DYLD_ENVIRONMENT => "LC_DYLD_ENVIRONMENT",
        LC_MAIN => "LC_MAIN",
        LC_DATA_IN_CODE => "LC_DATA_IN_CODE",
        LC_SOURCE_VERSION => "LC_SOURCE_VERSION",
        LC_DYLIB_CODE_SIGN_DRS => "LC_DYLIB_CODE_SIGN_DRS",
        LC_ENCRYPTION_INFO_64 => "LC_ENCRYPTION_INFO_64",
        LC_LINKER_OPTION => "LC_LINKER_OPTION",
        LC_LINKER_OPTIMIZATION_HINT => "LC_LINKER_OPTIMIZATION_HINT",
        LC_VERSION_MIN_TVOS => "LC_VERSION_MIN_TVOS",
        LC_VERSION_MIN_WATCHOS => "LC_VERSION_MIN_WATCHOS",
        LC_NOTE => "LC_NOTE",
        LC_BUILD_VERSION => "LC_BUILD_VERSION",
        LC_DYLD_EXPORTS_TRIE => "LC_DYLD_EXPORTS_TRIE",
        LC_DYLD_CHAINED_FIXUPS => "LC_DYLD_CHAINED_FIXUPS",
        LC_FILESET_ENTRY => "LC_FILESET_ENTRY",
        LC_ATOM_INFO => "LC_ATOM_INFO",
        _ => "LC_UNKNOWN",
    }
}

/// The load commands whose body is a `linkedit_data_command`
pub const LINKEDIT_DATA_COMMANDS: [u32; 9] = [
    LC_CODE_SIGNATURE,
    LC_SEGMENT_SPLIT_INFO,
    LC_FUNCTION_STARTS,
    LC_DATA_IN_CODE,
    LC_DYLIB_CODE_SIGN_DRS,
    LC_LINKER_OPTIMIZATION_HINT,
    LC_DYLD_EXPORTS_TRIE,
    LC_DYLD_CHAINED_FIXUPS,
    LC_ATOM_INFO,
];

pub fn is_linkedit_data_command(cmd: u32) -> bool {
    LINKEDIT_DATA_COMMANDS.contains(&cmd)
}

/// Looks up a linkedit data command by its `LC_*` name
pub fn linkedit_data_command_from_str(name: &str) -> Option<u32> {
    LINKEDIT_DATA_COMMANDS
        .iter()
        .copied()
        .find(|&cmd| cmd_to_str(cmd) == name)
}

/// A load command record and where it lives in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCommand {
    /// position of this command among the header's `ncmds`
    pub index: u32,
    /// absolute file offset of the record
    pub offset: u64,
    pub header: LoadCommandHeader,
}

impl LoadCommand {
    /// Absolute file offset of the record that follows this one
    pub fn next_offset(&self) -> u64 {
        self.offset + u64::from(self.header.cmdsize)
    }
}

/// Visits the `ncmds` load command records that follow the mach header.
///
/// The walker owns the offset of the next record and advances it only by the
/// declared `cmdsize`, so whatever a caller reads from the source in between
/// two calls cannot move it.
#[derive(Debug, Clone)]
pub struct LoadCommandWalker {
    index: u32,
    ncmds: u32,
    offset: u64,
}

impl LoadCommandWalker {
    pub fn new(header: &Header) -> Self {
        LoadCommandWalker {
            index: 0,
            ncmds: header.ncmds,
            offset: header.size() as u64,
        }
    }

    /// How many records have not been visited yet
    pub fn remaining(&self) -> u32 {
        self.ncmds - self.index
    }

    /// Decode the next record, or `None` once `ncmds` records have been visited
    pub fn next_command<R: Read + Seek>(
        &mut self,
        source: &mut Source<R>,
    ) -> error::Result<Option<LoadCommand>> {
        if self.index >= self.ncmds {
            return Ok(None);
        }
        let offset = self.offset;
        let header: LoadCommandHeader = source.pread_at(offset, scroll::LE)?;
        if (header.cmdsize as usize) < SIZEOF_LOAD_COMMAND {
            return Err(error::Error::Malformed(format!(
                "load command {} at {:#x} ({}) is smaller than a load command header",
                self.index, offset, header
            )));
        }
        let command = LoadCommand {
            index: self.index,
            offset,
            header,
        };
        debug!("({}) {:#x}: {}", command.index, offset, header);
        self.offset = command.next_offset();
        self.index += 1;
        Ok(Some(command))
    }
}

/// An iterator over the load commands of a source, which stops after the first error
pub struct LoadCommands<'a, R> {
    walker: LoadCommandWalker,
    source: &'a mut Source<R>,
    done: bool,
}

impl<'a, R: Read + Seek> LoadCommands<'a, R> {
    pub fn new(header: &Header, source: &'a mut Source<R>) -> Self {
        LoadCommands {
            walker: LoadCommandWalker::new(header),
            source,
            done: false,
        }
    }
}

impl<R: Read + Seek> Iterator for LoadCommands<'_, R> {
    type Item = error::Result<LoadCommand>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.walker.next_command(self.source) {
            Ok(Some(command)) => Some(Ok(command)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read + Seek> core::iter::FusedIterator for LoadCommands<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::header::{MH_MAGIC_64, SIZEOF_MACH_HEADER_64};
    use std::io::Cursor;

    fn image(commands: &[(u32, u32)]) -> (Header, Source<Cursor<Vec<u8>>>) {
        let header = Header {
            magic: MH_MAGIC_64,
            ncmds: commands.len() as u32,
            sizeofcmds: commands.iter().map(|&(_, size)| size).sum(),
            ..Default::default()
        };
        let mut bytes = Vec::new();
        bytes.iowrite_with(header, scroll::LE).unwrap();
        for &(cmd, cmdsize) in commands {
            let lc = LoadCommandHeader { cmd, cmdsize };
            bytes.iowrite_with(lc, scroll::LE).unwrap();
            let pad = (cmdsize as usize).saturating_sub(SIZEOF_LOAD_COMMAND);
            bytes.extend(std::iter::repeat_n(0u8, pad));
        }
        (header, Source::new(Cursor::new(bytes)).unwrap())
    }

    #[test]
    fn size_of_records() {
        use scroll::ctx::SizeWith;
        assert_eq!(
            LoadCommandHeader::size_with(&scroll::LE),
            SIZEOF_LOAD_COMMAND
        );
        assert_eq!(
            LinkeditDataCommand::size_with(&scroll::LE),
            SIZEOF_LINKEDIT_DATA_COMMAND
        );
    }

    #[test]
    fn walks_every_record_by_declared_size() {
        let commands = [(LC_SEGMENT_64, 72), (LC_ATOM_INFO, 16), (LC_UUID, 24)];
        let (header, mut source) = image(&commands);
        let visited: Vec<LoadCommand> = LoadCommands::new(&header, &mut source)
            .collect::<error::Result<_>>()
            .unwrap();
        assert_eq!(visited.len(), commands.len());
        assert_eq!(visited[0].offset, SIZEOF_MACH_HEADER_64 as u64);
        for pair in visited.windows(2) {
            let expected = pair[0].offset + u64::from(pair[0].header.cmdsize);
            assert_eq!(pair[1].offset, expected);
        }
        let cmds: Vec<u32> = visited.iter().map(|c| c.header.cmd).collect();
        assert_eq!(cmds, vec![LC_SEGMENT_64, LC_ATOM_INFO, LC_UUID]);
    }

    #[test]
    fn reads_in_between_do_not_move_the_walker() {
        let (header, mut source) = image(&[(LC_UUID, 24), (LC_ATOM_INFO, 16)]);
        let mut walker = LoadCommandWalker::new(&header);
        let first = walker.next_command(&mut source).unwrap().unwrap();
        let _: u32 = source.pread_at(0, scroll::LE).unwrap();
        let second = walker.next_command(&mut source).unwrap().unwrap();
        assert_eq!(second.offset, first.next_offset());
        assert_eq!(walker.remaining(), 0);
        assert_eq!(walker.next_command(&mut source).unwrap(), None);
    }

    #[test]
    fn undersized_command_is_malformed() {
        let (header, mut source) = image(&[(LC_UUID, 4), (LC_ATOM_INFO, 16)]);
        let mut commands = LoadCommands::new(&header, &mut source);
        match commands.next() {
            Some(Err(error::Error::Malformed(_))) => (),
            other => panic!("expected a malformed command, got {:?}", other),
        }
        assert!(commands.next().is_none());
    }

    #[test]
    fn zero_sized_command_is_malformed() {
        let (header, mut source) = image(&[(LC_ATOM_INFO, 0)]);
        let mut walker = LoadCommandWalker::new(&header);
        let err = walker.next_command(&mut source).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn fewer_records_than_declared_is_truncation() {
        let (mut header, mut source) = image(&[(LC_UUID, 24)]);
        header.ncmds = 2;
        let results: Vec<_> = LoadCommands::new(&header, &mut source).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(error::Error::Truncated { .. })));
    }

    #[test]
    fn linkedit_data_command_names() {
        assert_eq!(
            linkedit_data_command_from_str("LC_ATOM_INFO"),
            Some(LC_ATOM_INFO)
        );
        assert_eq!(
            linkedit_data_command_from_str("LC_DYLD_CHAINED_FIXUPS"),
            Some(LC_DYLD_CHAINED_FIXUPS)
        );
        assert_eq!(linkedit_data_command_from_str("LC_SEGMENT_64"), None);
        assert!(is_linkedit_data_command(LC_FUNCTION_STARTS));
        assert!(!is_linkedit_data_command(LC_UUID));
    }

    #[test]
    fn summary_block() {
        let command = LinkeditDataCommand {
            cmd: LC_ATOM_INFO,
            cmdsize: 16,
            dataoff: 256,
            datasize: 17,
        };
        assert_eq!(
            command.to_string(),
            "LC_ATOM_INFO\n  cmdsize 16\n  offset 256\n  size 17\n"
        );
    }
}
