//! The 64-bit Mach-o load command walker and linkedit data extractor
use std::io::{Read, Seek, Write};

use log::debug;

use crate::error;
use crate::hexdump::HexDump;
use crate::options::Options;

pub mod constants;
pub mod header;
pub mod load_command;
pub mod source;

pub use self::constants::cputype;
use self::load_command::{LinkeditDataCommand, LoadCommandWalker, SIZEOF_LINKEDIT_DATA_COMMAND};
use self::source::Source;

/// A 64-bit Mach-o binary read lazily from a seekable stream
#[derive(Debug)]
pub struct MachO<R> {
    pub header: header::Header,
    source: Source<R>,
}

impl<R: Read + Seek> MachO<R> {
    /// Validates the header of the Mach-o in `reader`; load commands are read on demand
    pub fn parse(reader: R) -> error::Result<Self> {
        let mut source = Source::new(reader)?;
        let header = header::Header::parse(&mut source)?;
        Ok(MachO { header, source })
    }

    /// Iterate over the load command records
    pub fn load_commands(&mut self) -> load_command::LoadCommands<'_, R> {
        load_command::LoadCommands::new(&self.header, &mut self.source)
    }

    /// Read the `linkedit_data_command` stored at the absolute `offset`
    pub fn linkedit_data_command(&mut self, offset: u64) -> error::Result<LinkeditDataCommand> {
        let command: LinkeditDataCommand = self.source.pread_at(offset, scroll::LE)?;
        if (command.cmdsize as usize) < SIZEOF_LINKEDIT_DATA_COMMAND {
            return Err(error::Error::Malformed(format!(
                "{} at {:#x} has cmdsize {}, too small for a linkedit_data_command ({} bytes)",
                load_command::cmd_to_str(command.cmd),
                offset,
                command.cmdsize,
                SIZEOF_LINKEDIT_DATA_COMMAND
            )));
        }
        Ok(command)
    }

    /// Every `cmd` load command in this binary, decoded as a `linkedit_data_command`
    pub fn linkedit_data_commands(&mut self, cmd: u32) -> error::Result<Vec<LinkeditDataCommand>> {
        let mut commands = Vec::new();
        let mut walker = LoadCommandWalker::new(&self.header);
        while let Some(lc) = walker.next_command(&mut self.source)? {
            if lc.header.cmd == cmd {
                commands.push(self.linkedit_data_command(lc.offset)?);
            }
        }
        Ok(commands)
    }

    /// Read the payload `command` points at, which must lie within the file
    pub fn payload(&mut self, command: &LinkeditDataCommand) -> error::Result<Vec<u8>> {
        self.source
            .read_vec_at(u64::from(command.dataoff), u64::from(command.datasize))
    }

    /// Write a summary and a hex dump of every load command selected by `options` to `out`.
    ///
    /// Returns how many matching load commands were dumped.
    pub fn dump<W: Write>(&mut self, out: &mut W, options: &Options) -> error::Result<usize> {
        let mut count = 0;
        let mut walker = LoadCommandWalker::new(&self.header);
        while let Some(lc) = walker.next_command(&mut self.source)? {
            if lc.header.cmd != options.command {
                continue;
            }
            let command = self.linkedit_data_command(lc.offset)?;
            write!(out, "{}", command)?;
            let payload = self.payload(&command)?;
            debug!(
                "read {} payload bytes at {:#x}",
                payload.len(),
                command.dataoff
            );
            let hexdump = HexDump::new(&payload, u64::from(command.dataoff));
            write!(out, "{}", hexdump)?;
            count += 1;
        }
        Ok(count)
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }
}
