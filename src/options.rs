//! Options controlling what a dump extracts

use crate::mach::load_command::LC_ATOM_INFO;

/// Dump options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// The linkedit data load command whose payloads are dumped
    pub command: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            command: LC_ATOM_INFO,
        }
    }
}

impl Options {
    /// Create new Options with default settings
    pub fn new() -> Self {
        Default::default()
    }

    /// Dump the payloads of `command` instead
    pub fn with_command(mut self, command: u32) -> Self {
        self.command = command;
        self
    }
}
