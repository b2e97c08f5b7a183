//! # atominfo
//!
//! Finds the linker-generated `LC_ATOM_INFO` load command of a 64-bit Mach-o
//! (or any other `linkedit_data_command`) and dumps the payload it points at.
//!
//! The binary is never loaded into memory as a whole: the header is
//! validated, the load commands are walked one record at a time by their
//! declared sizes, and only the selected payloads are read.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::fs::File;
//! use atominfo::mach::MachO;
//! use atominfo::options::Options;
//!
//! fn run() -> atominfo::error::Result<()> {
//!     let file = File::open("libmergeable.dylib")?;
//!     let mut macho = MachO::parse(file)?;
//!     println!("Mach-O 64-bit file");
//!     let stdout = std::io::stdout();
//!     macho.dump(&mut stdout.lock(), &Options::default())?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hexdump;
pub mod mach;
pub mod options;
