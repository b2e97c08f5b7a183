#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::{self, Cursor};

use atominfo::mach::MachO;
use atominfo::options::Options;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut macho) = MachO::parse(Cursor::new(data)) {
        let _ = macho.dump(&mut io::sink(), &Options::default());
    }
});
