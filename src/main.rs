use atominfo::error::Error;
use atominfo::mach::MachO;
use atominfo::mach::load_command::{self, LINKEDIT_DATA_COMMANDS};
use atominfo::options::Options;
use std::env;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;

const USAGE: &str = "usage: atominfo <options> <mach-o file>
    -cmd <command>    linkedit data command to dump (default LC_ATOM_INFO),
                      either a name or a numeric tag, one of:";

fn usage() -> ! {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{}", USAGE);
    for cmd in LINKEDIT_DATA_COMMANDS {
        let name = load_command::cmd_to_str(cmd);
        let _ = writeln!(out, "{:26}{} (0x{:x})", "", name, cmd);
    }
    let _ = writeln!(out, "    -v{:16}log more to stderr, may be repeated", "");
    process::exit(1);
}

fn parse_command(arg: &str) -> Option<u32> {
    let cmd = if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Ok(cmd) = arg.parse::<u32>() {
        cmd
    } else {
        return load_command::linkedit_data_command_from_str(arg);
    };
    if load_command::is_linkedit_data_command(cmd) {
        Some(cmd)
    } else {
        None
    }
}

/// Why a run failed; each one is reported as a single line
enum Failure {
    Open(String),
    NotMachO(String),
    Other(Error),
}

impl From<Error> for Failure {
    fn from(err: Error) -> Failure {
        Failure::Other(err)
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Failure {
        Failure::Other(Error::from(err))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Failure::Open(path) => write!(f, "Error: Could not open file {}", path),
            Failure::NotMachO(path) => {
                write!(f, "Error: {} is not a valid Mach-O 64-bit file", path)
            }
            Failure::Other(err) => write!(f, "Error: {}", err),
        }
    }
}

fn dump(path: &str, options: &Options) -> Result<usize, Failure> {
    let file = File::open(path).map_err(|err| {
        log::debug!("{}: {}", path, err);
        Failure::Open(path.to_owned())
    })?;
    let mut macho = MachO::parse(file).map_err(|err| {
        if err.is_format_error() {
            log::debug!("{}", err);
            Failure::NotMachO(path.to_owned())
        } else {
            Failure::Other(err)
        }
    })?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "Mach-O 64-bit file")?;
    let result = macho.dump(&mut out, options);
    // whatever was rendered before an error stays visible
    out.flush()?;
    Ok(result?)
}

fn main() {
    let mut options = Options::default();
    let mut verbosity = 0usize;
    let mut path = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" => verbosity += 1,
            "-h" | "-help" | "--help" => usage(),
            "-cmd" => {
                let Some(cmd) = args.next().as_deref().and_then(parse_command) else {
                    usage()
                };
                options = options.with_command(cmd);
            }
            _ if arg.starts_with('-') && arg.len() > 1 => usage(),
            _ => {
                if path.is_some() {
                    usage();
                }
                path = Some(arg);
            }
        }
    }

    if let Err(err) = stderrlog::new()
        .module(module_path!())
        .verbosity(verbosity)
        .init()
    {
        eprintln!("failed to initialize logging: {}", err);
    }

    let Some(path) = path else {
        let _ = writeln!(io::stdout(), "Error: No file specified");
        process::exit(1);
    };

    match dump(&path, &options) {
        Ok(count) => log::info!(
            "dumped {} {} command(s)",
            count,
            load_command::cmd_to_str(options.command)
        ),
        Err(failure) => {
            // stdout may be the pipe that just broke
            let _ = writeln!(io::stdout(), "{}", failure);
            process::exit(1);
        }
    }
}
