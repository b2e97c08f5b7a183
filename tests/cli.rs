//! Runs the `atominfo` binary against fixture files written to the temp dir

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const MH_MAGIC_64: [u8; 4] = [0xcf, 0xfa, 0xed, 0xfe];
const LC_ATOM_INFO: u32 = 0x36;
const LC_UUID: u32 = 0x1b;

fn u32s(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// A dylib with an LC_UUID followed by an LC_ATOM_INFO pointing at `payload` placed at 0x80
fn fixture(magic: [u8; 4], atom_info_cmdsize: u32, payload: &[u8]) -> Vec<u8> {
    let mut bytes = magic.to_vec();
    // cputype, cpusubtype, filetype, ncmds, sizeofcmds, flags, reserved
    bytes.extend(u32s(&[0x0100_000c, 0, 0x6, 2, 40, 0, 0]));
    bytes.extend(u32s(&[LC_UUID, 24]));
    bytes.extend([0xab; 16]);
    let datasize = payload.len() as u32;
    bytes.extend(u32s(&[LC_ATOM_INFO, atom_info_cmdsize, 0x80, datasize]));
    bytes.resize(0x80, 0);
    bytes.extend_from_slice(payload);
    bytes
}

fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let name = format!("atominfo_test_{}_{}", std::process::id(), name);
    let path = env::temp_dir().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_atominfo"))
        .args(args)
        .output()
        .expect("run atominfo")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn dumps_atom_info() {
    let path = write_temp("dump", &fixture(MH_MAGIC_64, 16, b"atom info\x00\x01"));
    let output = run(&[path.to_str().unwrap()]);
    fs::remove_file(&path).unwrap();
    assert!(output.status.success(), "{:?}", output);
    let expected = format!(
        "Mach-O 64-bit file\n\
         LC_ATOM_INFO\n  cmdsize 16\n  offset 128\n  size 11\n\
         00000080 61 74 6f 6d 20 69 6e 66 6f 00 01 {}atom info..\n\n",
        "   ".repeat(5)
    );
    assert_eq!(stdout(&output), expected);
}

#[test]
fn missing_argument_is_a_usage_error() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "Error: No file specified\n");
}

#[test]
fn unknown_flag_prints_usage() {
    let output = run(&["-bogus", "file"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("usage: atominfo"));
}

#[test]
fn unopenable_file() {
    let path = env::temp_dir().join("atominfo_test_does_not_exist");
    let path = path.to_str().unwrap();
    let output = run(&[path]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        format!("Error: Could not open file {}\n", path)
    );
}

#[test]
fn wrong_magic_stops_before_any_command_output() {
    let path = write_temp("magic", &fixture([0xfe, 0xed, 0xfa, 0xcf], 16, b"x"));
    let p = path.to_str().unwrap().to_owned();
    let output = run(&[&p]);
    fs::remove_file(&path).unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        format!("Error: {} is not a valid Mach-O 64-bit file\n", p)
    );
}

#[test]
fn truncated_header_is_not_a_macho() {
    let path = write_temp("short", &MH_MAGIC_64);
    let p = path.to_str().unwrap().to_owned();
    let output = run(&[&p]);
    fs::remove_file(&path).unwrap();
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("is not a valid Mach-O 64-bit file"));
}

#[test]
fn malformed_command_size_fails() {
    let mut bytes = fixture(MH_MAGIC_64, 16, b"x");
    // shrink LC_UUID's cmdsize below the size of a load command header
    bytes[36..40].copy_from_slice(&4u32.to_le_bytes());
    let path = write_temp("cmdsize", &bytes);
    let output = run(&[path.to_str().unwrap()]);
    fs::remove_file(&path).unwrap();
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(
        out.starts_with("Mach-O 64-bit file\nError: Malformed entity"),
        "{}",
        out
    );
    assert!(!out.contains("LC_ATOM_INFO\n"));
}

#[test]
fn selects_command_by_name() {
    let path = write_temp("select", &fixture(MH_MAGIC_64, 16, b"x"));
    let output = run(&["-cmd", "LC_FUNCTION_STARTS", path.to_str().unwrap()]);
    fs::remove_file(&path).unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Mach-O 64-bit file\n");
}

#[test]
fn rejects_non_linkedit_command() {
    let output = run(&["-cmd", "LC_UUID", "file"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("usage: atominfo"));
}

#[test]
fn closed_stdout_is_a_clean_failure() {
    // far more output than a pipe buffer holds
    let payload = vec![0x41; 1 << 20];
    let path = write_temp("pipe", &fixture(MH_MAGIC_64, 16, &payload));
    let mut child = Command::new(env!("CARGO_BIN_EXE_atominfo"))
        .arg(&path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn atominfo");
    // the reader goes away like `atominfo big.dylib | head -1`
    drop(child.stdout.take());
    let status = child.wait().unwrap();
    fs::remove_file(&path).unwrap();
    // a panic would exit with 101
    assert_eq!(status.code(), Some(1));
}
