//! Runs the front ends and checks the status each kind of failure exits with.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const BFINTERP: &str = env!("CARGO_BIN_EXE_bfinterp");
const BFCOMP: &str = env!("CARGO_BIN_EXE_bfcomp");
const BFJIT: &str = env!("CARGO_BIN_EXE_bfjit");

/// Writes `code` to a file named after `name` in the temporary directory.
fn program(name: &str, code: &[u8]) -> PathBuf {
    let path = env::temp_dir().join(format!("bfkit-{}-{}.bf", std::process::id(), name));
    fs::write(&path, code).unwrap();
    path
}

fn run(bin: &str, args: &[&str]) -> Output {
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

#[test]
fn success_is_zero() {
    let path = program("at", b"++++++++[>++++++++<-]>.");
    let output = run(BFINTERP, &[path.to_str().unwrap()]);
    let _ = fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(output.stdout, b"@");
}

#[test]
fn unmatched_bracket_is_a_parse_failure() {
    let open = program("open", b"+[>+\n<");
    let close = program("close", b"+]");

    for bin in &[BFINTERP, BFJIT] {
        let output = run(bin, &[open.to_str().unwrap()]);
        assert_eq!(output.status.code(), Some(65), "{}", bin);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("error: "), "{}", stderr);
        assert!(stderr.contains("1:2"), "{}", stderr);

        let output = run(bin, &[close.to_str().unwrap()]);
        assert_eq!(output.status.code(), Some(65), "{}", bin);
    }

    let output = run(BFCOMP, &["--emit-c", open.to_str().unwrap(), "-"]);
    assert_eq!(output.status.code(), Some(65));

    let _ = fs::remove_file(&open);
    let _ = fs::remove_file(&close);
}

#[test]
fn missing_source_is_unreadable() {
    for bin in &[BFINTERP, BFJIT] {
        let output = run(bin, &["/nonexistent/program.bf"]);
        assert_eq!(output.status.code(), Some(66), "{}", bin);
        // one line of report, nothing logged alongside it
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(stderr.lines().count(), 1, "{}", stderr);
        assert!(stderr.starts_with("error: could not read"), "{}", stderr);
    }
    let output = run(BFCOMP, &["--emit-c", "/nonexistent/program.bf", "-"]);
    assert_eq!(output.status.code(), Some(66));
}

#[test]
fn wrong_argument_count_is_a_usage_error() {
    assert_eq!(run(BFINTERP, &[]).status.code(), Some(64));
    assert_eq!(run(BFINTERP, &["a.bf", "b.bf"]).status.code(), Some(64));
    assert_eq!(run(BFJIT, &[]).status.code(), Some(64));
    assert_eq!(run(BFCOMP, &["a.bf"]).status.code(), Some(64));
}

#[test]
fn overflowing_a_small_tape_in_process() {
    let path = program("overflow", b"+.<<<<<<<<<<+.");
    let output = run(BFJIT, &["--tape-size", "16", path.to_str().unwrap()]);
    let _ = fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(71));
    assert_eq!(output.stdout, [1]);
}
