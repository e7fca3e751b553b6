use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_warcar").to_string()
}

const WARC: &[u8] = b"WARC/1.1\r\n\
WARC-Type: resource\r\n\
WARC-Target-URI: file:///notes.txt\r\n\
Content-Type: text/plain\r\n\
Content-Length: 12\r\n\
\r\n\
hello, warc!\r\n\r\n";

#[test]
fn cli_warc_car_roundtrip() {
    let dir = tempdir().unwrap();
    let warc = dir.path().join("in.warc");
    let car = dir.path().join("out.car");
    let back = dir.path().join("back.WARC");
    std::fs::write(&warc, WARC).unwrap();

    let st = Command::new(bin())
        .arg("convert")
        .arg(&warc)
        .arg(&car)
        .status()
        .unwrap();
    assert!(st.success());
    assert!(std::fs::metadata(&car).unwrap().len() > 18);

    let st = Command::new(bin())
        .arg("convert")
        .arg(&car)
        .arg(&back)
        .status()
        .unwrap();
    assert!(st.success());
    let out = std::fs::read_to_string(&back).unwrap();
    assert!(out.contains("hello, warc!"));
    assert!(out.contains("warc-target-uri: file:///notes.txt\r\n"));
}

#[test]
fn cli_relative_paths() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.warc"), WARC).unwrap();
    let st = Command::new(bin())
        .current_dir(dir.path())
        .args(["convert", "a.warc", "a.car"])
        .status()
        .unwrap();
    assert!(st.success());
    assert!(dir.path().join("a.car").exists());
}

#[test]
fn cli_rejects_same_kind() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.warc");
    let b = dir.path().join("b.warc");
    std::fs::write(&a, WARC).unwrap();

    let out = Command::new(bin())
        .arg("convert")
        .arg(&a)
        .arg(&b)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("Error: "));
    assert!(!b.exists());
}

#[test]
fn cli_rejects_unknown_extension() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.warc");
    std::fs::write(&a, WARC).unwrap();

    let out = Command::new(bin())
        .arg("convert")
        .arg(&a)
        .arg(dir.path().join("a.tar"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error: "));
}

#[test]
fn cli_missing_input() {
    let dir = tempdir().unwrap();
    let out = Command::new(bin())
        .arg("convert")
        .arg(dir.path().join("missing.warc"))
        .arg(dir.path().join("out.car"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("out.car").exists());
}

#[test]
fn cli_failure_removes_partial_output() {
    let dir = tempdir().unwrap();
    let warc = dir.path().join("bad.warc");
    let car = dir.path().join("bad.car");
    // Second record is truncated.
    let mut bytes = WARC.to_vec();
    bytes.extend_from_slice(&WARC[..WARC.len() - 10]);
    std::fs::write(&warc, bytes).unwrap();

    let out = Command::new(bin())
        .arg("convert")
        .arg(&warc)
        .arg(&car)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("truncated"));
    assert!(!car.exists());
}

#[test]
fn cli_version_flag() {
    let out = Command::new(bin()).arg("--version").output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("warcar "));
}

#[test]
fn cli_no_args_prints_help() {
    let out = Command::new(bin()).output().unwrap();
    assert!(!out.status.success());
}
