//! Command line validation of the binary

use std::process::Command;

fn lanwatch() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lanwatch"));
    command.env_remove("LANWATCH_CONFIG");
    command
}

#[test]
fn test_rejects_prefix_without_trailing_dot() {
    let output = lanwatch().arg("abc").output().unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid subnet prefix 'abc'"), "{stderr}");
}

#[test]
fn test_rejects_overlong_prefix() {
    let output = lanwatch().arg("1234.1234.1234.1234.").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_rejects_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = lanwatch()
        .args(["-f", dir.path().join("nope.json").to_str().unwrap(), "10.0.0."])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_rejects_subnet_containing_internet_check() {
    let output = lanwatch().arg("8.8.8.").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("8.8.8.8"), "{stderr}");
}

#[test]
fn test_accepts_mute_flag() {
    let output = lanwatch().args(["--mute", "8.8.8."]).output().unwrap();

    // gets past argument parsing and fails on the subnet check instead
    assert_eq!(output.status.code(), Some(1));
}
