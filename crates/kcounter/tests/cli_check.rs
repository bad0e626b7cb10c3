#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn unique_temp_path(tag: &str) -> PathBuf {
    PathBuf::from(format!(
        "/tmp/kcounter-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

fn run(args: &[&str], device: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kcounter"))
        .arg("--log-level")
        .arg("error")
        .arg("--device")
        .arg(device)
        .args(args)
        .output()
        .expect("kcounter should run")
}

#[test]
fn absent_node_exits_with_enoent() {
    let missing = unique_temp_path("missing");
    let output = run(&[], &missing);

    assert_eq!(output.status.code(), Some(libc::ENOENT));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: open:"));
}

#[test]
fn regular_file_exits_with_enodev() {
    let path = unique_temp_path("regular");
    std::fs::write(&path, b"not a device").expect("temp file should be writable");

    let output = run(&["check"], &path);
    assert_eq!(output.status.code(), Some(libc::ENODEV));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn device_without_message_ioctl_fails_read() {
    // /dev/null rejects both requests: the probe passes, the read does not.
    let null = Path::new("/dev/null");
    if !null.exists() {
        return;
    }
    let output = run(&[], null);

    assert_eq!(output.status.code(), Some(255));
    assert!(output.stdout.is_empty(), "buffer must never be printed");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: read-message:"));
}

#[test]
fn doctor_reports_missing_node() {
    let missing = unique_temp_path("doctor");
    let output = run(&["--format", "json", "doctor"], &missing);

    assert_eq!(output.status.code(), Some(30));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("doctor should emit json");
    assert_eq!(payload["overall"], "fail");
    assert_eq!(payload["device"], missing.display().to_string());
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_kcounter"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("kcounter {}", env!("CARGO_PKG_VERSION"))
    );
}
