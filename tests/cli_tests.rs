use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fresh, empty working directory for one run of the binary.
fn scratch_dir() -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "hostcrab-cli-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hostcrab"))
        .args(args)
        .current_dir(dir)
        .env_remove("HOSTCRAB_MAX_IN_FLIGHT")
        .output()
        .unwrap()
}

#[test]
fn version_exits_zero() {
    let out = run_in(&scratch_dir(), &["--version"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(&format!("hostcrab {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn missing_hosts_file_exits_one() {
    let dir = scratch_dir();
    let out = run_in(&dir, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error loading hosts file"));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn malformed_hosts_file_exits_one() {
    let dir = scratch_dir();
    std::fs::write(dir.join("hosts.json"), "{ nope").unwrap();
    let out = run_in(&dir, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error loading hosts file"));
    let _ = std::fs::remove_dir_all(dir);
}
