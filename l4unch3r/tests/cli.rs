//! End-to-end runs of the l4unch3r binary against scratch directories.

use assert_cmd::Command;
use l4unch3r::bootstrap::launcher::{IsolatedLoader, LaunchOutcome, Launcher};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn l4unch3r(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("l4unch3r").unwrap();
    cmd.arg("-C")
        .arg(workdir)
        .env_remove("L4UNCH3R_CONFIG")
        .env_remove("L4UNCH3R_ARCH")
        .env_remove("L4UNCH3R_WORKDIR")
        .env_remove("L4UNCH3R_NO_WAIT")
        .env_remove("RUST_LOG");
    cmd
}

/// Scratch dir whose installer runtime is a stand-in binary.
fn workspace(runtime: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("l4unch3r.toml"),
        format!("[installer]\nruntime = \"{runtime}\"\npackages = [\"pkgA\", \"pkgB\"]\n"),
    )
    .unwrap();
    dir
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_unsupported_device_exits_before_setup() {
    let dir = workspace("true");

    let output = l4unch3r(dir.path())
        .args(["--arch", "i686", "--no-wait"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("UNSUPPORTED DEVICE"));
    assert!(!stdout.contains("Installing"));
    assert!(!dir.path().join("checker.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_fresh_checkout_reports_missing_payload() {
    let dir = workspace("true");

    let output = l4unch3r(dir.path())
        .args(["--arch", "arm64", "--no-wait"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Skipping update check: not a repository"));
    assert!(stdout.contains("❌ Missing: checker.txt"));
    assert!(stdout.contains("Installing pkgA"));
    assert!(stdout.contains("Installing pkgB"));
    assert!(stdout.contains("module not found"));
    assert!(stdout.contains("TOOL FAILED TO START"));
    assert!(dir.path().join("checker.txt").is_file());
}

#[cfg(unix)]
#[test]
fn test_failed_installs_still_reach_launch() {
    let dir = workspace("false");

    let output = l4unch3r(dir.path())
        .args(["--arch", "x86_64", "--no-wait"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Failed to install pkgA"));
    assert!(stdout.contains("Failed to install pkgB"));
    assert!(stdout.contains("Starting payload"));
}

#[test]
fn test_waits_for_acknowledgment() {
    let dir = workspace("true");

    let output = l4unch3r(dir.path())
        .args(["--arch", "aarch64", "--skip-install"])
        .write_stdin("\n")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert!(stdout_of(&output).contains("Press Enter to exit"));
}

#[test]
fn test_report_flag_writes_toml() {
    let dir = workspace("true");
    let report = dir.path().join("report.toml");

    let output = l4unch3r(dir.path())
        .args(["--arch", "i686", "--no-wait", "--report"])
        .arg(&report)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let content = fs::read_to_string(&report).unwrap();
    assert!(content.contains("final_state = \"unsupported\""));
}

#[test]
fn test_invalid_config_is_unexpected_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("l4unch3r.toml"), "[installer\n").unwrap();

    let output = l4unch3r(dir.path()).arg("--no-wait").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_of(&output).contains("Unexpected error"));
}

/// The C library this test binary is linked against, as a real payload.
#[cfg(target_os = "linux")]
fn system_libc() -> Option<PathBuf> {
    let maps = fs::read_to_string("/proc/self/maps").ok()?;
    maps.lines()
        .filter_map(|line| line.split_whitespace().nth(5))
        .find(|path| {
            Path::new(path).file_name().is_some_and(|name| {
                let name = name.to_string_lossy();
                name.starts_with("libc.so") || (name.starts_with("libc-") && name.ends_with(".so"))
            })
        })
        .map(PathBuf::from)
}

/// Scratch dir whose payload is `library`, entered at `symbol`.
#[cfg(target_os = "linux")]
fn payload_workspace(library: &Path, symbol: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("l4unch3r.toml"),
        format!(
            "[artifacts]\npayload = \"{}\"\n\n[payload]\nentry_symbol = \"{symbol}\"\n\n[installer]\nenabled = false\n",
            library.display()
        ),
    )
    .unwrap();
    dir
}

#[cfg(target_os = "linux")]
#[test]
fn test_aborting_payload_is_contained() {
    let Some(libc) = system_libc() else {
        eprintln!("no shared libc mapped, skipping");
        return;
    };
    // abort() ends the payload the same way a panic crossing the library
    // boundary does
    let loader = IsolatedLoader::new(env!("CARGO_BIN_EXE_l4unch3r"));

    let LaunchOutcome::Failed(err) = Launcher::new(&loader, libc, "abort").launch_payload() else {
        panic!("aborting payload should fail");
    };

    assert_eq!(err.kind(), "invocation_failed");
    assert!(err.to_string().contains("signal 6"), "{err}");
}

#[cfg(target_os = "linux")]
#[test]
fn test_payload_host_keeps_failure_kinds() {
    let Some(libc) = system_libc() else {
        return;
    };
    let loader = IsolatedLoader::new(env!("CARGO_BIN_EXE_l4unch3r"));
    let launch = |symbol| Launcher::new(&loader, libc.clone(), symbol).launch_payload();

    assert_eq!(launch("sched_yield"), LaunchOutcome::Completed);

    let LaunchOutcome::Failed(err) = launch("l4unch3r_no_such_symbol") else {
        panic!("missing export should fail");
    };
    assert_eq!(err.kind(), "entry_point_missing");

    let LaunchOutcome::Failed(err) = launch("getpid") else {
        panic!("non-zero status should fail");
    };
    assert_eq!(err.kind(), "invocation_failed");
}

#[cfg(target_os = "linux")]
#[test]
fn test_aborting_payload_reports_failure_and_waits() {
    let Some(libc) = system_libc() else {
        return;
    };
    let dir = payload_workspace(&libc, "abort");

    let output = l4unch3r(dir.path())
        .args(["--arch", "x86_64"])
        .write_stdin("\n")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("TOOL FAILED TO START"));
    assert!(stdout.contains("payload terminated by signal 6"));
    assert!(stdout.contains("Press Enter to exit"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_real_payload_runs_to_completion() {
    let Some(libc) = system_libc() else {
        return;
    };
    let dir = payload_workspace(&libc, "sched_yield");

    let output = l4unch3r(dir.path())
        .args(["--arch", "x86_64", "--no-wait"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn test_interrupt_exits_without_acknowledgment() {
    use std::io::Read;
    use std::process::Stdio;

    let dir = workspace("true");
    let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_l4unch3r"))
        .arg("-C")
        .arg(dir.path())
        .args(["--arch", "i686"])
        .env_remove("L4UNCH3R_NO_WAIT")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let _stdin = child.stdin.take();
    let mut stdout = child.stdout.take().unwrap();

    let mut seen = Vec::new();
    let mut chunk = [0u8; 512];
    while !String::from_utf8_lossy(&seen).contains("Press Enter to exit") {
        let n = stdout.read(&mut chunk).unwrap();
        assert!(n > 0, "exited before prompting: {}", String::from_utf8_lossy(&seen));
        seen.extend_from_slice(&chunk[..n]);
    }

    let pid = libc::pid_t::try_from(child.id()).unwrap();
    assert_eq!(unsafe { libc::kill(pid, libc::SIGINT) }, 0);

    let status = child.wait().unwrap();
    stdout.read_to_end(&mut seen).unwrap();

    assert_eq!(status.code(), Some(130));
    assert!(String::from_utf8_lossy(&seen).contains("⚠ Interrupted by user"));
}
