use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

/// Absolute path of a file under `fixtures/`.
pub fn fixture(rel: &str) -> String {
    workspace_root()
        .join("fixtures")
        .join(rel)
        .to_str()
        .unwrap()
        .to_string()
}

/// rollscore with `dir` as the working directory, so default outputs,
/// `.rollscore/config.json` and the run ledger land in a scratch dir.
pub fn rollscore_in(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rollscore"));
    cmd.current_dir(dir);
    cmd
}

pub fn run(dir: &Path, args: &[&str]) -> Output {
    rollscore_in(dir)
        .args(args)
        .output()
        .expect("failed to run rollscore")
}

/// Run rollscore, assert exit code, return parsed JSON stdout.
pub fn rollscore_json(dir: &Path, args: &[&str], expected_exit: i32) -> Value {
    let out = run(dir, args);
    let code = out.status.code().unwrap_or(-1);
    assert_eq!(
        code,
        expected_exit,
        "exit mismatch for: rollscore {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "invalid JSON from: rollscore {}\n{e}\nstdout: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stdout)
        )
    })
}

/// Run rollscore, return stdout as string (exit 0 expected).
#[allow(dead_code)]
pub fn rollscore_stdout(dir: &Path, args: &[&str]) -> String {
    let out = run(dir, args);
    assert!(
        out.status.success(),
        "rollscore {} failed with exit {}\nstderr: {}",
        args.join(" "),
        out.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).to_string()
}

/// Run rollscore, assert it fails, return stderr.
#[allow(dead_code)]
pub fn rollscore_err(dir: &Path, args: &[&str]) -> String {
    let out = run(dir, args);
    assert!(
        !out.status.success(),
        "rollscore {} unexpectedly succeeded\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout)
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}
