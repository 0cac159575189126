//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs.

use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-p", "alive-cli", "--quiet", "--"])
        .args(args)
        .env("ALIVE_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_prompt_day_one() {
    let (code, stdout, _) = run_cli(&["prompt", "--day", "1"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("JSON output");
    assert_eq!(parsed["dayIndex"], 1);
    assert!(parsed["title"].is_string());
}

#[test]
fn test_prompt_out_of_range_fails() {
    let (code, _, stderr) = run_cli(&["prompt", "--day", "29"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("dayIndex"));
}

#[test]
fn test_invalid_address_fails() {
    let (code, _, stderr) = run_cli(&["progress", "--address", "0x123"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("invalid") || stderr.contains("address"));
}
