//! Integration tests for the `varcall` binary.

use std::process::{Command, Output};

fn varcall(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_varcall"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("VARCALL_LOG")
        .output()
        .expect("failed to spawn varcall")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ────────────────────────────────────────────────────────────────────────────
// layout
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_layout_json() {
    let output = varcall(&["layout", "--json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["cached_stub_offset"], 0);
    assert_eq!(report["calli_saves_floats"], true);
    assert!(report["transition_block_size"].as_u64().unwrap() % 16 == 0);
}

#[test]
fn test_layout_text() {
    let output = varcall(&["layout"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("hidden argument"));
    assert!(text.contains("TransitionBlock"));
}

// ────────────────────────────────────────────────────────────────────────────
// codec
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_codec_encode_native() {
    let output = varcall(&["codec", "encode", "--native", "0x4000"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("0x8001"), "{}", text);
    assert!(text.contains("native@0x4000"));
}

#[test]
fn test_codec_encode_misaligned_method_fails() {
    let output = varcall(&["codec", "encode", "--method", "0x4001"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not 2-byte aligned"), "{}", stderr);
}

#[test]
fn test_codec_encode_requires_target() {
    let output = varcall(&["codec", "encode"]);
    assert!(!output.status.success());
}

#[test]
fn test_codec_decode() {
    let output = varcall(&["codec", "decode", "0x8001"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("native@0x4000"));

    let output = varcall(&["codec", "decode", "0x8001", "--vararg"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("method@0x8001"));
}

// ────────────────────────────────────────────────────────────────────────────
// selftest
// ────────────────────────────────────────────────────────────────────────────

#[cfg(all(unix, any(target_arch = "x86_64", target_arch = "aarch64")))]
#[test]
fn test_selftest_passes() {
    let output = varcall(&["selftest", "--threads", "4", "--iterations", "100"]);
    let text = stdout(&output);
    assert!(output.status.success(), "{}", text);
    assert!(text.contains("PASS"));
    assert!(!text.contains("FAIL"));
}

#[cfg(all(unix, any(target_arch = "x86_64", target_arch = "aarch64")))]
#[test]
fn test_selftest_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("varcall.toml");
    std::fs::write(&path, "record_stats = false\n").unwrap();

    let output = varcall(&["selftest", "--threads", "2", "--config", path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("\"generations\": 0"));
}

#[test]
fn test_selftest_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("varcall.toml");
    std::fs::write(&path, "unknown_key = 1\n").unwrap();

    let output = varcall(&["selftest", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load"));
}
