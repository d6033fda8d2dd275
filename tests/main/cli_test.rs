//! CLI contract tests, run against the real binary with an isolated
//! environment so user config and packs never leak in.

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;

/// A command with config and pack discovery pinned to `home`.
fn acode(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("acode").expect("binary builds");
    cmd.env("ACODE_CONFIG_PATH", home.join("config.toml"))
        .env("ACODE_PACKS_DIR", home.join("packs"))
        .env_remove("ACODE_PROMPT_PACK")
        .env_remove("RUST_LOG");
    cmd
}

fn write_user_pack(home: &Path, id: &str, system_content: &str) {
    let pack_dir = home.join("packs").join(id);
    std::fs::create_dir_all(pack_dir.join("system")).expect("pack dirs");
    let manifest = format!(
        r#"
format_version: "1.0"
id: {id}
version: 0.1.0
name: User Pack
description: A user pack.
created_at: "2025-02-01T00:00:00Z"
components:
  - path: system/core.md
    type: system
"#
    );
    std::fs::write(pack_dir.join("manifest.yml"), manifest).expect("manifest");
    std::fs::write(pack_dir.join("system/core.md"), system_content).expect("component");
}

#[test]
fn list_includes_built_in_pack() {
    let home = tempfile::TempDir::new().expect("temp dir");
    let output = acode(home.path()).arg("list").output().expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("acode-standard"), "{stdout}");
}

#[test]
fn list_json_is_parseable() {
    let home = tempfile::TempDir::new().expect("temp dir");
    write_user_pack(home.path(), "extra-pack", "# Extra");

    let output = acode(home.path())
        .args(["list", "--json"])
        .output()
        .expect("runs");
    assert!(output.status.success());

    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(&output.stdout).expect("valid JSON");
    let ids: Vec<&str> = entries
        .iter()
        .filter_map(|e| e.get("id").and_then(|v| v.as_str()))
        .collect();
    assert!(ids.contains(&"acode-standard"));
    assert!(ids.contains(&"extra-pack"));
}

#[test]
fn show_prints_manifest_fields() {
    let home = tempfile::TempDir::new().expect("temp dir");
    let output = acode(home.path())
        .args(["show", "acode-standard"])
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("id:          acode-standard"));
    assert!(stdout.contains("system/core.md"));
}

#[test]
fn show_unknown_pack_fails() {
    let home = tempfile::TempDir::new().expect("temp dir");
    let output = acode(home.path())
        .args(["show", "no-such-pack"])
        .output()
        .expect("runs");
    assert!(!output.status.success());
}

#[test]
fn validate_built_in_pack_passes_with_hash_warning() {
    let home = tempfile::TempDir::new().expect("temp dir");
    let output = acode(home.path())
        .args(["validate", "acode-standard"])
        .output()
        .expect("runs");
    // No recorded content hash is a warning, never a failure.
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("warning: [CONTENT_HASH_MISSING]"), "{stdout}");
    assert!(!stdout.contains("error:"), "{stdout}");
}

#[test]
fn validate_pack_with_recorded_hash_is_clean() {
    let home = tempfile::TempDir::new().expect("temp dir");
    write_user_pack(home.path(), "hashed-pack", "# Hashed");
    let pack_dir = home.path().join("packs/hashed-pack");

    let hash_output = acode(home.path())
        .arg("hash")
        .arg(&pack_dir)
        .output()
        .expect("runs");
    assert!(hash_output.status.success());
    let digest = String::from_utf8_lossy(&hash_output.stdout).trim().to_string();

    let manifest_path = pack_dir.join("manifest.yml");
    let manifest = std::fs::read_to_string(&manifest_path).expect("read manifest");
    std::fs::write(
        &manifest_path,
        manifest.replace(
            "description: A user pack.",
            &format!("description: A user pack.\ncontent_hash: {digest}"),
        ),
    )
    .expect("write manifest");

    let output = acode(home.path())
        .args(["validate", "hashed-pack"])
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hashed-pack: valid"), "{stdout}");
}

#[test]
fn validate_bad_pack_exits_nonzero() {
    let home = tempfile::TempDir::new().expect("temp dir");
    write_user_pack(home.path(), "bad-pack", "Hello {{bad name}}");

    let output = acode(home.path())
        .args(["validate", "bad-pack", "--json"])
        .output()
        .expect("runs");
    assert!(!output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(report["valid"], serde_json::json!(false));
    assert!(report["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .any(|e| e["code"] == "INVALID_TEMPLATE_VARIABLE"));
}

#[test]
fn compose_substitutes_variables() {
    let home = tempfile::TempDir::new().expect("temp dir");
    let output = acode(home.path())
        .args([
            "compose",
            "acode-standard",
            "--role",
            "coder",
            "--var",
            "workspace_name=demo-project",
        ])
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("demo-project"), "{stdout}");
    assert!(stdout.contains("Role: Coder"), "{stdout}");
    assert!(!stdout.contains("{{workspace_name}}"), "{stdout}");
}

#[test]
fn compose_defaults_to_active_pack() {
    let home = tempfile::TempDir::new().expect("temp dir");
    write_user_pack(home.path(), "my-pack", "# My Pack System");

    let output = acode(home.path())
        .env("ACODE_PROMPT_PACK", "my-pack")
        .arg("compose")
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# My Pack System"), "{stdout}");
}

#[test]
fn compose_rejects_malformed_var() {
    let home = tempfile::TempDir::new().expect("temp dir");
    let output = acode(home.path())
        .args(["compose", "acode-standard", "--var", "no-equals-sign"])
        .output()
        .expect("runs");
    assert!(!output.status.success());
}

#[test]
fn user_pack_overrides_built_in_by_id() {
    let home = tempfile::TempDir::new().expect("temp dir");
    write_user_pack(home.path(), "acode-standard", "# Overridden Standard");

    let output = acode(home.path())
        .args(["compose", "acode-standard"])
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Overridden Standard"), "{stdout}");
    assert!(!stdout.contains("Workflow"), "{stdout}");
}

#[test]
fn hash_prints_digest_and_verifies() {
    let home = tempfile::TempDir::new().expect("temp dir");
    write_user_pack(home.path(), "hash-pack", "# Hash Me");
    let pack_dir = home.path().join("packs/hash-pack");

    let output = acode(home.path())
        .arg("hash")
        .arg(&pack_dir)
        .output()
        .expect("runs");
    assert!(output.status.success());
    let digest = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(digest.len(), 64);

    // Record the digest and verify it round-trips.
    let manifest_path = pack_dir.join("manifest.yml");
    let manifest = std::fs::read_to_string(&manifest_path).expect("read manifest");
    std::fs::write(
        &manifest_path,
        manifest.replace(
            "description: A user pack.",
            &format!("description: A user pack.\ncontent_hash: {digest}"),
        ),
    )
    .expect("write manifest");

    let verify = acode(home.path())
        .args(["hash", "--verify"])
        .arg(&pack_dir)
        .output()
        .expect("runs");
    assert!(verify.status.success());
    let stdout = String::from_utf8_lossy(&verify.stdout);
    assert!(stdout.contains("hash matches manifest"), "{stdout}");
}

#[test]
fn hash_verify_fails_on_mismatch() {
    let home = tempfile::TempDir::new().expect("temp dir");
    write_user_pack(home.path(), "hash-pack", "# Hash Me");
    let pack_dir = home.path().join("packs/hash-pack");

    let manifest_path = pack_dir.join("manifest.yml");
    let manifest = std::fs::read_to_string(&manifest_path).expect("read manifest");
    std::fs::write(
        &manifest_path,
        manifest.replace(
            "description: A user pack.",
            &format!("description: A user pack.\ncontent_hash: {}", "f".repeat(64)),
        ),
    )
    .expect("write manifest");

    let output = acode(home.path())
        .args(["hash", "--verify"])
        .arg(&pack_dir)
        .output()
        .expect("runs");
    assert!(!output.status.success());
}
