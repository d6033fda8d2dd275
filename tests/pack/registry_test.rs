//! Tests for `src/pack/registry.rs` — discovery across roots, lazy loading,
//! and override precedence between built-in and user packs.

use std::path::Path;

use acode::pack::registry::{ActivePack, DiscoveryRoot, PackRegistry, DEFAULT_PACK_ID};
use acode::pack::{PackSource, RegistryError};

/// Write a minimal pack directory: a manifest plus one system component.
fn write_pack(root: &Path, id: &str, name: &str, system_content: &str) {
    let pack_dir = root.join(id);
    std::fs::create_dir_all(pack_dir.join("system")).expect("pack dirs");

    let manifest = format!(
        r#"
format_version: "1.0"
id: {id}
version: 1.0.0
name: {name}
description: Test pack.
created_at: "2025-01-15T00:00:00Z"
components:
  - path: system/core.md
    type: system
"#
    );
    std::fs::write(pack_dir.join("manifest.yml"), manifest).expect("manifest");
    std::fs::write(pack_dir.join("system/core.md"), system_content).expect("component");
}

fn registry_over(roots: Vec<DiscoveryRoot>) -> PackRegistry {
    PackRegistry::new(roots, ActivePack::with_resolver(None, |_| None))
}

#[test]
fn lists_packs_from_all_roots_sorted_by_id() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let built_in = temp.path().join("builtin");
    let user = temp.path().join("user");
    write_pack(&built_in, "zz-pack", "ZZ", "# Z");
    write_pack(&user, "aa-pack", "AA", "# A");

    let registry = registry_over(vec![
        DiscoveryRoot::built_in(&built_in),
        DiscoveryRoot::user(&user),
    ]);

    let ids: Vec<String> = registry.list().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["aa-pack".to_string(), "zz-pack".to_string()]);
}

#[test]
fn user_pack_overrides_built_in_with_same_id() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let built_in = temp.path().join("builtin");
    let user = temp.path().join("user");
    write_pack(&built_in, "shared", "Built-in Shared", "# Built-in");
    write_pack(&user, "shared", "User Shared", "# User");

    let registry = registry_over(vec![
        DiscoveryRoot::built_in(&built_in),
        DiscoveryRoot::user(&user),
    ]);

    let manifests = registry.list();
    assert_eq!(manifests.len(), 1);
    assert_eq!(manifests[0].name, "User Shared");
    assert_eq!(manifests[0].source, PackSource::User);

    let pack = registry.get("shared").expect("should load");
    assert!(pack.components[0].content.contains("# User"));
}

#[test]
fn get_is_case_insensitive() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_pack(temp.path(), "my-pack", "My Pack", "# Hi");

    let registry = registry_over(vec![DiscoveryRoot::user(temp.path())]);
    let pack = registry.get("MY-PACK").expect("should load");
    assert_eq!(pack.id(), "my-pack");
}

#[test]
fn unknown_pack_is_not_found() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_pack(temp.path(), "my-pack", "My Pack", "# Hi");

    let registry = registry_over(vec![DiscoveryRoot::user(temp.path())]);
    let err = registry.get("missing").expect_err("should fail");
    assert!(matches!(err, RegistryError::NotFound(id) if id == "missing"));
}

#[test]
fn invalid_pack_reports_validation_errors() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_pack(temp.path(), "bad-pack", "Bad Pack", "Hello {{bad name}}");

    let registry = registry_over(vec![DiscoveryRoot::user(temp.path())]);
    let err = registry.get("bad-pack").expect_err("should fail");
    match err {
        RegistryError::Invalid { id, report } => {
            assert_eq!(id, "bad-pack");
            assert!(report.has_code("INVALID_TEMPLATE_VARIABLE"));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn broken_manifest_is_skipped_not_fatal() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_pack(temp.path(), "good-pack", "Good", "# Hi");

    let broken = temp.path().join("broken-pack");
    std::fs::create_dir_all(&broken).expect("dir");
    std::fs::write(broken.join("manifest.yml"), "{{{not yaml").expect("manifest");

    let registry = registry_over(vec![DiscoveryRoot::user(temp.path())]);
    let ids: Vec<String> = registry.list().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["good-pack".to_string()]);
}

#[test]
fn unreadable_root_is_skipped() {
    let registry = registry_over(vec![DiscoveryRoot::user("/nonexistent/acode-packs")]);
    assert!(registry.list().is_empty());
}

#[test]
fn refresh_picks_up_new_packs() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_pack(temp.path(), "first-pack", "First", "# One");

    let registry = registry_over(vec![DiscoveryRoot::user(temp.path())]);
    assert_eq!(registry.list().len(), 1);

    write_pack(temp.path(), "second-pack", "Second", "# Two");
    registry.refresh();
    assert_eq!(registry.list().len(), 2);
}

#[test]
fn refresh_drops_cached_packs() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_pack(temp.path(), "my-pack", "My Pack", "# Before");

    let registry = registry_over(vec![DiscoveryRoot::user(temp.path())]);
    let before = registry.get("my-pack").expect("should load");
    assert!(before.components[0].content.contains("# Before"));

    std::fs::write(temp.path().join("my-pack/system/core.md"), "# After").expect("rewrite");
    registry.refresh();

    let after = registry.get("my-pack").expect("should reload");
    assert!(after.components[0].content.contains("# After"));
}

#[test]
fn active_pack_precedence_env_config_default() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_pack(temp.path(), "env-pack", "Env", "# E");
    write_pack(temp.path(), "config-pack", "Config", "# C");

    let env_registry = PackRegistry::new(
        vec![DiscoveryRoot::user(temp.path())],
        ActivePack::with_resolver(Some("config-pack".to_string()), |_| {
            Some("env-pack".to_string())
        }),
    );
    assert_eq!(env_registry.active_pack_id(), "env-pack");
    assert_eq!(
        env_registry.active_pack().expect("should load").id(),
        "env-pack"
    );

    let config_registry = PackRegistry::new(
        vec![DiscoveryRoot::user(temp.path())],
        ActivePack::with_resolver(Some("config-pack".to_string()), |_| None),
    );
    assert_eq!(config_registry.active_pack_id(), "config-pack");

    let default_registry = registry_over(vec![DiscoveryRoot::user(temp.path())]);
    assert_eq!(default_registry.active_pack_id(), DEFAULT_PACK_ID);
}
