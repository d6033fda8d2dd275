//! End-to-end composition: packs written to disk, loaded, merged with
//! override splicing, and variable-substituted.

use std::path::Path;

use acode::pack::types::CompositionContext;
use acode::pack::{ContentHasher, PackLoader, PackSource, PromptComposer};

const MANIFEST: &str = r#"
format_version: "1.0"
id: e2e-pack
version: 1.2.0
name: End To End
description: Pack for end-to-end composition tests.
created_at: "2025-03-01T00:00:00Z"
components:
  - path: system/core.md
    type: system
  - path: roles/coder.md
    type: role
    metadata:
      role: coder
  - path: roles/reviewer.md
    type: role
    metadata:
      role: reviewer
  - path: languages/rust.md
    type: language
    metadata:
      language: rust
"#;

const SYSTEM: &str = "# Identity\n\nYou work on {{workspace_name}}.\n\n# Code Quality\n\nWrite tests for everything.\n\n# Safety\n\nNever delete user data.";

const CODER: &str = "# Role: Coder\n\nImplement features.";

const REVIEWER: &str = "# Role: Reviewer\n\nReview changes.\n\n# OVERRIDE: Code Quality\n\nOnly flag violations of written conventions.";

const RUST: &str = "# Language: Rust\n\nUse explicit Result returns.";

fn write_e2e_pack(root: &Path) {
    std::fs::create_dir_all(root.join("system")).expect("system dir");
    std::fs::create_dir_all(root.join("roles")).expect("roles dir");
    std::fs::create_dir_all(root.join("languages")).expect("languages dir");
    std::fs::write(root.join("manifest.yml"), MANIFEST).expect("manifest");
    std::fs::write(root.join("system/core.md"), SYSTEM).expect("system");
    std::fs::write(root.join("roles/coder.md"), CODER).expect("coder");
    std::fs::write(root.join("roles/reviewer.md"), REVIEWER).expect("reviewer");
    std::fs::write(root.join("languages/rust.md"), RUST).expect("rust");
}

#[test]
fn composes_system_only_for_empty_context() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_e2e_pack(temp.path());
    let pack = PackLoader::new()
        .load_pack(temp.path(), PackSource::User)
        .expect("should load");

    let prompt = PromptComposer::new()
        .compose(&pack, &CompositionContext::new())
        .expect("should compose");

    assert!(prompt.contains("# Identity"));
    assert!(prompt.contains("Write tests for everything."));
    assert!(!prompt.contains("Implement features."));
    assert!(!prompt.contains("Use explicit Result returns."));
}

#[test]
fn role_and_language_selectors_include_matching_components() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_e2e_pack(temp.path());
    let pack = PackLoader::new()
        .load_pack(temp.path(), PackSource::User)
        .expect("should load");

    let context = CompositionContext::new()
        .with_role("coder")
        .with_language("rust")
        .with_variable("workspace_name", "acme");
    let prompt = PromptComposer::new()
        .compose(&pack, &context)
        .expect("should compose");

    assert!(prompt.contains("You work on acme."));
    assert!(prompt.contains("Implement features."));
    assert!(prompt.contains("Use explicit Result returns."));
    // The reviewer role was not selected.
    assert!(!prompt.contains("Review changes."));
    // System precedes role precedes language.
    let identity = prompt.find("# Identity").expect("identity present");
    let coder = prompt.find("Implement features.").expect("coder present");
    let rust = prompt.find("Use explicit Result").expect("rust present");
    assert!(identity < coder && coder < rust);
}

#[test]
fn reviewer_override_replaces_system_section() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_e2e_pack(temp.path());
    let pack = PackLoader::new()
        .load_pack(temp.path(), PackSource::User)
        .expect("should load");

    let context = CompositionContext::new().with_role("reviewer");
    let prompt = PromptComposer::new()
        .compose(&pack, &context)
        .expect("should compose");

    // The override body lands under the system heading; the original body
    // and the OVERRIDE marker itself are both gone.
    assert!(prompt.contains("# Code Quality"));
    assert!(prompt.contains("Only flag violations of written conventions."));
    assert!(!prompt.contains("Write tests for everything."));
    assert!(!prompt.contains("OVERRIDE"));
    assert!(prompt.contains("Review changes."));
}

#[test]
fn hash_mismatch_still_loads() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_e2e_pack(temp.path());
    let with_hash = MANIFEST.replace(
        "description: Pack for end-to-end composition tests.",
        &format!("description: x\ncontent_hash: {}", "0".repeat(64)),
    );
    std::fs::write(temp.path().join("manifest.yml"), with_hash).expect("manifest");

    // Mismatch is reported as a warning, not a load failure.
    let pack = PackLoader::new()
        .load_pack(temp.path(), PackSource::User)
        .expect("should still load");
    assert_eq!(pack.components.len(), 4);
}

#[test]
fn recorded_hash_matches_computed_hash() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_e2e_pack(temp.path());
    let pack = PackLoader::new()
        .load_pack(temp.path(), PackSource::User)
        .expect("should load");

    let computed = ContentHasher::new().compute(pack.hash_pairs());
    let with_hash = MANIFEST.replace(
        "description: Pack for end-to-end composition tests.",
        &format!("description: x\ncontent_hash: {computed}"),
    );
    std::fs::write(temp.path().join("manifest.yml"), with_hash).expect("manifest");

    let reloaded = PackLoader::new()
        .load_pack(temp.path(), PackSource::User)
        .expect("should load");
    let recorded = reloaded.manifest.content_hash.expect("hash recorded");
    assert!(computed.matches(Some(&recorded)));
}

#[test]
fn unresolved_variables_become_empty() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    write_e2e_pack(temp.path());
    let pack = PackLoader::new()
        .load_pack(temp.path(), PackSource::User)
        .expect("should load");

    let prompt = PromptComposer::new()
        .compose(&pack, &CompositionContext::new())
        .expect("should compose");

    assert!(prompt.contains("You work on ."));
    assert!(!prompt.contains("{{workspace_name}}"));
}
