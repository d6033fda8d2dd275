//! Materialization of built-in packs onto the filesystem.
//!
//! Built-in packs are embedded in the binary and written to a temporary
//! directory on demand, so the same loader and discovery code paths serve
//! them; nothing downstream knows a pack came from an embedded resource.

use std::path::PathBuf;

use tracing::{debug, warn};

/// Resources of the `acode-standard` built-in pack, as `(relative path,
/// content)` pairs.
const ACODE_STANDARD: &[(&str, &str)] = &[
    ("manifest.yml", include_str!("../../packs/acode-standard/manifest.yml")),
    (
        "system/core.md",
        include_str!("../../packs/acode-standard/system/core.md"),
    ),
    (
        "roles/coder.md",
        include_str!("../../packs/acode-standard/roles/coder.md"),
    ),
    (
        "roles/reviewer.md",
        include_str!("../../packs/acode-standard/roles/reviewer.md"),
    ),
    (
        "languages/rust.md",
        include_str!("../../packs/acode-standard/languages/rust.md"),
    ),
    (
        "frameworks/axum.md",
        include_str!("../../packs/acode-standard/frameworks/axum.md"),
    ),
];

const BUILT_IN_PACKS: &[(&str, &[(&str, &str)])] = &[("acode-standard", ACODE_STANDARD)];

/// Turns a pack source into a directory the loader can read.
pub trait PackMaterializer {
    /// Write the packs to disk and return the directory containing them,
    /// suitable as a discovery root.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when writing fails.
    fn materialize(&self) -> std::io::Result<PathBuf>;

    /// Remove materialized files. Best-effort: never fails.
    fn cleanup(&self);
}

/// Materializes the embedded built-in packs under a per-process temp
/// directory.
#[derive(Debug)]
pub struct EmbeddedPackProvider {
    root: PathBuf,
}

impl Default for EmbeddedPackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedPackProvider {
    /// Create a provider rooted under the system temp directory.
    pub fn new() -> Self {
        Self {
            root: std::env::temp_dir().join(format!("acode-packs-{}", std::process::id())),
        }
    }

    /// Create a provider rooted at a specific directory (for tests).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// IDs of the packs this provider ships.
    pub fn pack_ids(&self) -> Vec<&'static str> {
        BUILT_IN_PACKS.iter().map(|(id, _)| *id).collect()
    }
}

impl PackMaterializer for EmbeddedPackProvider {
    fn materialize(&self) -> std::io::Result<PathBuf> {
        for &(pack_id, resources) in BUILT_IN_PACKS {
            let pack_dir = self.root.join(pack_id);
            for &(relative, content) in resources {
                let full = pack_dir.join(relative);
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&full, content)?;
            }
            debug!(pack_id, dir = %pack_dir.display(), "materialized built-in pack");
        }
        Ok(self.root.clone())
    }

    fn cleanup(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.root.display(), error = %e, "failed to clean up materialized packs");
            }
        }
    }
}

impl Drop for EmbeddedPackProvider {
    fn drop(&mut self) {
        self.cleanup();
    }
}
