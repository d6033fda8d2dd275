//! Loading a pack directory into a [`PromptPack`].
//!
//! Every component path is normalized and validated, the resolved file is
//! re-checked to be inside the pack root, symlinks are refused, and the
//! recorded content hash is verified. A hash mismatch is a warning, not an
//! error, so a locally edited pack still loads before its hash is
//! regenerated.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::pack::hash::ContentHasher;
use crate::pack::manifest::{ManifestError, ManifestParser, MANIFEST_FILE_NAME};
use crate::pack::path_safety::{self, PathTraversalError};
use crate::pack::types::{LoadedComponent, PackSource, PromptPack};

/// Loading a pack directory failed. Aborts that pack only; discovery of
/// sibling packs continues.
#[derive(Debug, Error)]
pub enum PackLoadError {
    /// No `manifest.yml` at the pack root.
    #[error("ACODE-PKL-001: manifest.yml not found in {0}")]
    ManifestMissing(String),
    /// The manifest was present but unparsable or invalid.
    #[error("ACODE-PKL-002: {0}")]
    Manifest(#[from] ManifestError),
    /// A declared component file does not exist.
    #[error("ACODE-PKL-003: component file not found: {0}")]
    ComponentMissing(String),
    /// A declared component file is a symlink.
    #[error("ACODE-PKL-004: symlink rejected: {0}")]
    SymlinkRejected(String),
    /// A component path failed safety validation or escaped the pack root.
    #[error(transparent)]
    UnsafePath(#[from] PathTraversalError),
    /// Reading a component file failed.
    #[error("failed to read component {path}: {source}")]
    Io {
        /// The component path that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Loads prompt packs from pack directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackLoader {
    parser: ManifestParser,
    hasher: ContentHasher,
}

impl PackLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self {
            parser: ManifestParser::new(),
            hasher: ContentHasher::new(),
        }
    }

    /// Load the pack rooted at `pack_dir`.
    ///
    /// # Errors
    ///
    /// See [`PackLoadError`]. A content-hash mismatch does not fail the
    /// load; it is logged as a warning.
    pub fn load_pack(
        &self,
        pack_dir: &Path,
        source: PackSource,
    ) -> Result<PromptPack, PackLoadError> {
        let manifest_path = pack_dir.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(PackLoadError::ManifestMissing(
                pack_dir.display().to_string(),
            ));
        }

        let manifest = self.parser.parse_file(&manifest_path, source)?;

        let mut components = Vec::with_capacity(manifest.components.len());
        for declared in &manifest.components {
            let relative = path_safety::normalize_and_validate(&declared.path)?;
            let full_path = pack_dir.join(&relative);
            path_safety::ensure_within_root(pack_dir, &full_path)?;

            let metadata = std::fs::symlink_metadata(&full_path)
                .map_err(|_| PackLoadError::ComponentMissing(relative.clone()))?;
            if metadata.file_type().is_symlink() {
                warn!(path = %relative, "symlink rejected while loading pack");
                return Err(PackLoadError::SymlinkRejected(relative));
            }

            let content =
                std::fs::read_to_string(&full_path).map_err(|e| PackLoadError::Io {
                    path: relative.clone(),
                    source: e,
                })?;

            components.push(LoadedComponent {
                path: relative,
                component_type: declared.component_type,
                content,
                metadata: declared.metadata.clone(),
            });
        }

        let pack = PromptPack {
            manifest,
            components,
        };

        self.verify_hash(&pack);

        info!(
            pack_id = %pack.id(),
            version = %pack.manifest.version,
            components = pack.components.len(),
            "loaded prompt pack"
        );

        Ok(pack)
    }

    /// Recompute the content hash and warn on mismatch (non-fatal, to
    /// support iterative local editing).
    fn verify_hash(&self, pack: &PromptPack) {
        let Some(expected) = &pack.manifest.content_hash else {
            return;
        };

        let actual = self.hasher.compute(pack.hash_pairs());
        if !actual.matches(Some(expected)) {
            warn!(
                pack_id = %pack.id(),
                expected = %expected,
                actual = %actual,
                "content hash mismatch; pack loads anyway"
            );
        }
    }
}
