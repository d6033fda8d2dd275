//! Path normalization and traversal protection for pack component paths.
//!
//! Every path declared in a manifest passes through
//! [`normalize_and_validate`] before it is ever used to address the
//! filesystem. The loader additionally re-checks that the resolved file
//! stays inside the pack root via [`ensure_within_root`].

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// A component path escaped or attempted to escape the pack directory.
///
/// This error is always fatal to the operation that raised it. It must
/// never be downgraded to a warning.
#[derive(Debug, Clone, Error)]
#[error("unsafe component path '{path}': {reason}")]
pub struct PathTraversalError {
    /// The offending path as it appeared in the manifest.
    pub path: String,
    /// Why the path was rejected.
    pub reason: String,
}

impl PathTraversalError {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convert all backslashes to forward slashes.
///
/// Component paths are declared with forward slashes regardless of host
/// platform; this makes Windows-style declarations equivalent.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Reject paths that could escape the pack directory.
///
/// Rejected forms: embedded NUL bytes, any `..` segment (leading, embedded,
/// or the whole path), absolute paths (leading `/`) and drive-letter paths
/// (`X:/` or `X:\`).
pub fn validate(path: &str) -> Result<(), PathTraversalError> {
    if path.contains('\0') {
        return Err(PathTraversalError::new(path, "contains NUL byte"));
    }

    let normalized = normalize(path);

    if normalized.starts_with('/') {
        return Err(PathTraversalError::new(path, "absolute paths are not allowed"));
    }

    if is_drive_letter(&normalized) {
        return Err(PathTraversalError::new(
            path,
            "drive-letter paths are not allowed",
        ));
    }

    if normalized.split('/').any(|segment| segment == "..") {
        return Err(PathTraversalError::new(
            path,
            "parent directory traversal is not allowed",
        ));
    }

    Ok(())
}

/// Normalize separators, then validate. Returns the normalized path.
///
/// This is the only form of a component path the loader ever joins onto
/// the pack root.
pub fn normalize_and_validate(path: &str) -> Result<String, PathTraversalError> {
    validate(path)?;
    Ok(normalize(path))
}

/// Re-check that `candidate` is lexically contained in `root`.
///
/// Defense in depth: even after [`validate`], the joined path is compared
/// component-by-component against the pack root so a normalization bypass
/// cannot read outside the pack.
pub fn ensure_within_root(root: &Path, candidate: &Path) -> Result<(), PathTraversalError> {
    let root_clean = clean_components(root);
    let candidate_clean = clean_components(candidate);

    if candidate_clean.starts_with(&root_clean) {
        Ok(())
    } else {
        Err(PathTraversalError::new(
            &candidate.to_string_lossy(),
            format!("resolves outside pack root {}", root.display()),
        ))
    }
}

/// Drop `.` segments so prefix comparison is not fooled by `a/./b`.
fn clean_components(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn is_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
