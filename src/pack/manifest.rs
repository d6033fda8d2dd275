//! `manifest.yml` parsing into validated [`PackManifest`] values.
//!
//! Parsing is fail-fast: the first violated rule wins and carries a stable
//! `ACODE-PKL-00x` error code. Soft, aggregated checks live in the
//! validator instead; the two styles are never mixed in one operation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::pack::hash::ContentHash;
use crate::pack::path_safety::{self, PathTraversalError};
use crate::pack::types::{is_valid_pack_id, ComponentType, PackComponent, PackManifest, PackSource};
use crate::pack::version::PackVersion;

/// Manifest file name expected at every pack root.
pub const MANIFEST_FILE_NAME: &str = "manifest.yml";

/// A manifest could not be parsed into a valid [`PackManifest`].
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A structural or field-level rule was violated.
    #[error("{code}: {message}")]
    Parse {
        /// Stable error code (`ACODE-PKL-00x`).
        code: &'static str,
        /// Human-readable description of the violated rule.
        message: String,
    },
    /// A declared component path failed path-safety validation.
    #[error(transparent)]
    UnsafePath(#[from] PathTraversalError),
}

impl ManifestError {
    fn parse(code: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
        }
    }
}

// Raw deserialization targets. All fields land as strings and are
// validated in the mapping step so every failure gets a stable code.
#[derive(Debug, Deserialize)]
struct ManifestDoc {
    format_version: Option<String>,
    id: Option<String>,
    version: Option<String>,
    name: Option<String>,
    description: Option<String>,
    content_hash: Option<String>,
    created_at: Option<String>,
    components: Option<Vec<ComponentDoc>>,
}

#[derive(Debug, Deserialize)]
struct ComponentDoc {
    path: Option<String>,
    #[serde(rename = "type")]
    component_type: Option<String>,
    metadata: Option<HashMap<String, String>>,
    description: Option<String>,
}

/// Parses `manifest.yml` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestParser;

impl ManifestParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse YAML content into a manifest.
    ///
    /// # Errors
    ///
    /// Fails fast with the first violated rule: unparsable YAML
    /// (`ACODE-PKL-001`), missing required fields (`ACODE-PKL-002`),
    /// unsupported format version (`ACODE-PKL-003`), invalid pack ID
    /// (`ACODE-PKL-004`), invalid semver (`ACODE-PKL-005`), or an unsafe
    /// component path.
    pub fn parse(
        &self,
        yaml: &str,
        pack_path: &Path,
        source: PackSource,
    ) -> Result<PackManifest, ManifestError> {
        let doc: ManifestDoc = serde_yaml::from_str(yaml).map_err(|e| {
            ManifestError::parse("ACODE-PKL-001", format!("failed to parse manifest YAML: {e}"))
        })?;

        Self::map_manifest(doc, pack_path, source)
    }

    /// Parse a manifest file on disk; the pack path is the file's directory.
    ///
    /// # Errors
    ///
    /// `ACODE-PKL-006` when the file does not exist, otherwise as
    /// [`ManifestParser::parse`].
    pub fn parse_file(
        &self,
        manifest_path: &Path,
        source: PackSource,
    ) -> Result<PackManifest, ManifestError> {
        let yaml = std::fs::read_to_string(manifest_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ManifestError::parse(
                    "ACODE-PKL-006",
                    format!("manifest file not found: {}", manifest_path.display()),
                )
            } else {
                ManifestError::parse(
                    "ACODE-PKL-001",
                    format!("failed to read {}: {e}", manifest_path.display()),
                )
            }
        })?;

        let pack_path = manifest_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ManifestError::parse(
                "ACODE-PKL-002",
                format!(
                    "could not determine pack directory from {}",
                    manifest_path.display()
                ),
            )
        })?;

        self.parse(&yaml, &pack_path, source)
    }

    fn map_manifest(
        doc: ManifestDoc,
        pack_path: &Path,
        source: PackSource,
    ) -> Result<PackManifest, ManifestError> {
        let format_version = required(doc.format_version, "format_version")?;
        if format_version != "1.0" {
            return Err(ManifestError::parse(
                "ACODE-PKL-003",
                format!("unsupported format_version '{format_version}': only 1.0 is supported"),
            ));
        }

        let id = required(doc.id, "id")?;
        if !is_valid_pack_id(&id) {
            return Err(ManifestError::parse(
                "ACODE-PKL-004",
                format!("pack ID '{id}' is not valid: must be kebab-case, 1-64 characters"),
            ));
        }

        let version_str = required(doc.version, "version")?;
        let version: PackVersion = version_str.parse().map_err(|_| {
            ManifestError::parse(
                "ACODE-PKL-005",
                format!("version '{version_str}' is not a valid semantic version"),
            )
        })?;

        let name = required(doc.name, "name")?;

        let content_hash = match doc.content_hash.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(ContentHash::new(raw).map_err(|e| {
                ManifestError::parse("ACODE-PKL-002", format!("invalid content_hash: {e}"))
            })?),
        };

        let created_at_str = required(doc.created_at, "created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str).map_err(|_| {
            ManifestError::parse(
                "ACODE-PKL-002",
                format!("invalid created_at timestamp: '{created_at_str}'"),
            )
        })?;

        let mut components = Vec::new();
        for component in doc.components.unwrap_or_default() {
            components.push(Self::map_component(component)?);
        }

        Ok(PackManifest {
            format_version,
            id,
            version,
            name,
            description: doc.description.unwrap_or_default(),
            content_hash,
            created_at,
            components,
            source,
            pack_path: PathBuf::from(pack_path),
        })
    }

    fn map_component(doc: ComponentDoc) -> Result<PackComponent, ManifestError> {
        let path = match doc.path {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                return Err(ManifestError::parse(
                    "ACODE-PKL-002",
                    "component path is required",
                ))
            }
        };

        let path = path_safety::normalize_and_validate(&path)?;

        let component_type = doc
            .component_type
            .as_deref()
            .map(ComponentType::parse)
            .unwrap_or(ComponentType::Custom);

        Ok(PackComponent {
            path,
            component_type,
            metadata: doc.metadata,
            description: doc.description,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ManifestError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ManifestError::parse(
            "ACODE-PKL-002",
            format!("{field} is required"),
        )),
    }
}
