//! Aggregating validation of loaded prompt packs.
//!
//! Unlike manifest parsing, validation never stops at the first problem: it
//! collects every applicable error and returns them as data so a caller can
//! print a complete report. It performs no disk or network I/O.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::pack::types::{is_valid_pack_id, PromptPack};

/// Maximum total UTF-8 size of all component contents.
pub const MAX_PACK_SIZE_BYTES: usize = 5 * 1024 * 1024;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]*)\}\}").expect("placeholder pattern compiles"));
static VARIABLE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("variable name pattern compiles"));

/// How serious a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The pack should not be used as-is.
    Error,
    /// Worth surfacing, but the pack remains usable.
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// Stable machine-readable code, e.g. `PACK_ID_REQUIRED`.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Component path the finding applies to, if any.
    pub path: Option<String>,
    /// Finding severity.
    pub severity: Severity,
}

impl ValidationError {
    fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            severity: Severity::Error,
        }
    }

    fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            severity: Severity::Warning,
        }
    }

    fn at(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }
}

/// The outcome of validating a pack: success iff zero errors were collected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Whether no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.iter().all(|e| e.severity != Severity::Error)
    }

    /// All collected findings.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Whether a finding with the given code was collected.
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// Validates already-loaded packs against schema and business rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackValidator;

impl PackValidator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate a loaded pack, collecting all violations.
    pub fn validate(&self, pack: &PromptPack) -> ValidationResult {
        let mut errors = Vec::new();

        Self::validate_manifest(pack, &mut errors);
        for component in &pack.components {
            Self::validate_component_path(&component.path, &mut errors);
            Self::validate_placeholders(&component.path, &component.content, &mut errors);
        }
        Self::validate_total_size(pack, &mut errors);

        if !errors.is_empty() {
            tracing::warn!(
                pack_id = %pack.id(),
                error_count = errors.len(),
                "pack failed validation"
            );
        }

        ValidationResult { errors }
    }

    fn validate_manifest(pack: &PromptPack, errors: &mut Vec<ValidationError>) {
        let manifest = &pack.manifest;

        if manifest.id.trim().is_empty() {
            errors.push(ValidationError::error(
                "PACK_ID_REQUIRED",
                "pack ID must not be empty",
            ));
        } else if !is_valid_pack_id(&manifest.id) {
            errors.push(ValidationError::error(
                "PACK_ID_INVALID",
                format!(
                    "pack ID '{}' is invalid: must be kebab-case, 1-64 characters",
                    manifest.id
                ),
            ));
        }

        if manifest.name.trim().is_empty() {
            errors.push(ValidationError::error(
                "PACK_NAME_REQUIRED",
                "pack name must not be empty",
            ));
        }

        if manifest.description.trim().is_empty() {
            errors.push(ValidationError::error(
                "PACK_DESCRIPTION_REQUIRED",
                "pack description must not be empty",
            ));
        }

        // A hash is optional but recommended; without one, integrity of
        // the pack contents cannot be verified at load time.
        if manifest.content_hash.is_none() {
            errors.push(ValidationError::warning(
                "CONTENT_HASH_MISSING",
                "manifest records no content_hash; pack integrity cannot be verified",
            ));
        }
    }

    // Path checks run on already-loaded data, independently of the
    // path-safety module, so validation never re-touches disk.
    fn validate_component_path(path: &str, errors: &mut Vec<ValidationError>) {
        if path.trim().is_empty() {
            errors.push(ValidationError::error(
                "COMPONENT_PATH_REQUIRED",
                "component path must not be empty",
            ));
            return;
        }

        let forward = path.replace('\\', "/");
        let bytes = forward.as_bytes();
        let is_absolute = forward.starts_with('/')
            || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':');
        if is_absolute {
            errors.push(
                ValidationError::error(
                    "COMPONENT_PATH_ABSOLUTE",
                    format!("component path must be relative: '{path}'"),
                )
                .at(path),
            );
        }

        if forward.split('/').any(|segment| segment == "..") {
            errors.push(
                ValidationError::error(
                    "COMPONENT_PATH_TRAVERSAL",
                    format!("component path must not contain '..': '{path}'"),
                )
                .at(path),
            );
        }
    }

    fn validate_placeholders(path: &str, content: &str, errors: &mut Vec<ValidationError>) {
        for captures in PLACEHOLDER_PATTERN.captures_iter(content) {
            let name = &captures[1];
            if !VARIABLE_NAME_PATTERN.is_match(name) {
                errors.push(
                    ValidationError::error(
                        "INVALID_TEMPLATE_VARIABLE",
                        format!("invalid template variable '{{{{{name}}}}}' in {path}"),
                    )
                    .at(path),
                );
            }
        }
    }

    fn validate_total_size(pack: &PromptPack, errors: &mut Vec<ValidationError>) {
        let total: usize = pack
            .components
            .iter()
            .fold(0usize, |acc, c| acc.saturating_add(c.content.len()));

        if total > MAX_PACK_SIZE_BYTES {
            errors.push(ValidationError::error(
                "PACK_SIZE_EXCEEDED",
                format!(
                    "pack size {} MB exceeds the {} MB limit",
                    format_mb(total),
                    format_mb(MAX_PACK_SIZE_BYTES)
                ),
            ));
        }
    }
}

/// Render a byte count as MB with two decimals, without float casts.
fn format_mb(bytes: usize) -> String {
    let hundredths = bytes.saturating_mul(100) / (1024 * 1024);
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}
