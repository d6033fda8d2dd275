//! Core value types for prompt packs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::pack::hash::ContentHash;
use crate::pack::version::PackVersion;

static PACK_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("pack id pattern compiles"));

/// Kind of a pack component; determines both context filtering and merge
/// precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Base instructions, always included.
    System,
    /// Role-specific guidance, selected by the `role` metadata key.
    Role,
    /// Language-specific guidance, selected by the `language` metadata key.
    Language,
    /// Framework-specific guidance, selected by the `framework` metadata key.
    Framework,
    /// Anything else. Unknown type strings in a manifest map here.
    Custom,
}

impl ComponentType {
    /// Parse from a manifest type string, case-insensitively.
    ///
    /// Unknown values map to [`ComponentType::Custom`] rather than failing,
    /// so new component kinds do not break old readers.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "system" => Self::System,
            "role" => Self::Role,
            "language" => Self::Language,
            "framework" => Self::Framework,
            _ => Self::Custom,
        }
    }

    /// Merge precedence: System(1) < Role(2) < Language(3) < Framework(4) <
    /// other(99).
    pub fn precedence(&self) -> u8 {
        match self {
            Self::System => 1,
            Self::Role => 2,
            Self::Language => 3,
            Self::Framework => 4,
            Self::Custom => 99,
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::System => "system",
            Self::Role => "role",
            Self::Language => "language",
            Self::Framework => "framework",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Where a pack came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackSource {
    /// Shipped with the application, materialized on demand.
    BuiltIn,
    /// Discovered in the user packs directory.
    User,
}

/// A component as declared in a manifest. No content until loaded.
#[derive(Debug, Clone)]
pub struct PackComponent {
    /// Relative path of the fragment file, forward slashes.
    pub path: String,
    /// Component kind.
    pub component_type: ComponentType,
    /// Optional metadata, e.g. `role: coder`.
    pub metadata: Option<HashMap<String, String>>,
    /// Optional human description.
    pub description: Option<String>,
}

/// A [`PackComponent`] plus its file content; immutable once loaded.
#[derive(Debug, Clone)]
pub struct LoadedComponent {
    /// Normalized relative path.
    pub path: String,
    /// Component kind.
    pub component_type: ComponentType,
    /// Raw fragment content.
    pub content: String,
    /// Metadata carried over from the declaration.
    pub metadata: Option<HashMap<String, String>>,
}

impl LoadedComponent {
    /// Look up a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }
}

/// A parsed and validated `manifest.yml`.
#[derive(Debug, Clone)]
pub struct PackManifest {
    /// Manifest format version; always "1.0".
    pub format_version: String,
    /// Kebab-case pack ID, 1-64 characters.
    pub id: String,
    /// Pack semantic version.
    pub version: PackVersion,
    /// Display name.
    pub name: String,
    /// Display description (may be empty; the validator flags that).
    pub description: String,
    /// Recorded content hash, if the pack has one.
    pub content_hash: Option<ContentHash>,
    /// Creation timestamp.
    pub created_at: DateTime<FixedOffset>,
    /// Declared components, in manifest order.
    pub components: Vec<PackComponent>,
    /// Where this pack came from.
    pub source: PackSource,
    /// Absolute path of the pack directory.
    pub pack_path: PathBuf,
}

/// Whether a string is a valid pack ID: kebab-case, 1-64 characters, no
/// leading or trailing hyphen.
pub fn is_valid_pack_id(id: &str) -> bool {
    id.len() <= 64 && PACK_ID_PATTERN.is_match(id)
}

/// A fully loaded pack: manifest plus component contents.
///
/// Constructed once per load by the loader; composition operations borrow
/// it and never mutate it.
#[derive(Debug, Clone)]
pub struct PromptPack {
    /// The manifest this pack was loaded from.
    pub manifest: PackManifest,
    /// Loaded components, in manifest order.
    pub components: Vec<LoadedComponent>,
}

impl PromptPack {
    /// The pack ID.
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Look up a component by its normalized path.
    pub fn component(&self, path: &str) -> Option<&LoadedComponent> {
        self.components.iter().find(|c| c.path == path)
    }

    /// `(path, content)` pairs for content hashing.
    pub fn hash_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.components
            .iter()
            .map(|c| (c.path.as_str(), c.content.as_str()))
    }
}

/// The request-time selector used to filter and parameterize a pack.
#[derive(Debug, Clone, Default)]
pub struct CompositionContext {
    /// Active role, matched against `role` metadata.
    pub role: Option<String>,
    /// Active language, matched against `language` metadata.
    pub language: Option<String>,
    /// Active framework, matched against `framework` metadata.
    pub framework: Option<String>,
    /// Template variables for `{{name}}` substitution.
    pub variables: HashMap<String, String>,
}

impl CompositionContext {
    /// An empty context: only system components survive filtering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role selector.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the language selector.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the framework selector.
    #[must_use]
    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    /// Add a template variable binding.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}
