//! Prompt pack composition pipeline.
//!
//! A prompt pack is a directory of markdown components described by a
//! `manifest.yml`. This module covers the full lifecycle: parsing and
//! validating manifests, loading component content with path-safety and
//! symlink checks, content-addressed hashing, context-aware merging with
//! override splicing, template variable substitution, and a registry that
//! discovers packs across built-in and user roots.

pub mod cache;
pub mod composer;
pub mod embedded;
pub mod hash;
pub mod loader;
pub mod manifest;
pub mod merger;
pub mod path_safety;
pub mod registry;
pub mod template;
pub mod types;
pub mod validator;
pub mod version;

pub use cache::PackCache;
pub use composer::PromptComposer;
pub use embedded::{EmbeddedPackProvider, PackMaterializer};
pub use hash::{ContentHash, ContentHasher};
pub use loader::{PackLoadError, PackLoader};
pub use manifest::{ManifestError, ManifestParser, MANIFEST_FILE_NAME};
pub use merger::ComponentMerger;
pub use registry::{ActivePack, DiscoveryRoot, PackRegistry, RegistryError, DEFAULT_PACK_ID};
pub use template::{TemplateEngine, TemplateError};
pub use types::{
    ComponentType, CompositionContext, LoadedComponent, PackComponent, PackManifest, PackSource,
    PromptPack,
};
pub use validator::{PackValidator, Severity, ValidationError, ValidationResult};
pub use version::PackVersion;
