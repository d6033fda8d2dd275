//! Pack discovery, indexing, lazy loading, and active-pack resolution.
//!
//! Discovery walks configured root directories in order and indexes
//! manifests by pack ID; later roots win, which is how user packs override
//! built-ins with the same ID. Packs are loaded, validated, and cached on
//! first access. `refresh` rebuilds everything under one lock so readers
//! never observe a partially rebuilt index.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::pack::cache::PackCache;
use crate::pack::loader::{PackLoadError, PackLoader};
use crate::pack::manifest::{ManifestParser, MANIFEST_FILE_NAME};
use crate::pack::types::{PackManifest, PackSource, PromptPack};
use crate::pack::validator::{PackValidator, ValidationResult};

/// Pack used when nothing else is configured.
pub const DEFAULT_PACK_ID: &str = "acode-standard";

/// Environment variable selecting the active pack, highest precedence.
pub const ACTIVE_PACK_ENV: &str = "ACODE_PROMPT_PACK";

/// Resolves the active pack ID with precedence: environment variable >
/// configured value > [`DEFAULT_PACK_ID`].
///
/// The resolved ID is cached; [`ActivePack::clear_cache`] forces a
/// re-read. The environment is read through an injected resolver so tests
/// never mutate process environment.
pub struct ActivePack {
    resolver: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
    configured: Option<String>,
    cached: Mutex<Option<String>>,
}

impl std::fmt::Debug for ActivePack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivePack")
            .field("configured", &self.configured)
            .finish_non_exhaustive()
    }
}

impl Default for ActivePack {
    fn default() -> Self {
        Self::from_env(None)
    }
}

impl ActivePack {
    /// Resolve from the real process environment, with an optional value
    /// from the config file as the middle precedence level.
    pub fn from_env(configured: Option<String>) -> Self {
        Self::with_resolver(configured, |key| std::env::var(key).ok())
    }

    /// Resolve through a custom environment resolver (for tests).
    pub fn with_resolver(
        configured: Option<String>,
        resolver: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            resolver: Box::new(resolver),
            configured,
            cached: Mutex::new(None),
        }
    }

    /// The active pack ID.
    pub fn get(&self) -> String {
        let mut cached = self.lock();
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        let id = (self.resolver)(ACTIVE_PACK_ENV)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.configured.clone())
            .unwrap_or_else(|| DEFAULT_PACK_ID.to_string());

        debug!(pack_id = %id, "resolved active pack");
        *cached = Some(id.clone());
        id
    }

    /// Drop the cached ID so the next [`ActivePack::get`] re-resolves.
    pub fn clear_cache(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A directory scanned for packs, with the source attributed to packs
/// found there.
#[derive(Debug, Clone)]
pub struct DiscoveryRoot {
    /// Directory whose immediate subdirectories are candidate packs.
    pub path: PathBuf,
    /// Source recorded on manifests discovered under this root.
    pub source: PackSource,
}

impl DiscoveryRoot {
    /// A root of built-in packs (materialized to disk).
    pub fn built_in(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: PackSource::BuiltIn,
        }
    }

    /// A root of user packs.
    pub fn user(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: PackSource::User,
        }
    }
}

/// A registry operation failed.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No pack with the requested ID is indexed.
    #[error("pack not found: {0}")]
    NotFound(String),
    /// The pack is indexed but could not be loaded.
    #[error("failed to load pack '{id}'")]
    Load {
        /// The pack ID that failed to load.
        id: String,
        /// The underlying load error.
        #[source]
        source: PackLoadError,
    },
    /// The pack loaded but failed validation.
    #[error("pack '{id}' failed validation")]
    Invalid {
        /// The pack ID that failed validation.
        id: String,
        /// The full aggregated validation report.
        report: ValidationResult,
    },
}

/// Indexes discovered packs and loads them lazily.
#[derive(Debug)]
pub struct PackRegistry {
    roots: Vec<DiscoveryRoot>,
    parser: ManifestParser,
    loader: PackLoader,
    validator: PackValidator,
    cache: PackCache,
    active: ActivePack,
    // Index key is the lowercased pack ID.
    index: Mutex<HashMap<String, PackManifest>>,
    // Held across clear + rediscover + reindex so concurrent refreshes
    // cannot interleave.
    refresh_lock: Mutex<()>,
}

impl PackRegistry {
    /// Create a registry over the given discovery roots. No scan happens
    /// until first use or an explicit [`PackRegistry::refresh`].
    pub fn new(roots: Vec<DiscoveryRoot>, active: ActivePack) -> Self {
        Self {
            roots,
            parser: ManifestParser::new(),
            loader: PackLoader::new(),
            validator: PackValidator::new(),
            cache: PackCache::new(),
            active,
            index: Mutex::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Clear cache, index, and the cached active-pack ID, then re-run
    /// discovery.
    pub fn refresh(&self) {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.cache.clear();
        self.active.clear_cache();

        let discovered = self.discover();
        let mut index = self.lock_index();
        index.clear();
        for manifest in discovered {
            // Later-discovered wins: user roots come after built-in roots.
            index.insert(manifest.id.to_ascii_lowercase(), manifest);
        }
        debug!(packs = index.len(), "registry refreshed");
    }

    /// All indexed manifests, sorted by pack ID.
    pub fn list(&self) -> Vec<PackManifest> {
        self.ensure_discovered();
        let mut manifests: Vec<PackManifest> = self.lock_index().values().cloned().collect();
        manifests.sort_by(|a, b| a.id.cmp(&b.id));
        manifests
    }

    /// Get a loaded, validated pack by ID, case-insensitively.
    ///
    /// Loads and caches on first access; later calls hit the cache.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] for unknown IDs,
    /// [`RegistryError::Load`] when the pack directory cannot be loaded,
    /// [`RegistryError::Invalid`] when validation reports errors.
    pub fn get(&self, pack_id: &str) -> Result<Arc<PromptPack>, RegistryError> {
        self.ensure_discovered();

        if let Some(pack) = self.cache.get_by_pack_id(pack_id) {
            return Ok(pack);
        }

        let manifest = self
            .lock_index()
            .get(&pack_id.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(pack_id.to_string()))?;

        let pack = self
            .loader
            .load_pack(&manifest.pack_path, manifest.source)
            .map_err(|source| RegistryError::Load {
                id: manifest.id.clone(),
                source,
            })?;

        let report = self.validator.validate(&pack);
        if !report.is_valid() {
            return Err(RegistryError::Invalid {
                id: manifest.id.clone(),
                report,
            });
        }

        let pack = Arc::new(pack);
        self.cache.set(Arc::clone(&pack));
        Ok(pack)
    }

    /// The resolved active pack ID.
    pub fn active_pack_id(&self) -> String {
        self.active.get()
    }

    /// Load the active pack.
    ///
    /// # Errors
    ///
    /// As [`PackRegistry::get`].
    pub fn active_pack(&self) -> Result<Arc<PromptPack>, RegistryError> {
        self.get(&self.active_pack_id())
    }

    /// Parse manifests in every root. One bad pack is logged and skipped;
    /// it never aborts discovery of the rest.
    fn discover(&self) -> Vec<PackManifest> {
        let mut manifests = Vec::new();

        for root in &self.roots {
            let entries = match std::fs::read_dir(&root.path) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(root = %root.path.display(), error = %e, "skipping unreadable discovery root");
                    continue;
                }
            };

            let mut pack_dirs: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            // Deterministic order within a root.
            pack_dirs.sort();

            for pack_dir in pack_dirs {
                let manifest_path = pack_dir.join(MANIFEST_FILE_NAME);
                if !manifest_path.is_file() {
                    debug!(dir = %pack_dir.display(), "no manifest in directory");
                    continue;
                }

                match self.parser.parse_file(&manifest_path, root.source) {
                    Ok(manifest) => {
                        debug!(pack_id = %manifest.id, dir = %pack_dir.display(), "discovered pack");
                        manifests.push(manifest);
                    }
                    Err(e) => {
                        warn!(
                            manifest = %manifest_path.display(),
                            error = %e,
                            "failed to parse manifest; skipping pack"
                        );
                    }
                }
            }
        }

        manifests
    }

    fn ensure_discovered(&self) {
        if self.lock_index().is_empty() {
            self.refresh();
        }
    }

    fn lock_index(&self) -> std::sync::MutexGuard<'_, HashMap<String, PackManifest>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
