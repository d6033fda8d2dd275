//! Thread-safe in-memory cache of loaded prompt packs.
//!
//! Keyed by pack ID, or `"<id>:<contentHash>"` when the pack carries a
//! hash, so a content-changed pack can coexist with a stale entry under
//! the same ID until the registry clears the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::pack::hash::ContentHash;
use crate::pack::types::PromptPack;

/// Build the cache key for a pack ID and optional content hash.
pub fn cache_key(pack_id: &str, hash: Option<&ContentHash>) -> String {
    match hash {
        Some(h) => format!("{pack_id}:{h}"),
        None => pack_id.to_string(),
    }
}

/// Thread-safe mapping from cache key to loaded pack.
///
/// Safe for concurrent reads and writes; there is no eviction policy
/// beyond explicit [`PackCache::clear`] on registry refresh.
#[derive(Debug, Default)]
pub struct PackCache {
    entries: Mutex<HashMap<String, Arc<PromptPack>>>,
}

impl PackCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a pack by exact cache key.
    pub fn get(&self, key: &str) -> Option<Arc<PromptPack>> {
        self.lock().get(key).cloned()
    }

    /// Look up a pack by ID, case-insensitively.
    ///
    /// A linear scan over cached values; pack counts are small.
    pub fn get_by_pack_id(&self, pack_id: &str) -> Option<Arc<PromptPack>> {
        self.lock()
            .values()
            .find(|pack| pack.id().eq_ignore_ascii_case(pack_id))
            .cloned()
    }

    /// Insert a pack under its derived cache key.
    pub fn set(&self, pack: Arc<PromptPack>) {
        let key = cache_key(pack.id(), pack.manifest.content_hash.as_ref());
        self.lock().insert(key, pack);
    }

    /// Remove an entry by exact cache key.
    pub fn remove(&self, key: &str) -> Option<Arc<PromptPack>> {
        self.lock().remove(key)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cached packs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<PromptPack>>> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself stays usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
