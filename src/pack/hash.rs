//! Content-addressable hashing for pack integrity and cache keys.
//!
//! The digest is deterministic across platforms: entries are sorted by path
//! with ordinal byte comparison and CRLF line endings are normalized to LF
//! before hashing, so two loads of identical logical content always hash
//! identically.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// A hash string was not a 64-character hex SHA-256 digest.
#[derive(Debug, Clone, Error)]
#[error("invalid content hash '{0}': must be 64 hexadecimal characters")]
pub struct InvalidContentHash(String);

/// A SHA-256 digest over a pack's normalized component contents.
///
/// Stored as 64 lowercase hex characters; comparison is case-insensitive
/// because the stored form is already folded to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a digest string, folding to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidContentHash`] unless the value is exactly 64 hex
    /// characters.
    pub fn new(value: &str) -> Result<Self, InvalidContentHash> {
        let folded = value.to_ascii_lowercase();
        let valid = folded.len() == 64 && folded.bytes().all(|b| b.is_ascii_hexdigit());
        if valid {
            Ok(Self(folded))
        } else {
            Err(InvalidContentHash(value.to_string()))
        }
    }

    /// The lowercase hex digest.
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Compare against an optional expected hash.
    ///
    /// `None` matches anything: a manifest without a recorded hash is
    /// never treated as a mismatch.
    pub fn matches(&self, expected: Option<&ContentHash>) -> bool {
        expected.is_none_or(|e| e == self)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes deterministic content hashes over `(path, content)` pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Create a hasher.
    pub fn new() -> Self {
        Self
    }

    /// Compute the digest over the given pairs.
    ///
    /// Iteration order of the input does not matter: pairs are sorted by
    /// path internally. Content line endings are normalized CRLF to LF.
    pub fn compute<'a, I>(&self, pairs: I) -> ContentHash
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut sorted: Vec<(&str, &str)> = pairs.into_iter().collect();
        sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let mut hasher = Sha256::new();
        for (path, content) in sorted {
            let normalized = content.replace("\r\n", "\n");
            hasher.update(path.as_bytes());
            hasher.update(b"\n");
            hasher.update(normalized.as_bytes());
            hasher.update(b"\n");
        }

        ContentHash(format!("{:x}", hasher.finalize()))
    }

    /// Compute the digest and compare against an expected hash.
    pub fn verify<'a, I>(&self, pairs: I, expected: &ContentHash) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.compute(pairs) == *expected
    }
}
