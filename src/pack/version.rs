//! Semantic versioning for prompt packs.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SEMVER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<major>0|[1-9]\d*)\.(?P<minor>0|[1-9]\d*)\.(?P<patch>0|[1-9]\d*)(?:-(?P<prerelease>(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+(?P<buildmetadata>[0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .expect("semver pattern compiles")
});

/// A version string did not match SemVer 2.0.
#[derive(Debug, Clone, Error)]
#[error("invalid semantic version: '{0}'")]
pub struct VersionParseError(String);

/// A SemVer 2.0 pack version.
///
/// Ordering follows semver precedence: a pre-release sorts below the
/// corresponding release. Build metadata is ignored for both ordering and
/// equality.
#[derive(Debug, Clone)]
pub struct PackVersion {
    /// Major version number.
    pub major: u64,
    /// Minor version number.
    pub minor: u64,
    /// Patch version number.
    pub patch: u64,
    /// Optional pre-release suffix (e.g. "alpha", "beta.1").
    pub pre_release: Option<String>,
    /// Optional build metadata (after `+`).
    pub build_metadata: Option<String>,
}

impl PackVersion {
    /// Construct a release version with no pre-release or build metadata.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
            build_metadata: None,
        }
    }

    /// Whether this is a pre-release version.
    pub fn is_pre_release(&self) -> bool {
        self.pre_release.is_some()
    }
}

impl FromStr for PackVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = SEMVER_PATTERN
            .captures(s)
            .ok_or_else(|| VersionParseError(s.to_string()))?;

        // The pattern guarantees the numeric groups parse; out-of-range
        // values (beyond u64) still fail cleanly.
        let part = |name: &str| -> Result<u64, VersionParseError> {
            captures
                .name(name)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| VersionParseError(s.to_string()))
        };

        Ok(Self {
            major: part("major")?,
            minor: part("minor")?,
            patch: part("patch")?,
            pre_release: captures.name("prerelease").map(|m| m.as_str().to_string()),
            build_metadata: captures
                .name("buildmetadata")
                .map(|m| m.as_str().to_string()),
        })
    }
}

impl std::fmt::Display for PackVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build_metadata {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl PartialEq for PackVersion {
    fn eq(&self, other: &Self) -> bool {
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.pre_release == other.pre_release
    }
}

impl Eq for PackVersion {}

impl std::hash::Hash for PackVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.pre_release.hash(state);
    }
}

impl Ord for PackVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for PackVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
