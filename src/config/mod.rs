//! Configuration loading and management.
//!
//! Loads acode configuration from `~/.acode/config.toml` (or
//! `$ACODE_CONFIG_PATH`). Environment variables override file values;
//! file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level acode configuration loaded from TOML.
///
/// Path: `~/.acode/config.toml` or `$ACODE_CONFIG_PATH`.
/// Env vars override file values; file values override defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AcodeConfig {
    /// Logging settings (`[logging]`).
    pub logging: LoggingConfig,
    /// Prompt pack settings (`[prompts]`).
    pub prompts: PromptsConfig,
}

impl AcodeConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$ACODE_CONFIG_PATH` or `~/.acode/config.toml`.
    /// If the file does not exist, returns defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            tracing::info!("no home directory, using default config");
            return Ok(AcodeConfig::default());
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: AcodeConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(AcodeConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config file path.
    ///
    /// Checks `$ACODE_CONFIG_PATH` first, then `~/.acode/config.toml`.
    fn config_path() -> Option<PathBuf> {
        Self::config_path_with(|key| std::env::var(key).ok())
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        if let Some(p) = env("ACODE_CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        acode_home().map(|home| home.join("config.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in tests).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("ACODE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("ACODE_PROMPT_PACK") {
            self.prompts.active_pack = Some(v);
        }
        if let Some(v) = env("ACODE_PACKS_DIR") {
            self.prompts.packs_dir = Some(v);
        }
    }

    /// Directory to scan for user-installed packs.
    ///
    /// `prompts.packs_dir` when set, otherwise `~/.acode/packs`. `None`
    /// when neither is available (no home directory).
    pub fn user_packs_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.prompts.packs_dir {
            return Some(PathBuf::from(dir));
        }
        acode_home().map(|home| home.join("packs"))
    }

    /// Parse a TOML string into config (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AcodeConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

/// The `~/.acode` directory, or `None` when no home directory exists.
pub fn acode_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".acode"))
}

/// Logging settings (`[logging]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Tracing log level filter.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Prompt pack settings (`[prompts]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// ID of the active pack. `$ACODE_PROMPT_PACK` overrides; falls back
    /// to the built-in default when unset.
    pub active_pack: Option<String>,
    /// Directory of user-installed packs. Defaults to `~/.acode/packs`.
    pub packs_dir: Option<String>,
}
