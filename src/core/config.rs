//! Configuration management for rulesmith.
//!
//! Handles loading configuration from TOML files.
//!
//! ```toml
//! [resolver]
//! search_roots = ["./packages", "/opt/analyzers"]
//!
//! [runner]
//! timeout_ms = 60000
//!
//! [scanner]
//! language = "cs"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capability::Language;

/// Environment variable holding extra search roots, separated like `PATH`.
pub const SEARCH_ROOTS_ENV: &str = "RULESMITH_SEARCH_ROOTS";

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = ".rulesmith.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Module resolution settings
    pub resolver: ResolverConfig,

    /// Process runner settings
    pub runner: RunnerConfig,

    /// Capability scanner settings
    pub scanner: ScannerConfig,
}

/// Module resolution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directories searched recursively for missing modules
    pub search_roots: Vec<PathBuf>,
}

/// Process runner settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Default timeout in milliseconds; unset waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Capability scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Language inspected when none is given
    pub language: Language,

    /// Extra folders searched for module dependencies
    pub search_folders: Vec<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { language: Language::CSharp, search_folders: Vec::new() }
    }
}

impl RunnerConfig {
    /// The configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.rulesmith.toml` in current directory
    /// 2. `~/.config/rulesmith/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rulesmith"))
    }

    /// Path of the global config file.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// The file `load` would read, if any.
    pub fn active_path() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }
        Self::global_config_path().filter(|p| p.exists())
    }

    /// Configured search roots followed by those in `RULESMITH_SEARCH_ROOTS`.
    pub fn search_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.resolver.search_roots.clone();
        if let Some(extra) = std::env::var_os(SEARCH_ROOTS_ENV) {
            roots.extend(std::env::split_paths(&extra).filter(|p| !p.as_os_str().is_empty()));
        }
        roots
    }
}
