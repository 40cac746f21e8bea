//! Configuration Management
//!
//! Device connection settings, loaded from the config file and overridden by
//! `FORTIOS_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Device address
    #[serde(default)]
    pub hostname: Option<String>,
    /// REST API administrator token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Default virtual domain
    #[serde(default)]
    pub vdom: Option<String>,
    /// Skip certificate verification
    #[serde(default)]
    pub insecure: bool,
    /// Extra trusted CA bundle (PEM)
    #[serde(default)]
    pub cabundlefile: Option<PathBuf>,
    /// Send attempts per call
    #[serde(default)]
    pub attempts: Option<u32>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fosmap").join("config.json"))
    }

    /// Load configuration from disk, then apply the environment
    pub fn load() -> Self {
        let from_file = Self::config_path()
            .filter(|p| p.exists())
            .and_then(|p| match Self::load_from(&p) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring config file: {:#}", e);
                    None
                }
            })
            .unwrap_or_default();

        from_file.merge_env(|key| std::env::var(key).ok())
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Apply environment overrides (environment > config file)
    pub fn merge_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(hostname) = non_empty("FORTIOS_ACCESS_HOSTNAME") {
            self.hostname = Some(hostname);
        }
        if let Some(token) = non_empty("FORTIOS_ACCESS_TOKEN") {
            self.token = Some(token);
        }
        if let Some(vdom) = non_empty("FORTIOS_VDOM") {
            self.vdom = Some(vdom);
        }
        if let Some(insecure) = non_empty("FORTIOS_INSECURE") {
            self.insecure = matches!(insecure.to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(bundle) = non_empty("FORTIOS_CA_CABUNDLE") {
            self.cabundlefile = Some(PathBuf::from(bundle));
        }
        self
    }

    /// Get effective attempt count (at least one)
    pub fn effective_attempts(&self) -> u32 {
        self.attempts.unwrap_or(1).max(1)
    }
}
