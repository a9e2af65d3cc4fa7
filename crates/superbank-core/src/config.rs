//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL, the credential storage backend and the last
//! phone number used to log in.
//!
//! Configuration is stored at `~/.config/superbank/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::BackendKind;

/// Application name used for config/data directory paths
const APP_NAME: &str = "superbank";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when neither the environment nor the config file names one.
pub const DEFAULT_API_URL: &str = "https://bank-super-app-production.up.railway.app/";

/// Environment variables checked for the base URL, in order.
const API_URL_ENV_VARS: [&str; 2] = ["SUPERBANK_API_URL", "EXPO_PUBLIC_API_URL"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub storage: BackendKind,
    #[serde(default)]
    pub last_phone: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the file credential backend.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Base URL: environment first, then the config file, then the default.
    pub fn api_base_url(&self) -> String {
        self.resolve_api_base_url(|name| std::env::var(name).ok())
    }

    fn resolve_api_base_url(&self, env: impl Fn(&str) -> Option<String>) -> String {
        API_URL_ENV_VARS
            .iter()
            .filter_map(|&name| env(name))
            .chain(self.api_base_url.clone())
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }
}
