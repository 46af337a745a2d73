use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::error::SoulburnError;

pub const API_KEY_ENV: &str = "ALCHEMY_API_KEY";
pub const BASE_URL_ENV: &str = "SOULBURN_BASE_URL";
pub const BASELINE_ENV: &str = "SOULBURN_BASELINE";

pub const DEFAULT_BASE_URL: &str = "https://eth-mainnet.g.alchemy.com/nft/v3";
pub const WIZARDS_CONTRACT: &str = "0x521f9c7505005cfa19a8e5786a9c3c9c9f5e6f42";
pub const SOULS_CONTRACT: &str = "0x251b5f14a825c537ff788604ea1b58e49b70726f";
pub const FLAMES_TOTAL: i64 = 1112;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub single_token_fallback: bool,
}

impl ProviderConfig {
    pub fn base_url(&self) -> Result<Url, SoulburnError> {
        let url = Url::parse(&self.base_url)?;
        if url.cannot_be_a_base() {
            return Err(SoulburnError::Config(format!(
                "provider base_url '{url}' cannot be used as a base URL"
            )));
        }
        Ok(url)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            single_token_fallback: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub wizards: String,
    pub souls: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        ContractsConfig {
            wizards: WIZARDS_CONTRACT.to_string(),
            souls: SOULS_CONTRACT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub baseline_path: PathBuf,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_secs: 300,
            baseline_path: PathBuf::from("wizards.csv"),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub flames_total: i64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            flames_total: FLAMES_TOTAL,
        }
    }
}

/// Process configuration: an optional TOML file overlaid by environment variables.
///
/// ```toml
/// [provider]
/// base_url = "https://eth-mainnet.g.alchemy.com/nft/v3"
/// request_timeout_secs = 30
///
/// [refresh]
/// interval_secs = 300
/// baseline_path = "wizards.csv"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub contracts: ContractsConfig,
    pub refresh: RefreshConfig,
    pub stats: StatsConfig,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, SoulburnError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads `path` when given (a missing file is an error), applies the process
    /// environment, and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, SoulburnError> {
        let mut config = match path {
            Some(path) => {
                tracing::debug!("Reading config from {:?}", path);
                Config::from_toml_str(&read_to_string(path)?)?
            }
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays values from `lookup`, which maps an environment variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SoulburnError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.provider.api_key = key.trim().to_string();
        }
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            self.provider.base_url = base_url;
        }
        if let Some(path) = lookup(BASELINE_ENV) {
            self.refresh.baseline_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SoulburnError> {
        if self.provider.api_key.is_empty() {
            return Err(SoulburnError::Config(format!(
                "{API_KEY_ENV} environment variable is required"
            )));
        }
        self.provider.base_url()?;
        if self.contracts.wizards.is_empty() || self.contracts.souls.is_empty() {
            return Err(SoulburnError::Config(
                "both contract addresses must be set".to_string(),
            ));
        }
        Ok(())
    }
}
