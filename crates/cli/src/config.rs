use analysis::PollConfig;
use anyhow::{Context, Result};
use client::{DEFAULT_READIFY_URL, DEFAULT_SCARF_URL, ReadifyClient, ScarfClient};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const SCARF_URL_ENV: &str = "SCARF_API_URL";
pub const READIFY_URL_ENV: &str = "READIFY_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "EndpointConfig::scarf")]
    pub scarf: EndpointConfig,
    #[serde(default = "EndpointConfig::readify")]
    pub readify: EndpointConfig,
    pub polling: PollConfig,
}

/// One backend section. `base_url` may be left out of a section that only
/// tunes the timeout; [`AppConfig`] then fills in that backend's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl EndpointConfig {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    fn scarf() -> Self {
        Self::new(DEFAULT_SCARF_URL)
    }

    fn readify() -> Self {
        Self::new(DEFAULT_READIFY_URL)
    }

    fn or_base_url(mut self, fallback: &str) -> Self {
        if self.base_url.trim().is_empty() {
            self.base_url = fallback.to_string();
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scarf: EndpointConfig::scarf(),
            readify: EndpointConfig::readify(),
            polling: PollConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file if one is given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        Ok(Self {
            scarf: config.scarf.or_base_url(DEFAULT_SCARF_URL),
            readify: config.readify.or_base_url(DEFAULT_READIFY_URL),
            ..config
        })
    }

    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(SCARF_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.scarf.base_url = url;
        }
        if let Some(url) = lookup(READIFY_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.readify.base_url = url;
        }
        self
    }

    pub fn scarf_client(&self) -> Result<ScarfClient> {
        ScarfClient::with_timeout(self.scarf.base_url.clone(), self.scarf.request_timeout())
            .context("Failed to build SCARF client")
    }

    pub fn readify_client(&self) -> Result<ReadifyClient> {
        ReadifyClient::with_timeout(
            self.readify.base_url.clone(),
            self.readify.request_timeout(),
        )
        .context("Failed to build Readify client")
    }
}
