//! Configuration and credential loading

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_TOKEN_URL: &str = "https://api-trestle.corelogic.com/trestle/oidc/connect/token";
pub const DEFAULT_ODATA_URL: &str = "https://api-trestle.corelogic.com/trestle/odata";

/// Largest `$top` the listings endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Largest accepted `token_expiry_margin_secs` (one day).
pub const MAX_TOKEN_EXPIRY_MARGIN_SECS: u64 = 24 * 60 * 60;

/// Application configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth2 client ID issued by Trestle
    pub client_id: String,
    /// OAuth2 client secret issued by Trestle
    pub client_secret: String,
    /// Client-credentials token endpoint
    pub token_url: String,
    /// OData service root (the `Property` resource lives below it)
    pub api_base_url: String,
    /// Per-request timeout for listing calls
    pub request_timeout_secs: u64,
    /// Treat a token as expired this many seconds before its real expiry
    pub token_expiry_margin_secs: u64,
    /// Query used by `fetch` and `count`
    pub listings: ListingsConfig,
}

/// Which listings to page through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingsConfig {
    pub statuses: Vec<String>,
    pub exclude_counties: Vec<String>,
    pub expand: Option<String>,
    pub page_size: u32,
    pub max_pages: usize,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            statuses: vec!["Active".to_string()],
            exclude_counties: vec![
                "Los Angeles".to_string(),
                "Orange".to_string(),
                "San Diego".to_string(),
            ],
            expand: Some("Media".to_string()),
            page_size: MAX_PAGE_SIZE,
            max_pages: 10_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_ODATA_URL.to_string(),
            request_timeout_secs: 60,
            token_expiry_margin_secs: 300,
            listings: ListingsConfig::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_expiry_margin_secs", &self.token_expiry_margin_secs)
            .field("listings", &self.listings)
            .finish()
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "trestle-sync", "trestle-sync")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read config file")?;
            Self::parse(&content)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Overlay values from `TRESTLE_*` variables. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 4] = [
            ("TRESTLE_API_ID", &mut self.client_id),
            ("TRESTLE_API_PASSWORD", &mut self.client_secret),
            ("TRESTLE_OAUTH_URL", &mut self.token_url),
            ("TRESTLE_ODATA_URL", &mut self.api_base_url),
        ];
        for (key, slot) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }

    /// Reject configurations that cannot authenticate.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            bail!("client_id is not configured (set TRESTLE_API_ID or edit config.toml)");
        }
        if self.client_secret.trim().is_empty() {
            bail!("client_secret is not configured (set TRESTLE_API_PASSWORD or edit config.toml)");
        }
        if self.listings.page_size == 0 {
            bail!("listings.page_size must be at least 1");
        }
        if self.token_expiry_margin_secs > MAX_TOKEN_EXPIRY_MARGIN_SECS {
            bail!(
                "token_expiry_margin_secs must be at most {} (got {})",
                MAX_TOKEN_EXPIRY_MARGIN_SECS,
                self.token_expiry_margin_secs
            );
        }
        Ok(())
    }
}
