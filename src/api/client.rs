//! Authenticated HTTP client for the Trestle OData API
//!
//! Wraps reqwest::Client with bearer token injection and renewal.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::auth::{AuthConfig, TokenManager};
use crate::config::Config;
use crate::error::FetchError;

/// Client for the OData service. Owns the token cache.
pub struct TrestleClient {
    http: reqwest::Client,
    config: Config,
    tokens: TokenManager,
    timeout: Duration,
}

impl TrestleClient {
    /// Load config from disk and the environment, then build the client.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::load()?)
    }

    pub fn new(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let tokens = TokenManager::new(&AuthConfig::from_config(&config))
            .context("Failed to set up token manager")?;

        Ok(Self {
            http,
            config,
            tokens,
            timeout,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute URL of a resource below the OData root.
    pub fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }

    /// GET with bearer auth. `params` are appended only when non-empty, so
    /// cursor URLs go out exactly as the server issued them.
    pub async fn get(
        &mut self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, FetchError> {
        let token = self.tokens.ensure_valid_token().await?;
        tracing::debug!("GET {}", url);

        let mut request = self
            .http
            .get(url)
            .bearer_auth(&token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout);
        if !params.is_empty() {
            request = request.query(params);
        }

        let resp = request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        check_response(resp, url).await
    }

    /// GET and decode a JSON body. The raw body is kept for decode errors.
    pub async fn get_json<T: DeserializeOwned>(
        &mut self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let body = self.get_text(url, params).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            body,
            source,
        })
    }

    pub async fn get_text(
        &mut self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, FetchError> {
        let resp = self.get(url, params).await?;
        resp.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!("401 Unauthorized for {}. Token may have been revoked.", url);
        }
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}
