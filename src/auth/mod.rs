//! Authentication module for the Trestle API
//!
//! Implements the OAuth2 client-credentials grant and keeps the resulting
//! bearer token cached until shortly before it expires.

pub mod oauth;
pub mod tokens;

pub use oauth::{check, TokenManager};

use crate::config::Config;

/// Scope requested for every Trestle token
pub const SCOPE: &str = "api";

/// Client-credentials configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// OAuth2 client ID
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Token endpoint
    pub token_url: String,
    /// Requested scope
    pub scope: String,
    /// Seconds before expiry at which a cached token stops being used
    pub expiry_margin_secs: u64,
}

impl AuthConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            scope: SCOPE.to_string(),
            expiry_margin_secs: config.token_expiry_margin_secs,
        }
    }
}
