//! Error types for token acquisition and listing fetches.

use thiserror::Error;

/// Token endpoint failures.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Token request failed: {0}")]
    RequestFailed(String),

    #[error("Token response missing '{0}'")]
    MissingField(&'static str),

    #[error("Token expiry margin of {0}s is out of range")]
    InvalidMargin(u64),
}

/// Failures while fetching a page from the OData API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No valid token available")]
    Token(#[from] AuthError),

    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Failed to decode JSON from {url}")]
    Decode {
        url: String,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response from {url}: {reason}")]
    Unexpected { url: String, reason: String },
}
