//! OAuth2 client-credentials flow against the Trestle token endpoint

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{
    BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
    BasicTokenIntrospectionResponse, BasicTokenType,
};
use oauth2::helpers;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AccessToken, AuthType, AuthUrl, Client, ClientId, ClientSecret, HttpResponse, RefreshToken,
    RequestTokenError, Scope, StandardRevocableToken, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use super::tokens::{StoredToken, TokenCache};
use super::AuthConfig;
use crate::config::{Config, MAX_TOKEN_EXPIRY_MARGIN_SECS};
use crate::error::AuthError;

/// Token endpoint reply.
///
/// Only `access_token` and `expires_in` matter here. `token_type` is often
/// left out by the endpoint and defaults to Bearer. Missing required fields
/// deserialize to empty values and are rejected by [`into_stored_token`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TrestleTokenResponse {
    #[serde(default = "empty_access_token")]
    access_token: AccessToken,
    #[serde(
        default = "bearer_token_type",
        deserialize_with = "helpers::deserialize_untagged_enum_case_insensitive"
    )]
    token_type: BasicTokenType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
}

fn empty_access_token() -> AccessToken {
    AccessToken::new(String::new())
}

fn bearer_token_type() -> BasicTokenType {
    BasicTokenType::Bearer
}

impl TokenResponse<BasicTokenType> for TrestleTokenResponse {
    fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    fn token_type(&self) -> &BasicTokenType {
        &self.token_type
    }

    fn expires_in(&self) -> Option<std::time::Duration> {
        self.expires_in.map(std::time::Duration::from_secs)
    }

    fn refresh_token(&self) -> Option<&RefreshToken> {
        None
    }

    fn scopes(&self) -> Option<&Vec<Scope>> {
        None
    }
}

type TrestleOAuthClient = Client<
    BasicErrorResponse,
    TrestleTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

/// Build the OAuth2 client from an AuthConfig
fn build_client(auth_config: &AuthConfig) -> Result<TrestleOAuthClient, AuthError> {
    // The client-credentials grant never visits the authorize endpoint, but
    // the oauth2 client requires one.
    let auth_url = AuthUrl::new(auth_config.token_url.clone())
        .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", auth_config.token_url, e)))?;
    let token_url = TokenUrl::new(auth_config.token_url.clone())
        .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", auth_config.token_url, e)))?;

    Ok(TrestleOAuthClient::new(
        ClientId::new(auth_config.client_id.clone()),
        Some(ClientSecret::new(auth_config.client_secret.clone())),
        auth_url,
        Some(token_url),
    )
    .set_auth_type(AuthType::RequestBody))
}

/// Log status and body of a failed token endpoint response.
fn log_error_response(response: &HttpResponse) {
    if !response.status_code.is_success() {
        tracing::error!("Token endpoint status: {}", response.status_code);
        tracing::error!(
            "Token endpoint body: {}",
            String::from_utf8_lossy(&response.body)
        );
    }
}

fn describe_token_error<RE>(err: BasicRequestTokenError<RE>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(resp) => AuthError::RequestFailed(resp.to_string()),
        RequestTokenError::Request(e) => AuthError::RequestFailed(e.to_string()),
        RequestTokenError::Parse(e, body) => AuthError::RequestFailed(format!(
            "unparseable token response ({}): {}",
            e,
            String::from_utf8_lossy(&body)
        )),
        RequestTokenError::Other(msg) => AuthError::RequestFailed(msg),
    }
}

/// Turn a parsed reply into a cache entry. Both the token and a non-zero
/// lifetime are required.
fn into_stored_token(
    response: &TrestleTokenResponse,
    issued_at: DateTime<Utc>,
) -> Result<StoredToken, AuthError> {
    let access_token = response.access_token().secret();
    if access_token.is_empty() {
        return Err(AuthError::MissingField("access_token"));
    }
    let expires_in = response
        .expires_in()
        .map(|d| d.as_secs())
        .filter(|secs| *secs > 0)
        .ok_or(AuthError::MissingField("expires_in"))?;

    Ok(StoredToken::new(access_token.clone(), issued_at, expires_in))
}

/// Acquires bearer tokens and keeps the current one cached.
pub struct TokenManager {
    client: TrestleOAuthClient,
    scope: String,
    margin: Duration,
    cache: TokenCache,
}

impl TokenManager {
    pub fn new(auth_config: &AuthConfig) -> Result<Self, AuthError> {
        let margin = match i64::try_from(auth_config.expiry_margin_secs) {
            Ok(secs) if auth_config.expiry_margin_secs <= MAX_TOKEN_EXPIRY_MARGIN_SECS => {
                Duration::seconds(secs)
            }
            _ => return Err(AuthError::InvalidMargin(auth_config.expiry_margin_secs)),
        };
        Ok(Self {
            client: build_client(auth_config)?,
            scope: auth_config.scope.clone(),
            margin,
            cache: TokenCache::new(),
        })
    }

    /// Request a fresh token and replace the cached one.
    ///
    /// On any failure the cache is cleared, so the next
    /// [`ensure_valid_token`](Self::ensure_valid_token) has to start over.
    pub async fn acquire_token(&mut self) -> Result<&StoredToken, AuthError> {
        match self.request_token().await {
            Ok(token) => {
                tracing::info!(
                    "Token acquired, valid until {}",
                    token.expires_at.format("%Y-%m-%dT%H:%M:%SZ")
                );
                Ok(self.cache.set(token))
            }
            Err(e) => {
                tracing::error!("Failed to acquire token: {}", e);
                self.cache.clear();
                Err(e)
            }
        }
    }

    /// Return the cached token, acquiring a new one if it is missing or
    /// within the expiry margin.
    pub async fn ensure_valid_token(&mut self) -> Result<String, AuthError> {
        if let Some(token) = self.cache.valid(self.margin) {
            return Ok(token.token.clone());
        }

        if self.cache.get().is_some() {
            tracing::info!("Cached token expires soon, renewing...");
        } else {
            tracing::debug!("No cached token, requesting one");
        }
        self.acquire_token().await.map(|t| t.token.clone())
    }

    async fn request_token(&self) -> Result<StoredToken, AuthError> {
        let response = self
            .client
            .exchange_client_credentials()
            .add_scope(Scope::new(self.scope.clone()))
            .request_async(|request| async move {
                async_http_client(request).await.map(|response| {
                    log_error_response(&response);
                    response
                })
            })
            .await
            .map_err(describe_token_error)?;

        into_stored_token(&response, Utc::now())
    }
}

/// Acquire a token and report its lifetime. The token itself is never printed.
pub async fn check() -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut manager = TokenManager::new(&AuthConfig::from_config(&config))?;
    let token = manager.acquire_token().await?;

    println!("Token endpoint: {}", config.token_url);
    println!("Issued:         {}", token.issued_at.format("%Y-%m-%dT%H:%M:%SZ"));
    println!("Expires:        {}", token.expires_at.format("%Y-%m-%dT%H:%M:%SZ"));
    println!(
        "Valid for:      {} minutes",
        (token.expires_at - Utc::now()).num_minutes()
    );
    Ok(())
}
