//! OAuth password-grant token handling for the forum API

use crate::config::ForumApiConfig;
use crate::forum::ApiError;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens are refreshed this long before the server-side expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A bearer token and the instant it should be considered stale
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

/// Caches the current access token and renews it when stale
///
/// Concurrent callers share one in-flight renewal because the cache lock is
/// held across the token request.
#[derive(Debug, Default)]
pub struct TokenCache {
    token: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a valid bearer token, requesting a new one if needed
    pub async fn bearer(&self, client: &Client, config: &ForumApiConfig) -> Result<String, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = request_token(client, config).await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Drops the cached token so the next call re-authenticates
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }
}

async fn request_token(client: &Client, config: &ForumApiConfig) -> Result<AccessToken, ApiError> {
    tracing::debug!("Requesting access token for {}", config.username);

    let response = client
        .post(&config.auth_url)
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .form(&[
            ("grant_type", "password"),
            ("username", config.username.as_str()),
            ("password", config.password.as_str()),
        ])
        .send()
        .await
        .map_err(|e| ApiError::Auth(format!("token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Auth(format!(
            "token endpoint returned HTTP {}",
            status.as_u16()
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| ApiError::Auth(format!("malformed token response: {}", e)))?;

    // The endpoint reports bad credentials with a 200 and an `error` field
    match (body.access_token, body.error) {
        (Some(value), None) => Ok(AccessToken {
            value,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in.unwrap_or(3600)),
        }),
        (_, Some(error)) => Err(ApiError::Auth(error)),
        (None, None) => Err(ApiError::Auth("token response had no access_token".to_string())),
    }
}
