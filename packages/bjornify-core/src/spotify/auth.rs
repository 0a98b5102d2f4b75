//! Spotify OAuth credential handling.
//!
//! [`CredentialManager`] owns the current [`Credential`] behind an
//! `RwLock<Arc<_>>`. Readers clone the `Arc` and never block on I/O; a
//! refresh performs the token exchange with no lock held and then swaps the
//! `Arc` in one short write, so a reader sees either the old or the new
//! credential, never a mix.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;

use crate::protocol_constants::{SPOTIFY_TOKEN_URL, TOKEN_EXPIRY_SKEW_SECS};
use crate::spotify::cache::CacheError;
use crate::spotify::error::AuthError;
use crate::spotify::traits::CredentialProvider;
use crate::utils::now_unix_secs;

/// An OAuth access credential for the Spotify Web API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    /// Expiry as a Unix timestamp in seconds.
    pub expires_at: i64,
}

impl Credential {
    /// Returns true if the token is expired, or will be within the skew margin.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_unix_secs())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at - now < TOKEN_EXPIRY_SKEW_SECS
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Builds a credential from a token endpoint response.
    ///
    /// The accounts service may omit `refresh_token` on refresh; the one that
    /// was exchanged stays valid and is carried over.
    pub fn from_token_response(
        response: TokenResponse,
        previous_refresh_token: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token.or(previous_refresh_token),
            scope: response.scope,
            expires_at: now + response.expires_in,
        }
    }
}

/// Body of a successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    pub scope: Option<String>,
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;
}

/// Persists refreshed credentials.
///
/// The manager never touches disk itself; a store attached with
/// [`CredentialManager::with_store`] is told about every new credential.
pub trait CredentialStore: Send + Sync {
    fn save(&self, credential: &Credential) -> Result<(), CacheError>;
}

/// Refresh-token grant against the Spotify accounts service.
pub struct HttpTokenExchange {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl HttpTokenExchange {
    pub fn new(
        client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint (for tests against a local server).
    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn exchange(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Owns the current Spotify credential and refreshes it on demand.
pub struct CredentialManager {
    current: RwLock<Arc<Credential>>,
    exchange: Arc<dyn TokenExchange>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("expires_at", &self.current.read().expires_at)
            .field("has_store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    pub fn new(initial: Credential, exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            exchange,
            store: None,
        }
    }

    /// Attaches a store that is notified after every successful refresh.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns the current credential. Never performs I/O.
    pub fn get(&self) -> Arc<Credential> {
        Arc::clone(&self.current.read())
    }

    /// Refreshes when `force` is set or the credential has expired.
    ///
    /// Concurrent forced refreshes are not coalesced; each one performs its
    /// own exchange and the last swap wins.
    ///
    /// # Errors
    /// Returns `AuthError` if there is no refresh token or the exchange
    /// fails. The current credential is left untouched in that case.
    pub async fn refresh(&self, force: bool) -> Result<bool, AuthError> {
        let current = self.get();
        if !force && !current.is_expired() {
            return Ok(false);
        }

        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(AuthError::MissingRefreshToken)?;

        log::info!(
            "[Auth] Refreshing Spotify token (forced={}, expires_at={})",
            force,
            current.expires_at
        );

        let response = match self.exchange.exchange(&refresh_token).await {
            Ok(r) => r,
            Err(e) => {
                log::error!("[Auth] Token refresh failed: {}", e);
                return Err(e);
            }
        };

        let refreshed = Arc::new(Credential::from_token_response(
            response,
            Some(refresh_token),
            now_unix_secs(),
        ));
        *self.current.write() = Arc::clone(&refreshed);

        log::info!("[Auth] Token refreshed, valid until {}", refreshed.expires_at);

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&refreshed) {
                log::warn!("[Auth] Failed to persist refreshed token: {}", e);
            }
        }

        Ok(true)
    }
}

#[async_trait]
impl CredentialProvider for CredentialManager {
    fn get(&self) -> Arc<Credential> {
        CredentialManager::get(self)
    }

    async fn refresh(&self, force: bool) -> Result<bool, AuthError> {
        CredentialManager::refresh(self, force).await
    }
}
