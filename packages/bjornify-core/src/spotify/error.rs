//! Error types for the Spotify Web API and token endpoint.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by [`SpotifyClient`](super::SpotifyClient) calls.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Transport-level failure (DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Spotify answered with a non-success status.
    #[error("Spotify API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Failed to parse Spotify response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The conditional refresh before the request failed.
    #[error("Credential refresh failed: {0}")]
    Auth(#[from] AuthError),
}

/// Convenient Result alias for Spotify API operations.
pub type SpotifyResult<T> = Result<T, SpotifyError>;

impl SpotifyError {
    /// Builds a status error from a response body, preferring Spotify's
    /// `{"error": {"message": ..}}` text over the raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: ErrorObject,
        }
        #[derive(Deserialize)]
        struct ErrorObject {
            message: String,
        }

        let message = serde_json::from_str::<Envelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        Self::Status { status, message }
    }

    /// HTTP status of the failed call, if Spotify answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401: the access token was rejected.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// 403: Spotify refuses to control this device (restricted device,
    /// which is what Sonos speakers report).
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}

/// Errors from the OAuth refresh-token exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The accounts service rejected the exchange (revoked or invalid token).
    #[error("token endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed token response: {0}")]
    Parse(#[from] serde_json::Error),

    /// No refresh token is available to exchange.
    #[error("no refresh token available")]
    MissingRefreshToken,
}
