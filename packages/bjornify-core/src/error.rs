//! Centralized error types for the Björnify core library.
//!
//! Each layer keeps its own `thiserror` enum (`SoapError`, `DiscoveryError`,
//! `SpotifyError`, `AuthError`, `CacheError`); this module gives all of them
//! machine-readable codes through [`ErrorCode`] and folds them into
//! [`BjornifyError`] for callers that only need one type.

use thiserror::Error;

use crate::sonos::discovery::DiscoveryError;
use crate::sonos::soap::SoapError;
use crate::spotify::{AuthError, CacheError, SpotifyError};

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and replies.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
            Self::AllMethodsFailed(_) => "all_discovery_methods_failed",
        }
    }
}

impl ErrorCode for SoapError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Fault { .. } => "soap_fault",
            Self::Parse => "soap_parse_error",
        }
    }
}

impl ErrorCode for SpotifyError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "spotify_http_failed",
            Self::Status { status: 401, .. } => "spotify_unauthorized",
            Self::Status { status: 403, .. } => "spotify_forbidden",
            Self::Status { status: 404, .. } => "spotify_not_found",
            Self::Status { status: 429, .. } => "spotify_rate_limited",
            Self::Status { .. } => "spotify_error_status",
            Self::Parse(_) => "spotify_parse_error",
            Self::Auth(e) => e.code(),
        }
    }
}

impl ErrorCode for AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "token_request_failed",
            Self::Rejected { .. } => "token_rejected",
            Self::Parse(_) => "token_parse_error",
            Self::MissingRefreshToken => "missing_refresh_token",
        }
    }
}

impl ErrorCode for CacheError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "token_cache_io",
            Self::Json(_) => "token_cache_invalid",
        }
    }
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum BjornifyError {
    /// Speaker discovery failed (SSDP/network issues).
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// SOAP request to a Sonos speaker failed.
    #[error("SOAP request failed: {0}")]
    Soap(#[from] SoapError),

    /// Spotify Web API call failed.
    #[error("Spotify request failed: {0}")]
    Spotify(#[from] SpotifyError),

    /// Token exchange failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Token cache could not be read or written.
    #[error("Token cache error: {0}")]
    Cache(#[from] CacheError),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Startup wiring failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCode for BjornifyError {
    fn code(&self) -> &'static str {
        match self {
            Self::Discovery(e) => e.code(),
            Self::Soap(e) => e.code(),
            Self::Spotify(e) => e.code(),
            Self::Auth(e) => e.code(),
            Self::Cache(e) => e.code(),
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::sonos::discovery::DiscoveryResult;
pub use crate::sonos::soap::SoapResult;
pub use crate::spotify::SpotifyResult;

/// Convenient Result alias for application-wide operations.
pub type BjornifyResult<T> = Result<T, BjornifyError>;
