//! Spotify Web API access.
//!
//! - `auth` - Credential, refresh-token exchange and `CredentialManager`
//! - `cache` - spotipy-compatible token cache file
//! - `client` - `SpotifyClient` over `reqwest`
//! - `error` - `SpotifyError` / `AuthError`
//! - `traits` - Trait abstractions for testability
//! - `types` - Serde models for API responses

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod traits;
pub mod types;

pub use auth::{Credential, CredentialManager, CredentialStore, HttpTokenExchange, TokenExchange};
pub use cache::{CacheError, FileCredentialStore};
pub use client::SpotifyClient;
pub use error::{AuthError, SpotifyError, SpotifyResult};
pub use traits::{CredentialProvider, SpotifyApi, SpotifyCatalog, SpotifyPlayback};
pub use types::{CurrentPlayback, Device, Track, TrackUri};
