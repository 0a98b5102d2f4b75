//! Trait abstractions for the Spotify side of the bot.
//!
//! The dispatcher and now-playing reader only see these traits; the concrete
//! [`SpotifyClient`](super::SpotifyClient) and
//! [`CredentialManager`](super::CredentialManager) are wired in by bootstrap.

use std::sync::Arc;

use async_trait::async_trait;

use crate::spotify::auth::Credential;
use crate::spotify::error::{AuthError, SpotifyResult};
use crate::spotify::types::{CurrentPlayback, Device, Track, TrackUri};

/// Playback control on the user's active Spotify session.
#[async_trait]
pub trait SpotifyPlayback: Send + Sync {
    /// Current playback state; `None` when nothing is playing (HTTP 204).
    async fn current_playback(&self) -> SpotifyResult<Option<CurrentPlayback>>;

    async fn pause(&self) -> SpotifyResult<()>;

    async fn next_track(&self) -> SpotifyResult<()>;

    /// Appends a track to the user's queue on the active device.
    async fn add_to_queue(&self, uri: &TrackUri) -> SpotifyResult<()>;
}

/// Catalog and device operations used when no session is active.
#[async_trait]
pub trait SpotifyCatalog: Send + Sync {
    /// Searches tracks, best match first.
    async fn search_tracks(&self, query: &str, limit: u32) -> SpotifyResult<Vec<Track>>;

    /// Lists the user's available Spotify Connect devices.
    async fn devices(&self) -> SpotifyResult<Vec<Device>>;

    /// Starts playing `uris` on the given device.
    async fn start_playback(&self, device_id: &str, uris: &[TrackUri]) -> SpotifyResult<()>;
}

/// Source of the current access credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the current credential without any I/O.
    fn get(&self) -> Arc<Credential>;

    /// Refreshes the credential if `force` is set or it has expired.
    ///
    /// # Returns
    /// `true` if a new credential was installed.
    async fn refresh(&self, force: bool) -> Result<bool, AuthError>;
}

/// Combined trait for the full Spotify client.
pub trait SpotifyApi: SpotifyPlayback + SpotifyCatalog {}

impl<T: SpotifyPlayback + SpotifyCatalog> SpotifyApi for T {}
