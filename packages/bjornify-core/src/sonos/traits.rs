//! Trait abstractions for Sonos operations.
//!
//! The classifier, dispatcher and now-playing reader depend on these rather
//! than on [`SonosClientImpl`](super::SonosClientImpl), so tests can swap in
//! scripted speakers.

use async_trait::async_trait;

use crate::sonos::discovery::{DiscoveryResult, Speaker};
use crate::sonos::soap::SoapResult;
use crate::sonos::types::{PositionInfo, TransportInfo};

/// Trait for Sonos speaker discovery operations.
#[async_trait]
pub trait SonosDiscovery: Send + Sync {
    /// Discovers Sonos speakers on the local network.
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>>;
}

/// Trait for the AVTransport operations the bot needs.
#[async_trait]
pub trait SonosPlayback: Send + Sync {
    /// Gets the transport state (PLAYING, PAUSED_PLAYBACK, ...).
    ///
    /// # Arguments
    /// * `ip` - IP address of the Sonos speaker
    async fn get_transport_info(&self, ip: &str) -> SoapResult<TransportInfo>;

    /// Gets the loaded track URI, its DIDL-Lite metadata and the position.
    ///
    /// # Arguments
    /// * `ip` - IP address of the Sonos speaker
    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo>;

    /// Pauses playback.
    async fn pause(&self, ip: &str) -> SoapResult<()>;

    /// Skips to the next track in the speaker's queue.
    async fn next(&self, ip: &str) -> SoapResult<()>;

    /// Appends a `spotify:track:` URI to the speaker's queue.
    ///
    /// # Returns
    /// The queue position of the new track.
    async fn add_uri_to_queue(&self, ip: &str, spotify_uri: &str) -> SoapResult<u32>;
}

/// Combined trait for everything the bot asks of the local network.
pub trait SonosClient: SonosDiscovery + SonosPlayback {}

impl<T: SonosDiscovery + SonosPlayback> SonosClient for T {}
