//! Concrete Sonos client backed by `reqwest` and SSDP discovery.

use async_trait::async_trait;
use reqwest::Client;

use crate::sonos::discovery::{DiscoveryConfig, DiscoveryCoordinator, DiscoveryResult, Speaker};
use crate::sonos::playback;
use crate::sonos::soap::SoapResult;
use crate::sonos::traits::{SonosDiscovery, SonosPlayback};
use crate::sonos::types::{PositionInfo, TransportInfo};

/// Sonos service type used when none is configured.
///
/// 2311 covers Spotify accounts outside the US; US households use 3079.
pub const DEFAULT_SPOTIFY_SERVICE_TYPE: u32 = 2311;

/// Concrete implementation of the Sonos client traits.
///
/// Holds one shared HTTP client for SOAP calls and a discovery coordinator
/// with its own short-timeout client for device descriptions.
pub struct SonosClientImpl {
    client: Client,
    discovery: DiscoveryCoordinator,
    spotify_service_type: u32,
}

impl std::fmt::Debug for SonosClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonosClientImpl")
            .field("spotify_service_type", &self.spotify_service_type)
            .finish_non_exhaustive()
    }
}

impl SonosClientImpl {
    /// Creates a client with default discovery settings.
    pub fn new(client: Client) -> Self {
        Self::with_discovery_config(client, DiscoveryConfig::default())
    }

    pub fn with_discovery_config(client: Client, discovery_config: DiscoveryConfig) -> Self {
        Self {
            client,
            discovery: DiscoveryCoordinator::new(discovery_config),
            spotify_service_type: DEFAULT_SPOTIFY_SERVICE_TYPE,
        }
    }

    /// Sets the Sonos service type of the household's Spotify account.
    #[must_use]
    pub fn with_spotify_service_type(mut self, service_type: u32) -> Self {
        self.spotify_service_type = service_type;
        self
    }
}

#[async_trait]
impl SonosDiscovery for SonosClientImpl {
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        self.discovery.discover_speakers().await
    }
}

#[async_trait]
impl SonosPlayback for SonosClientImpl {
    async fn get_transport_info(&self, ip: &str) -> SoapResult<TransportInfo> {
        playback::get_transport_info(&self.client, ip).await
    }

    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo> {
        playback::get_position_info(&self.client, ip).await
    }

    async fn pause(&self, ip: &str) -> SoapResult<()> {
        playback::pause(&self.client, ip).await
    }

    async fn next(&self, ip: &str) -> SoapResult<()> {
        playback::next(&self.client, ip).await
    }

    async fn add_uri_to_queue(&self, ip: &str, spotify_uri: &str) -> SoapResult<u32> {
        playback::add_spotify_track_to_queue(
            &self.client,
            ip,
            spotify_uri,
            self.spotify_service_type,
        )
        .await
    }
}
