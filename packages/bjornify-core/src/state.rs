//! Core configuration types.
//!
//! [`Config`] covers everything the library needs to wire its services;
//! credentials and file locations belong to the binary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sonos::discovery::ssdp::SsdpConfig;
use crate::sonos::discovery::DiscoveryConfig;
use crate::sonos::DEFAULT_SPOTIFY_SERVICE_TYPE;

/// Spotify Connect device that playback is started on when nothing is active.
pub const DEFAULT_PREFERRED_DEVICE: &str = "Everywhere";

/// Configuration for Björnify.
///
/// All fields have sensible defaults, so a config file only needs to name
/// what it changes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    // Spotify
    /// Device name preferred when starting playback without an active session.
    pub preferred_device: String,

    /// Timeout for Spotify Web API requests (seconds).
    pub spotify_timeout_secs: u64,

    // Sonos
    /// Sonos service type of the household's Spotify account (2311, or 3079 in the US).
    pub sonos_spotify_service_type: u32,

    /// Number of M-SEARCH packets to send during discovery.
    pub ssdp_send_count: u32,

    /// Delay between M-SEARCH packet retries (milliseconds).
    pub ssdp_retry_delay_ms: u64,

    /// How long to collect SSDP replies (milliseconds).
    pub ssdp_timeout_ms: u64,

    /// Enable SSDP multicast discovery.
    pub discovery_ssdp_multicast: bool,

    /// Enable SSDP broadcast discovery.
    pub discovery_ssdp_broadcast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_device: DEFAULT_PREFERRED_DEVICE.to_string(),
            spotify_timeout_secs: 10,
            sonos_spotify_service_type: DEFAULT_SPOTIFY_SERVICE_TYPE,
            ssdp_send_count: 3,
            ssdp_retry_delay_ms: 800,
            ssdp_timeout_ms: 3000,
            discovery_ssdp_multicast: true,
            discovery_ssdp_broadcast: true,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.discovery_ssdp_multicast && !self.discovery_ssdp_broadcast {
            return Err("at least one SSDP discovery method must be enabled".to_string());
        }
        if self.ssdp_send_count == 0 {
            return Err("ssdp_send_count must be >= 1".to_string());
        }
        if self.ssdp_timeout_ms == 0 {
            return Err("ssdp_timeout_ms must be >= 1".to_string());
        }
        if self.preferred_device.trim().is_empty() {
            return Err("preferred_device must not be empty".to_string());
        }
        Ok(())
    }

    /// Discovery settings derived from this configuration.
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            ssdp_multicast_enabled: self.discovery_ssdp_multicast,
            ssdp_broadcast_enabled: self.discovery_ssdp_broadcast,
            ssdp: SsdpConfig {
                send_count: self.ssdp_send_count,
                retry_delay: Duration::from_millis(self.ssdp_retry_delay_ms),
                discovery_timeout: Duration::from_millis(self.ssdp_timeout_ms),
                ..SsdpConfig::default()
            },
            ..DiscoveryConfig::default()
        }
    }
}
