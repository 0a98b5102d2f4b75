//! Sonos speaker control and discovery.
//!
//! Used as the local fallback when Spotify refuses to control a device, and
//! to find out which speaker is rendering Spotify right now.
//!
//! # Module Structure
//!
//! - `types` - Transport state and position/track info
//! - `services` - UPnP service definitions (URNs, paths)
//! - `traits` - Trait abstractions for testability
//! - `client` - `SonosClientImpl` concrete trait implementation
//! - `didl` - DIDL-Lite parsing and Spotify item formatting
//! - `playback` - AVTransport commands
//! - `discovery` - SSDP multicast/broadcast speaker discovery
//! - `soap` - Low-level SOAP protocol implementation
//! - `retry` - Backoff for transient SOAP faults
//! - `utils` - Shared utility functions

pub mod client;
pub(crate) mod didl;
pub mod discovery;
pub(crate) mod playback;
pub(crate) mod retry;
pub mod services;
pub mod soap;
pub mod traits;
pub mod types;
pub mod utils;

pub use services::SonosService;

pub use traits::{SonosClient, SonosDiscovery, SonosPlayback};

pub use client::{SonosClientImpl, DEFAULT_SPOTIFY_SERVICE_TYPE};
pub use discovery::Speaker;
pub use types::{PositionInfo, TrackMetadata, TransportInfo, TransportState};
