//! Björnify Core - chat-driven Spotify control with a Sonos fallback.
//!
//! Spotify Connect refuses remote control for some output devices, most
//! notably Sonos speakers playing through the native Spotify integration.
//! This crate performs each playback action through the Spotify Web API
//! and, when Spotify refuses, finds the Sonos speaker that is rendering
//! Spotify and performs the action over UPnP instead.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`spotify`]: Web API client, credential manager and token cache
//! - [`sonos`]: Sonos speaker control and discovery (UPnP/SOAP)
//! - [`services`]: Classifier, dispatcher, now-playing reader and add flow
//! - [`commands`]: Chat command parsing and replies
//! - [`state`]: Configuration
//! - [`bootstrap`]: Service wiring
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The services depend on traits rather than concrete clients, so tests can
//! script both backends:
//!
//! - [`SpotifyPlayback`](spotify::SpotifyPlayback) / [`SpotifyCatalog`](spotify::SpotifyCatalog)
//! - [`CredentialProvider`](spotify::CredentialProvider)
//! - [`SonosDiscovery`](sonos::SonosDiscovery) / [`SonosPlayback`](sonos::SonosPlayback)

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod protocol_constants;
pub mod services;
pub mod sonos;
pub mod spotify;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{BjornifyError, BjornifyResult, ErrorCode};
pub use state::Config;
pub use utils::{format_minutes_seconds, now_unix_secs};

// Re-export Spotify types
pub use spotify::{
    Credential, CredentialManager, CredentialProvider, CredentialStore, FileCredentialStore,
    SpotifyClient, SpotifyError, TrackUri,
};

// Re-export Sonos types
pub use sonos::{SonosClient, SonosClientImpl, Speaker, TransportState};

// Re-export service types
pub use services::{
    ActionKind, ActionResult, FailureReason, NowPlayingReader, PlaybackDispatcher,
    PlaybackSnapshot, PlaybackTarget, QueueOutcome,
};

// Re-export command and bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices, ClientCredentials};
pub use commands::{ChatCommand, CommandHandler, ParseCommandError};
