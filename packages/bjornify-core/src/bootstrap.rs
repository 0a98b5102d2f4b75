//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. The binary only supplies
//! configuration, the initial credential and an optional token store.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::commands::CommandHandler;
use crate::error::{BjornifyError, BjornifyResult};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;
use crate::services::{NowPlayingReader, PlaybackDispatcher, TrackQueue};
use crate::sonos::{SonosClient, SonosClientImpl};
use crate::spotify::{
    Credential, CredentialManager, CredentialProvider, CredentialStore, HttpTokenExchange,
    SpotifyApi, SpotifyClient,
};
use crate::state::Config;

/// Spotify application credentials used for the refresh-token exchange.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Spotify Web API client.
    pub spotify: Arc<dyn SpotifyApi>,
    /// Owner of the Spotify access credential.
    pub credentials: Arc<CredentialManager>,
    /// Sonos client for speaker discovery and control.
    pub sonos: Arc<dyn SonosClient>,
    /// Routes playback actions between Spotify and Sonos.
    pub dispatcher: Arc<PlaybackDispatcher>,
    /// Reads the current track from either backend.
    pub now_playing: Arc<NowPlayingReader>,
    /// The `add` flow.
    pub queue: Arc<TrackQueue>,
    /// Chat command entry point.
    pub commands: Arc<CommandHandler>,
}

/// Creates an HTTP client with the given request timeout.
fn create_http_client(timeout: Duration) -> BjornifyResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BjornifyError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all application services with their dependencies.
///
/// The wiring order follows the dependency graph:
///
/// 1. HTTP clients (Spotify, Sonos SOAP)
/// 2. Credential manager (token exchange, optional store)
/// 3. Spotify and Sonos clients
/// 4. Dispatcher, now-playing reader and queue
/// 5. Command handler
///
/// # Errors
///
/// Returns an error if the configuration is invalid or an HTTP client
/// cannot be built.
pub fn bootstrap_services(
    config: &Config,
    client_credentials: ClientCredentials,
    initial: Credential,
    store: Option<Arc<dyn CredentialStore>>,
) -> BjornifyResult<BootstrappedServices> {
    config.validate().map_err(BjornifyError::Configuration)?;

    let spotify_http = create_http_client(Duration::from_secs(config.spotify_timeout_secs))?;
    let soap_http = create_http_client(Duration::from_secs(SOAP_TIMEOUT_SECS))?;

    let exchange = Arc::new(HttpTokenExchange::new(
        spotify_http.clone(),
        client_credentials.client_id,
        client_credentials.client_secret,
    ));
    let mut manager = CredentialManager::new(initial, exchange);
    if let Some(store) = store {
        manager = manager.with_store(store);
    }
    let credentials = Arc::new(manager);

    let spotify_client = Arc::new(SpotifyClient::new(
        spotify_http,
        Arc::clone(&credentials) as Arc<dyn CredentialProvider>,
    ));

    let sonos: Arc<dyn SonosClient> = Arc::new(
        SonosClientImpl::with_discovery_config(soap_http, config.discovery_config())
            .with_spotify_service_type(config.sonos_spotify_service_type),
    );

    let dispatcher = Arc::new(PlaybackDispatcher::new(
        Arc::clone(&spotify_client) as _,
        Arc::clone(&credentials) as _,
        Arc::clone(&sonos),
    ));
    let now_playing = Arc::new(NowPlayingReader::new(
        Arc::clone(&spotify_client) as _,
        Arc::clone(&sonos),
    ));
    let queue = Arc::new(TrackQueue::new(
        Arc::clone(&spotify_client) as _,
        Arc::clone(&dispatcher),
        config.preferred_device.clone(),
    ));
    let commands = Arc::new(CommandHandler::new(
        Arc::clone(&dispatcher),
        Arc::clone(&now_playing),
        Arc::clone(&queue),
        Arc::clone(&spotify_client) as _,
    ));

    log::info!(
        "[Bootstrap] Services ready (preferred device: {}, Sonos service type: {})",
        config.preferred_device,
        config.sonos_spotify_service_type
    );

    Ok(BootstrappedServices {
        spotify: spotify_client,
        credentials,
        sonos,
        dispatcher,
        now_playing,
        queue,
        commands,
    })
}
