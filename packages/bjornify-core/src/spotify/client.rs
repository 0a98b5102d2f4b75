//! Spotify Web API client.
//!
//! Every request first asks the credential provider for a conditional
//! refresh, then sends the current bearer token. Non-success statuses come
//! back as [`SpotifyError::Status`] so callers can branch on 401/403.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::protocol_constants::SPOTIFY_API_BASE_URL;
use crate::spotify::error::{SpotifyError, SpotifyResult};
use crate::spotify::traits::{CredentialProvider, SpotifyCatalog, SpotifyPlayback};
use crate::spotify::types::{
    CurrentPlayback, Device, DevicesResponse, SearchResponse, Track, TrackUri,
};

/// Thin typed wrapper over the endpoints the bot uses.
pub struct SpotifyClient {
    http: Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
}

impl std::fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct StartPlaybackBody<'a> {
    uris: &'a [TrackUri],
}

impl SpotifyClient {
    pub fn new(http: Client, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http,
            credentials,
            base_url: SPOTIFY_API_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (for tests against a local server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds an authorized request, refreshing an expired token first.
    async fn request(&self, method: Method, path: &str) -> SpotifyResult<RequestBuilder> {
        self.credentials.refresh(false).await?;
        let credential = self.credentials.get();

        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, credential.authorization()))
    }

    /// Sends a request and returns the body, or `None` for an empty answer.
    async fn send(&self, builder: RequestBuilder, action: &str) -> SpotifyResult<Option<String>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        log::debug!("[Spotify] {} -> {}", action, status);

        if !status.is_success() {
            let err = SpotifyError::from_status(status.as_u16(), &body);
            log::debug!("[Spotify] {} failed: {}", action, err);
            return Err(err);
        }

        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        action: &str,
    ) -> SpotifyResult<Option<T>> {
        match self.send(builder, action).await? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Sends a body-less player command.
    ///
    /// Spotify answers 411 to a PUT/POST without `Content-Length`.
    async fn command(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        action: &str,
    ) -> SpotifyResult<()> {
        let builder = self
            .request(method, path)
            .await?
            .query(query)
            .header(CONTENT_LENGTH, "0");
        self.send(builder, action).await.map(|_| ())
    }
}

#[async_trait]
impl SpotifyPlayback for SpotifyClient {
    async fn current_playback(&self) -> SpotifyResult<Option<CurrentPlayback>> {
        let builder = self.request(Method::GET, "/me/player").await?;
        self.get_json(builder, "current_playback").await
    }

    async fn pause(&self) -> SpotifyResult<()> {
        self.command(Method::PUT, "/me/player/pause", &[], "pause").await
    }

    async fn next_track(&self) -> SpotifyResult<()> {
        self.command(Method::POST, "/me/player/next", &[], "next_track").await
    }

    async fn add_to_queue(&self, uri: &TrackUri) -> SpotifyResult<()> {
        self.command(
            Method::POST,
            "/me/player/queue",
            &[("uri", uri.as_str())],
            "add_to_queue",
        )
        .await
    }
}

#[async_trait]
impl SpotifyCatalog for SpotifyClient {
    async fn search_tracks(&self, query: &str, limit: u32) -> SpotifyResult<Vec<Track>> {
        let limit = limit.clamp(1, 50).to_string();
        let builder = self.request(Method::GET, "/search").await?.query(&[
            ("q", query),
            ("type", "track"),
            ("limit", limit.as_str()),
        ]);

        let response: Option<SearchResponse> = self.get_json(builder, "search_tracks").await?;
        Ok(response.map(|r| r.tracks.items).unwrap_or_default())
    }

    async fn devices(&self) -> SpotifyResult<Vec<Device>> {
        let builder = self.request(Method::GET, "/me/player/devices").await?;
        let response: Option<DevicesResponse> = self.get_json(builder, "devices").await?;
        Ok(response.map(|r| r.devices).unwrap_or_default())
    }

    async fn start_playback(&self, device_id: &str, uris: &[TrackUri]) -> SpotifyResult<()> {
        let builder = self
            .request(Method::PUT, "/me/player/play")
            .await?
            .query(&[("device_id", device_id)])
            .json(&StartPlaybackBody { uris });
        self.send(builder, "start_playback").await.map(|_| ())
    }
}
