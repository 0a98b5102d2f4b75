//! Reads what is playing right now, from Spotify or a Sonos speaker.

use std::sync::Arc;

use serde::Serialize;

use crate::services::classifier::DeviceClassifier;
use crate::sonos::didl::parse_track_metadata;
use crate::sonos::traits::SonosClient;
use crate::sonos::types::PositionInfo;
use crate::sonos::utils::absolute_art_url;
use crate::spotify::traits::SpotifyPlayback;
use crate::spotify::types::CurrentPlayback;
use crate::utils::format_minutes_seconds;

/// Which backend a snapshot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackSource {
    Remote,
    Local,
}

/// Normalized view of the current track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub source: PlaybackSource,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub elapsed_ms: u64,
    /// `None` when the source reports no usable duration (live streams).
    pub total_ms: Option<u64>,
    pub device_name: String,
    pub artwork_url: Option<String>,
    /// Playback context label ("Playlist", "Album", ...), Spotify only.
    pub context: Option<String>,
}

impl PlaybackSnapshot {
    /// Builds a snapshot from an active Spotify session, if it has an item.
    pub fn from_remote(playback: &CurrentPlayback) -> Option<Self> {
        let item = playback.item.as_ref()?;
        Some(Self {
            source: PlaybackSource::Remote,
            title: item.name.clone(),
            artist: item.artist_names(),
            album: item
                .album
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            elapsed_ms: playback.progress_ms.unwrap_or(0),
            total_ms: (item.duration_ms > 0).then_some(item.duration_ms),
            device_name: playback.device.name.clone(),
            artwork_url: item.artwork_url().map(str::to_string),
            context: playback
                .context
                .as_ref()
                .map(|c| context_label(&c.context_type)),
        })
    }

    /// Builds a snapshot from a speaker's `GetPositionInfo` response.
    pub fn from_local(device_name: &str, ip: &str, position: &PositionInfo) -> Self {
        let metadata = parse_track_metadata(&position.track_metadata);
        Self {
            source: PlaybackSource::Local,
            title: metadata.title.unwrap_or_default(),
            artist: metadata.artist.unwrap_or_default(),
            album: metadata.album.unwrap_or_default(),
            elapsed_ms: position.rel_time_ms,
            total_ms: position.duration_ms(),
            device_name: device_name.to_string(),
            artwork_url: metadata.album_art_uri.map(|art| absolute_art_url(ip, &art)),
            context: None,
        }
    }

    /// Renders progress as `M:SS / M:SS`, or just `M:SS` without a duration.
    pub fn progress_display(&self) -> String {
        match self.total_ms {
            Some(total) => format!(
                "{} / {}",
                format_minutes_seconds(self.elapsed_ms),
                format_minutes_seconds(total)
            ),
            None => format_minutes_seconds(self.elapsed_ms),
        }
    }
}

impl std::fmt::Display for PlaybackSnapshot {
    /// `Artist - Title (Album) 2:05 / 3:20 on Device`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(4);
        match (self.artist.is_empty(), self.title.is_empty()) {
            (false, false) => parts.push(format!("{} - {}", self.artist, self.title)),
            (true, false) => parts.push(self.title.clone()),
            (false, true) => parts.push(self.artist.clone()),
            (true, true) => {}
        }
        if !self.album.is_empty() {
            parts.push(format!("({})", self.album));
        }
        parts.push(self.progress_display());
        if !self.device_name.is_empty() {
            parts.push(format!("on {}", self.device_name));
        }
        f.write_str(&parts.join(" "))
    }
}

fn context_label(context_type: &str) -> String {
    let mut chars = context_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read-only sibling of the dispatcher: Spotify first, then Sonos.
pub struct NowPlayingReader {
    spotify: Arc<dyn SpotifyPlayback>,
    sonos: Arc<dyn SonosClient>,
    classifier: DeviceClassifier,
}

impl NowPlayingReader {
    pub fn new(spotify: Arc<dyn SpotifyPlayback>, sonos: Arc<dyn SonosClient>) -> Self {
        let classifier = DeviceClassifier::new(Arc::clone(&sonos));
        Self {
            spotify,
            sonos,
            classifier,
        }
    }

    /// Returns the current track, or `None` if neither backend has one.
    pub async fn current_snapshot(&self) -> Option<PlaybackSnapshot> {
        match self.spotify.current_playback().await {
            Ok(Some(playback)) => {
                if let Some(snapshot) = PlaybackSnapshot::from_remote(&playback) {
                    return Some(snapshot);
                }
                log::debug!("[NowPlaying] Spotify session has no item");
            }
            Ok(None) => log::debug!("[NowPlaying] No active Spotify session"),
            Err(e) => log::warn!("[NowPlaying] Spotify status query failed: {}", e),
        }

        let target = self.classifier.find_active_local_target().await?;
        let speaker = target.speaker;
        match self.sonos.get_position_info(&speaker.ip).await {
            Ok(position) => Some(PlaybackSnapshot::from_local(
                &speaker.name,
                &speaker.ip,
                &position,
            )),
            Err(e) => {
                log::warn!(
                    "[NowPlaying] Track info from {} ({}) failed: {}",
                    speaker.name,
                    speaker.ip,
                    e
                );
                None
            }
        }
    }
}
