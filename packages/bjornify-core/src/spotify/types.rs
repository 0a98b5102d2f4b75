//! Serde models for the subset of Spotify Web API responses the bot reads.

use serde::{Deserialize, Serialize};

use crate::protocol_constants::SPOTIFY_TRACK_URI_PREFIX;

/// A validated `spotify:track:<id>` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackUri(String);

impl TrackUri {
    /// Accepts a `spotify:track:` URI or an `open.spotify.com/track/` link.
    ///
    /// Returns `None` for anything else, including album and playlist URIs.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let id = match input.strip_prefix(SPOTIFY_TRACK_URI_PREFIX) {
            Some(id) => id,
            None => {
                let rest = input
                    .strip_prefix("https://open.spotify.com/")
                    .or_else(|| input.strip_prefix("http://open.spotify.com/"))?;
                // Localized links look like open.spotify.com/intl-de/track/<id>.
                let rest = match rest.split_once('/') {
                    Some((locale, tail)) if locale.starts_with("intl-") => tail,
                    _ => rest,
                };
                let id = rest.strip_prefix("track/")?;
                id.split(['?', '#']).next().unwrap_or_default()
            }
        };

        let valid = !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric());
        valid.then(|| Self(format!("{}{}", SPOTIFY_TRACK_URI_PREFIX, id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Spotify Connect device (`GET /me/player/devices`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    /// Absent for some restricted devices.
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub is_active: bool,
    /// Restricted devices (Sonos among them) reject Web API control with 403.
    #[serde(default)]
    pub is_restricted: bool,
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// A playable item. Episodes deserialize too, without artists or album.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    /// Comma-separated artist names.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// "Artist - Title", the label used in chat replies and autocomplete.
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.artist_names(), self.name)
        }
    }

    /// Largest album image, which Spotify lists first.
    pub fn artwork_url(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|a| a.images.first())
            .map(|i| i.url.as_str())
    }
}

/// What the session is playing from (album, playlist, artist, show).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackContext {
    #[serde(rename = "type")]
    pub context_type: String,
    pub uri: String,
}

/// Playback state (`GET /me/player`).
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPlayback {
    pub device: Device,
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub item: Option<Track>,
    pub context: Option<PlaybackContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Paging<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: Paging<Track>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYBACK_JSON: &str = r#"{
        "device": {"id": "abc", "is_active": true, "is_private_session": false,
                   "is_restricted": true, "name": "Living Room", "type": "Speaker",
                   "volume_percent": 30, "supports_volume": true},
        "shuffle_state": false, "repeat_state": "off", "timestamp": 1700000000000,
        "context": {"type": "playlist", "uri": "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M",
                    "href": "https://api.spotify.com/v1/playlists/37i9dQZF1DXcBWIGoYBM5M",
                    "external_urls": {}},
        "progress_ms": 125000,
        "item": {"uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC", "name": "Never Gonna Give You Up",
                 "duration_ms": 200000, "explicit": false,
                 "artists": [{"name": "Rick Astley", "uri": "spotify:artist:0gxyHStUsqpMadRV0Di1Qt"}],
                 "album": {"name": "Whenever You Need Somebody",
                           "images": [{"url": "https://i.scdn.co/image/large", "height": 640, "width": 640},
                                      {"url": "https://i.scdn.co/image/small", "height": 64, "width": 64}]}},
        "currently_playing_type": "track",
        "is_playing": true
    }"#;

    #[test]
    fn deserializes_current_playback() {
        let playback: CurrentPlayback = serde_json::from_str(PLAYBACK_JSON).unwrap();
        assert!(playback.is_playing);
        assert!(playback.device.is_restricted);
        assert_eq!(playback.progress_ms, Some(125_000));

        let item = playback.item.expect("item");
        assert_eq!(item.display_name(), "Rick Astley - Never Gonna Give You Up");
        assert_eq!(item.artwork_url(), Some("https://i.scdn.co/image/large"));
        assert_eq!(playback.context.unwrap().context_type, "playlist");
    }

    #[test]
    fn track_without_artists_displays_title_only() {
        let episode: Track =
            serde_json::from_str(r#"{"uri": "spotify:episode:1", "name": "Episode 1"}"#).unwrap();
        assert_eq!(episode.display_name(), "Episode 1");
        assert!(episode.artwork_url().is_none());
    }

    #[test]
    fn track_uri_accepts_uris_and_links() {
        assert_eq!(
            TrackUri::parse("spotify:track:4uLU6hMCjMI75M1A2tKUQC").unwrap().as_str(),
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(
            TrackUri::parse("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=x1")
                .unwrap()
                .as_str(),
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
        );
        assert_eq!(
            TrackUri::parse("https://open.spotify.com/intl-de/track/4uLU6hMCjMI75M1A2tKUQC")
                .unwrap()
                .as_str(),
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
        );
    }

    #[test]
    fn track_uri_rejects_other_input() {
        assert!(TrackUri::parse("never gonna give you up").is_none());
        assert!(TrackUri::parse("spotify:album:4uLU6hMCjMI75M1A2tKUQC").is_none());
        assert!(TrackUri::parse("spotify:track:").is_none());
        assert!(TrackUri::parse("https://open.spotify.com/album/abc").is_none());
    }
}
