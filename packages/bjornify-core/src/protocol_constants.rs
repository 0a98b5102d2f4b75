//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external services (Spotify Web API, Sonos
//! UPnP) and changing them would break interoperability.

// ─────────────────────────────────────────────────────────────────────────────
// Application
// ─────────────────────────────────────────────────────────────────────────────

/// Application name shown in chat replies.
pub const APP_NAME: &str = "Björnify";

// ─────────────────────────────────────────────────────────────────────────────
// Spotify Web API
// ─────────────────────────────────────────────────────────────────────────────

/// Base URL for Spotify Web API requests.
pub const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// OAuth token endpoint used for the refresh-token grant.
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Seconds before the recorded expiry at which a token is already treated
/// as expired.
///
/// Matches spotipy, so a token cache shared with it refreshes at the same time.
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// Prefix of Spotify track URIs (`spotify:track:<base62 id>`).
pub const SPOTIFY_TRACK_URI_PREFIX: &str = "spotify:track:";

// ─────────────────────────────────────────────────────────────────────────────
// Sonos stream markers
// ─────────────────────────────────────────────────────────────────────────────

/// Substring of a track URI (or its metadata) when a Sonos speaker streams
/// Spotify natively.
pub const SONOS_SPOTIFY_MARKER: &str = "x-sonos-spotify:";

/// URI scheme of a Sonos virtual line-in (Spotify Connect hand-off).
pub const SONOS_VLI_PREFIX: &str = "x-sonos-vli:";

/// Substring identifying Spotify content inside a virtual line-in URI.
pub const SPOTIFY_URI_MARKER: &str = "spotify:";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP/SOAP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for SOAP HTTP requests (seconds).
///
/// 10 seconds is reasonable for LAN operations.
pub const SOAP_TIMEOUT_SECS: u64 = 10;
