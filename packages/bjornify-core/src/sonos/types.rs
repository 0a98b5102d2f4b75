//! Sonos domain types read back from AVTransport queries.

use serde::Serialize;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Transport State
// ─────────────────────────────────────────────────────────────────────────────

/// Playback transport state of a Sonos speaker as reported by AVTransport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportState {
    Playing,
    #[serde(rename = "PAUSED_PLAYBACK")]
    Paused,
    Stopped,
    Transitioning,
    NoMediaPresent,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => write!(f, "Playing"),
            Self::Paused => write!(f, "Paused"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Transitioning => write!(f, "Transitioning"),
            Self::NoMediaPresent => write!(f, "No media"),
        }
    }
}

/// Error returned when parsing an unknown transport state string.
#[derive(Debug, Clone, Error)]
#[error("unknown transport state")]
pub struct ParseTransportStateError;

impl std::str::FromStr for TransportState {
    type Err = ParseTransportStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLAYING" => Ok(Self::Playing),
            "PAUSED_PLAYBACK" | "PAUSED" => Ok(Self::Paused),
            "STOPPED" => Ok(Self::Stopped),
            "TRANSITIONING" => Ok(Self::Transitioning),
            "NO_MEDIA_PRESENT" => Ok(Self::NoMediaPresent),
            _ => Err(ParseTransportStateError),
        }
    }
}

/// Result of `GetTransportInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    pub state: TransportState,
    /// Raw `CurrentTransportStatus` ("OK", "ERROR_OCCURRED", ...).
    pub status: String,
}

impl TransportInfo {
    /// Returns true if the speaker is actively rendering audio.
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Position / Track Info
// ─────────────────────────────────────────────────────────────────────────────

/// Track metadata decoded from a DIDL-Lite `TrackMetaData` payload.
///
/// Every field is best-effort; line-in and radio sources often omit most of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_art_uri: Option<String>,
}

/// Result of `GetPositionInfo`: what the speaker currently has loaded.
#[derive(Debug, Clone, Default)]
pub struct PositionInfo {
    /// Track number within the queue (1-based, 0 when not playing from the queue).
    pub track: u32,
    /// Track duration as reported ("H:MM:SS", empty or "NOT_IMPLEMENTED" for streams).
    pub track_duration: String,
    /// URI of the loaded track.
    pub track_uri: String,
    /// Raw (already unescaped) DIDL-Lite metadata blob.
    pub track_metadata: String,
    /// Elapsed time as reported ("H:MM:SS").
    pub rel_time: String,
    /// Elapsed time in milliseconds, parsed from `rel_time`.
    pub rel_time_ms: u64,
}

impl PositionInfo {
    /// Parses a UPnP "H:MM:SS" (optionally with ".fff") duration into milliseconds.
    ///
    /// Returns 0 for anything that does not parse, including "NOT_IMPLEMENTED".
    pub fn parse_time_to_ms(time: &str) -> u64 {
        Self::try_parse_time_to_ms(time).unwrap_or(0)
    }

    /// Like [`parse_time_to_ms`](Self::parse_time_to_ms) but returns `None` on garbage.
    pub fn try_parse_time_to_ms(time: &str) -> Option<u64> {
        let (hms, frac) = match time.split_once('.') {
            Some((hms, frac)) => (hms, Some(frac)),
            None => (time, None),
        };

        let mut parts = hms.split(':');
        let h: u64 = parts.next()?.trim().parse().ok()?;
        let m: u64 = parts.next()?.trim().parse().ok()?;
        let s: u64 = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let ms = match frac {
            Some(f) if !f.is_empty() => {
                if !f.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let digits = &f[..f.len().min(3)];
                let scale = 10u64.pow(3 - digits.len() as u32);
                digits.parse::<u64>().ok()? * scale
            }
            _ => 0,
        };

        // Speaker-supplied values; overflow means garbage, not a long track.
        h.checked_mul(60)?
            .checked_add(m)?
            .checked_mul(60)?
            .checked_add(s)?
            .checked_mul(1000)?
            .checked_add(ms)
    }

    /// Track duration in milliseconds, if the speaker reported a usable one.
    pub fn duration_ms(&self) -> Option<u64> {
        Self::try_parse_time_to_ms(&self.track_duration).filter(|&ms| ms > 0)
    }
}
