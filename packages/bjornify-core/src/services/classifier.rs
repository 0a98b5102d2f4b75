//! Finds the Sonos speaker that is currently rendering Spotify.
//!
//! A speaker can be playing Spotify in three ways, and each one leaves a
//! different trace in `GetPositionInfo`:
//! - native Sonos Spotify integration: the track URI is `x-sonos-spotify:...`
//! - Spotify Connect hand-off: a virtual line-in URI (`x-sonos-vli:...`)
//!   naming the Spotify session
//! - anything else carrying Spotify content: only the DIDL metadata mentions
//!   `x-sonos-spotify:`
//!
//! [`STREAM_RULES`] lists them in priority order.

use std::sync::Arc;

use serde::Serialize;

use crate::protocol_constants::{SONOS_SPOTIFY_MARKER, SONOS_VLI_PREFIX, SPOTIFY_URI_MARKER};
use crate::sonos::discovery::Speaker;
use crate::sonos::traits::SonosClient;

/// How a speaker was recognized as playing Spotify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    NativeStream,
    VirtualLineIn,
    MetadataMarker,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NativeStream => write!(f, "native stream"),
            Self::VirtualLineIn => write!(f, "virtual line-in"),
            Self::MetadataMarker => write!(f, "metadata marker"),
        }
    }
}

/// One entry of the classification table.
pub struct StreamRule {
    pub kind: StreamKind,
    matches: fn(uri: &str, metadata: &str) -> bool,
}

impl StreamRule {
    pub fn matches(&self, uri: &str, metadata: &str) -> bool {
        (self.matches)(uri, metadata)
    }
}

/// Classification rules, highest priority first.
pub const STREAM_RULES: &[StreamRule] = &[
    StreamRule {
        kind: StreamKind::NativeStream,
        matches: |uri, _| uri.contains(SONOS_SPOTIFY_MARKER),
    },
    StreamRule {
        kind: StreamKind::VirtualLineIn,
        matches: |uri, _| uri.starts_with(SONOS_VLI_PREFIX) && uri.contains(SPOTIFY_URI_MARKER),
    },
    StreamRule {
        kind: StreamKind::MetadataMarker,
        matches: |_, metadata| metadata.contains(SONOS_SPOTIFY_MARKER),
    },
];

/// Returns the first rule matching a speaker's track URI and metadata.
pub fn classify_stream(uri: &str, metadata: &str) -> Option<StreamKind> {
    STREAM_RULES
        .iter()
        .find(|rule| rule.matches(uri, metadata))
        .map(|rule| rule.kind)
}

/// A speaker found playing Spotify during one classification pass.
///
/// Never cached: the next pass may find a different speaker, or none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalTarget {
    pub speaker: Speaker,
    pub kind: StreamKind,
}

/// Scans discovered speakers for active Spotify playback.
pub struct DeviceClassifier {
    sonos: Arc<dyn SonosClient>,
}

impl DeviceClassifier {
    pub fn new(sonos: Arc<dyn SonosClient>) -> Self {
        Self { sonos }
    }

    /// Returns the first speaker, in discovery order, that is playing Spotify.
    ///
    /// Speakers are queried one at a time. A speaker that fails to answer is
    /// logged and skipped; a discovery failure yields `None`.
    pub async fn find_active_local_target(&self) -> Option<LocalTarget> {
        let speakers = match self.sonos.discover_speakers().await {
            Ok(speakers) => speakers,
            Err(e) => {
                log::warn!("[Classifier] Speaker discovery failed: {}", e);
                return None;
            }
        };

        if speakers.is_empty() {
            log::info!("[Classifier] No Sonos speakers discovered");
            return None;
        }

        for speaker in speakers {
            let transport = match self.sonos.get_transport_info(&speaker.ip).await {
                Ok(info) => info,
                Err(e) => {
                    log::warn!(
                        "[Classifier] {} ({}) unreachable, skipping: {}",
                        speaker.name,
                        speaker.ip,
                        e
                    );
                    continue;
                }
            };

            if !transport.is_playing() {
                log::debug!("[Classifier] {} is {}", speaker.name, transport.state);
                continue;
            }

            let position = match self.sonos.get_position_info(&speaker.ip).await {
                Ok(position) => position,
                Err(e) => {
                    log::warn!(
                        "[Classifier] Track info from {} ({}) failed, skipping: {}",
                        speaker.name,
                        speaker.ip,
                        e
                    );
                    continue;
                }
            };

            match classify_stream(&position.track_uri, &position.track_metadata) {
                Some(kind) => {
                    log::info!(
                        "[Classifier] {} ({}) is playing Spotify ({})",
                        speaker.name,
                        speaker.ip,
                        kind
                    );
                    return Some(LocalTarget { speaker, kind });
                }
                None => log::debug!(
                    "[Classifier] {} is playing something else: {}",
                    speaker.name,
                    position.track_uri
                ),
            }
        }

        log::info!("[Classifier] No speaker is playing Spotify");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{MockSonos, MockSpeaker};
    use std::sync::atomic::Ordering;

    const NATIVE_URI: &str = "x-sonos-spotify:spotify%3atrack%3aabc?sid=9&flags=8224&sn=7";
    const VLI_URI: &str = "x-sonos-vli:RINCON_ABC01400:2,spotify:4cd0c4b3d8e1";
    const SPOTIFY_DIDL: &str =
        "<DIDL-Lite><item><res>x-sonos-spotify:spotify%3atrack%3aabc</res></item></DIDL-Lite>";

    #[test]
    fn native_stream_wins_over_metadata() {
        assert_eq!(
            classify_stream(NATIVE_URI, SPOTIFY_DIDL),
            Some(StreamKind::NativeStream)
        );
    }

    #[test]
    fn virtual_line_in_needs_spotify_marker() {
        assert_eq!(classify_stream(VLI_URI, ""), Some(StreamKind::VirtualLineIn));
        assert_eq!(
            classify_stream("x-sonos-vli:RINCON_ABC01400:1,airplay:abc", ""),
            None
        );
    }

    #[test]
    fn metadata_marker_is_last_resort() {
        assert_eq!(
            classify_stream("x-rincon-queue:RINCON_ABC01400#0", SPOTIFY_DIDL),
            Some(StreamKind::MetadataMarker)
        );
    }

    #[test]
    fn other_sources_do_not_match() {
        assert_eq!(
            classify_stream("x-rincon-mp3radio://example.com/stream", "<DIDL-Lite/>"),
            None
        );
        assert_eq!(classify_stream("", ""), None);
    }

    #[test]
    fn rule_table_is_in_priority_order() {
        let kinds: Vec<_> = STREAM_RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [
                StreamKind::NativeStream,
                StreamKind::VirtualLineIn,
                StreamKind::MetadataMarker
            ]
        );
    }

    #[tokio::test]
    async fn no_speakers_means_no_target() {
        let sonos = Arc::new(MockSonos::new(vec![]));
        let classifier = DeviceClassifier::new(sonos.clone());

        assert!(classifier.find_active_local_target().await.is_none());
        assert_eq!(sonos.transport_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_matching_speaker_in_discovery_order_wins() {
        let sonos = Arc::new(MockSonos::new(vec![
            MockSpeaker::paused("Kitchen", "10.0.0.1"),
            MockSpeaker::playing("Office", "10.0.0.2", "x-rincon-mp3radio://radio", ""),
            MockSpeaker::playing("Living Room", "10.0.0.3", VLI_URI, ""),
            MockSpeaker::playing("Bedroom", "10.0.0.4", NATIVE_URI, ""),
        ]));
        let classifier = DeviceClassifier::new(sonos.clone());

        let target = classifier.find_active_local_target().await.expect("target");
        assert_eq!(target.speaker.name, "Living Room");
        assert_eq!(target.kind, StreamKind::VirtualLineIn);
        // The scan stops at the first match.
        assert_eq!(sonos.transport_queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unreachable_speakers_are_skipped() {
        let sonos = Arc::new(MockSonos::new(vec![
            MockSpeaker::unreachable("Garage", "10.0.0.9"),
            MockSpeaker::playing("Den", "10.0.0.5", "x-rincon-queue:RINCON_X#0", SPOTIFY_DIDL),
        ]));
        let classifier = DeviceClassifier::new(sonos);

        let target = classifier.find_active_local_target().await.expect("target");
        assert_eq!(target.speaker.ip, "10.0.0.5");
        assert_eq!(target.kind, StreamKind::MetadataMarker);
    }

    #[tokio::test]
    async fn position_failure_skips_speaker() {
        let mut broken = MockSpeaker::playing("Patio", "10.0.0.6", NATIVE_URI, "");
        broken.position_fails = true;
        let sonos = Arc::new(MockSonos::new(vec![
            broken,
            MockSpeaker::playing("Hall", "10.0.0.7", NATIVE_URI, ""),
        ]));

        let target = DeviceClassifier::new(sonos)
            .find_active_local_target()
            .await
            .expect("target");
        assert_eq!(target.speaker.name, "Hall");
    }

    #[tokio::test]
    async fn discovery_failure_means_no_target() {
        let sonos = Arc::new(MockSonos::new(vec![]));
        sonos.discovery_fails.store(true, Ordering::SeqCst);

        assert!(DeviceClassifier::new(sonos)
            .find_active_local_target()
            .await
            .is_none());
    }

    #[tokio::test]
    async fn nothing_playing_spotify_means_no_target() {
        let sonos = Arc::new(MockSonos::new(vec![
            MockSpeaker::paused("Kitchen", "10.0.0.1"),
            MockSpeaker::playing("Office", "10.0.0.2", "x-rincon-mp3radio://radio", ""),
        ]));

        assert!(DeviceClassifier::new(sonos)
            .find_active_local_target()
            .await
            .is_none());
    }
}
