//! Routes playback actions to Spotify, falling back to a Sonos speaker.
//!
//! Spotify Connect refuses remote control (HTTP 403) for some output
//! devices, most notably Sonos speakers playing through the native Spotify
//! integration. When that happens the dispatcher finds the speaker that is
//! rendering Spotify and performs the same action over UPnP instead.
//!
//! Every dispatch is a short sequential decision tree:
//!
//! ```text
//! status ─ none ──────────────────────────────▶ NoActivePlayback
//!    │
//! remote ─ ok ────────────────────────────────▶ Success(Remote)
//!    ├── 401 ─ refresh ─ err ─────────────────▶ RefreshFailed
//!    │            └─ retry ─ ok ──────────────▶ Success(Remote)
//!    │                  └─ err ───────────────▶ PostRefreshFailure
//!    ├── 403 ─ classify ─ none ───────────────▶ NoLocalFallback
//!    │            └─ local ─ ok ──────────────▶ Success(Local)
//!    │                  └─ err ───────────────▶ LocalActionFailed
//!    └── other ───────────────────────────────▶ RemoteError
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::error::ErrorCode;
use crate::services::classifier::{DeviceClassifier, LocalTarget};
use crate::sonos::soap::SoapResult;
use crate::sonos::traits::SonosClient;
use crate::spotify::error::SpotifyResult;
use crate::spotify::traits::{CredentialProvider, SpotifyPlayback};
use crate::spotify::types::TrackUri;

/// A logical playback action, independent of which backend performs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Pause,
    Skip,
    Enqueue(TrackUri),
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pause => write!(f, "pause"),
            Self::Skip => write!(f, "skip"),
            Self::Enqueue(uri) => write!(f, "enqueue {}", uri),
        }
    }
}

/// Where an action was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackTarget {
    Remote,
    Local(LocalTarget),
}

/// Why an action could not be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// Spotify reports no session to control.
    NoActivePlayback,
    /// The retry after a forced token refresh failed as well.
    PostRefreshFailure,
    /// The forced token refresh itself failed.
    RefreshFailed,
    /// Spotify refused the action and no speaker is playing Spotify.
    NoLocalFallback,
    /// The speaker found playing Spotify rejected the action.
    LocalActionFailed,
    /// Any other Spotify failure, including the status query.
    RemoteError,
}

impl ErrorCode for FailureReason {
    fn code(&self) -> &'static str {
        match self {
            Self::NoActivePlayback => "no_active_playback",
            Self::PostRefreshFailure => "post_refresh_failure",
            Self::RefreshFailed => "refresh_failed",
            Self::NoLocalFallback => "no_local_fallback",
            Self::LocalActionFailed => "local_action_failed",
            Self::RemoteError => "remote_error",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "camelCase")]
pub enum ActionResult {
    Success(PlaybackTarget),
    Failure(FailureReason),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Status glyph shown in chat replies.
    pub fn glyph(&self) -> &'static str {
        if self.is_success() {
            "✅"
        } else {
            "🚫"
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success(_) => None,
            Self::Failure(reason) => Some(*reason),
        }
    }
}

/// Chooses between Spotify and Sonos for each action.
pub struct PlaybackDispatcher {
    spotify: Arc<dyn SpotifyPlayback>,
    credentials: Arc<dyn CredentialProvider>,
    sonos: Arc<dyn SonosClient>,
    classifier: DeviceClassifier,
}

impl PlaybackDispatcher {
    pub fn new(
        spotify: Arc<dyn SpotifyPlayback>,
        credentials: Arc<dyn CredentialProvider>,
        sonos: Arc<dyn SonosClient>,
    ) -> Self {
        let classifier = DeviceClassifier::new(Arc::clone(&sonos));
        Self {
            spotify,
            credentials,
            sonos,
            classifier,
        }
    }

    /// Performs `action` on whichever backend can currently carry it out.
    ///
    /// At most one token refresh and one retry happen per call, and every
    /// outbound call is awaited before the next one starts.
    pub async fn dispatch(&self, action: ActionKind) -> ActionResult {
        let result = self.run(&action).await;
        match &result {
            ActionResult::Success(PlaybackTarget::Remote) => {
                log::info!("[Dispatch] {} done via Spotify", action)
            }
            ActionResult::Success(PlaybackTarget::Local(target)) => log::info!(
                "[Dispatch] {} done via Sonos speaker {} ({})",
                action,
                target.speaker.name,
                target.speaker.ip
            ),
            ActionResult::Failure(reason) => {
                log::warn!("[Dispatch] {} failed: {}", action, reason)
            }
        }
        result
    }

    async fn run(&self, action: &ActionKind) -> ActionResult {
        match self.spotify.current_playback().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::info!("[Dispatch] No active Spotify session");
                return ActionResult::Failure(FailureReason::NoActivePlayback);
            }
            Err(e) => {
                log::warn!("[Dispatch] Playback status query failed: {}", e);
                return ActionResult::Failure(FailureReason::RemoteError);
            }
        }

        let err = match self.remote(action).await {
            Ok(()) => return ActionResult::Success(PlaybackTarget::Remote),
            Err(e) => e,
        };

        if err.is_unauthorized() {
            log::info!("[Dispatch] Spotify returned 401, forcing token refresh");
            if let Err(e) = self.credentials.refresh(true).await {
                log::error!("[Dispatch] Token refresh failed: {}", e);
                return ActionResult::Failure(FailureReason::RefreshFailed);
            }
            return match self.remote(action).await {
                Ok(()) => ActionResult::Success(PlaybackTarget::Remote),
                Err(e) => {
                    log::warn!("[Dispatch] Retry after refresh failed: {}", e);
                    ActionResult::Failure(FailureReason::PostRefreshFailure)
                }
            };
        }

        if err.is_forbidden() {
            log::info!(
                "[Dispatch] Spotify refused {} (403), looking for a Sonos speaker",
                action
            );
            let Some(target) = self.classifier.find_active_local_target().await else {
                return ActionResult::Failure(FailureReason::NoLocalFallback);
            };
            return match self.local(action, &target.speaker.ip).await {
                Ok(()) => ActionResult::Success(PlaybackTarget::Local(target)),
                Err(e) => {
                    log::warn!(
                        "[Dispatch] {} on {} failed: {}",
                        action,
                        target.speaker.ip,
                        e
                    );
                    ActionResult::Failure(FailureReason::LocalActionFailed)
                }
            };
        }

        log::warn!("[Dispatch] Spotify call failed: {}", err);
        ActionResult::Failure(FailureReason::RemoteError)
    }

    async fn remote(&self, action: &ActionKind) -> SpotifyResult<()> {
        match action {
            ActionKind::Pause => self.spotify.pause().await,
            ActionKind::Skip => self.spotify.next_track().await,
            ActionKind::Enqueue(uri) => self.spotify.add_to_queue(uri).await,
        }
    }

    async fn local(&self, action: &ActionKind, ip: &str) -> SoapResult<()> {
        match action {
            ActionKind::Pause => self.sonos.pause(ip).await,
            ActionKind::Skip => self.sonos.next(ip).await,
            ActionKind::Enqueue(uri) => {
                let position = self.sonos.add_uri_to_queue(ip, uri.as_str()).await?;
                log::debug!("[Dispatch] {} queued at position {} on {}", uri, position, ip);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::StreamKind;
    use crate::services::test_support::{MockCredentials, MockSonos, MockSpeaker, MockSpotify};
    use std::sync::atomic::Ordering;

    const NATIVE_URI: &str = "x-sonos-spotify:spotify%3atrack%3aabc?sid=9&flags=8224&sn=7";

    struct Harness {
        spotify: Arc<MockSpotify>,
        credentials: Arc<MockCredentials>,
        sonos: Arc<MockSonos>,
        dispatcher: PlaybackDispatcher,
    }

    fn harness(spotify: MockSpotify, speakers: Vec<MockSpeaker>) -> Harness {
        let spotify = Arc::new(spotify);
        let credentials = Arc::new(MockCredentials::new());
        let sonos = Arc::new(MockSonos::new(speakers));
        let dispatcher =
            PlaybackDispatcher::new(spotify.clone(), credentials.clone(), sonos.clone());
        Harness {
            spotify,
            credentials,
            sonos,
            dispatcher,
        }
    }

    fn native_speaker() -> MockSpeaker {
        MockSpeaker::playing("Living Room", "10.0.0.3", NATIVE_URI, "")
    }

    #[tokio::test]
    async fn no_session_invokes_neither_path() {
        let h = harness(MockSpotify::new(None), vec![native_speaker()]);

        let result = h.dispatcher.dispatch(ActionKind::Pause).await;

        assert_eq!(result, ActionResult::Failure(FailureReason::NoActivePlayback));
        assert_eq!(h.spotify.remote_calls(), 0);
        assert_eq!(h.sonos.discover_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.sonos.local_calls(), 0);
    }

    #[tokio::test]
    async fn status_error_is_remote_error() {
        let spotify = MockSpotify::active();
        spotify.status_fails.store(true, Ordering::SeqCst);
        let h = harness(spotify, vec![]);

        let result = h.dispatcher.dispatch(ActionKind::Skip).await;

        assert_eq!(result, ActionResult::Failure(FailureReason::RemoteError));
        assert_eq!(h.spotify.remote_calls(), 0);
    }

    #[tokio::test]
    async fn remote_pause_success_never_scans() {
        let h = harness(MockSpotify::active(), vec![native_speaker()]);

        let result = h.dispatcher.dispatch(ActionKind::Pause).await;

        assert_eq!(result, ActionResult::Success(PlaybackTarget::Remote));
        assert_eq!(result.glyph(), "✅");
        assert_eq!(h.spotify.pause_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.sonos.discover_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.credentials.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unauthorized_refreshes_once_and_retries() {
        let spotify = MockSpotify::active();
        spotify.script(&[Some(401), None]);
        let h = harness(spotify, vec![]);

        let result = h.dispatcher.dispatch(ActionKind::Skip).await;

        assert_eq!(result, ActionResult::Success(PlaybackTarget::Remote));
        assert_eq!(h.credentials.forced_refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(h.spotify.next_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unauthorized_twice_is_post_refresh_failure_without_local() {
        let spotify = MockSpotify::active();
        // The retry is refused with 403, which must not reach the speakers.
        spotify.script(&[Some(401), Some(403)]);
        let h = harness(spotify, vec![native_speaker()]);

        let result = h.dispatcher.dispatch(ActionKind::Pause).await;

        assert_eq!(result, ActionResult::Failure(FailureReason::PostRefreshFailure));
        assert_eq!(h.credentials.forced_refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(h.spotify.pause_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.sonos.discover_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.sonos.local_calls(), 0);
    }

    #[tokio::test]
    async fn refresh_failure_skips_retry() {
        let spotify = MockSpotify::active();
        spotify.script(&[Some(401)]);
        let h = harness(spotify, vec![]);
        h.credentials.refresh_fails.store(true, Ordering::SeqCst);

        let result = h.dispatcher.dispatch(ActionKind::Pause).await;

        assert_eq!(result, ActionResult::Failure(FailureReason::RefreshFailed));
        assert_eq!(h.spotify.pause_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forbidden_without_speaker_is_no_local_fallback() {
        let spotify = MockSpotify::active();
        spotify.script(&[Some(403)]);
        let h = harness(spotify, vec![MockSpeaker::paused("Kitchen", "10.0.0.1")]);

        let result = h.dispatcher.dispatch(ActionKind::Pause).await;

        assert_eq!(result, ActionResult::Failure(FailureReason::NoLocalFallback));
        assert_eq!(result.glyph(), "🚫");
        assert_eq!(h.sonos.local_calls(), 0);
        assert_eq!(h.credentials.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn forbidden_pause_falls_back_to_native_speaker() {
        let spotify = MockSpotify::active();
        spotify.script(&[Some(403)]);
        let h = harness(
            spotify,
            vec![MockSpeaker::paused("Kitchen", "10.0.0.1"), native_speaker()],
        );

        let result = h.dispatcher.dispatch(ActionKind::Pause).await;

        let ActionResult::Success(PlaybackTarget::Local(target)) = result else {
            panic!("expected local success, got {:?}", result);
        };
        assert_eq!(target.speaker.ip, "10.0.0.3");
        assert_eq!(target.kind, StreamKind::NativeStream);
        assert_eq!(*h.sonos.paused.lock(), vec!["10.0.0.3".to_string()]);
        assert_eq!(h.sonos.local_calls(), 1);
        assert_eq!(h.spotify.pause_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forbidden_enqueue_uses_sonos_queue() {
        let spotify = MockSpotify::active();
        spotify.script(&[Some(403)]);
        let h = harness(spotify, vec![native_speaker()]);
        let uri = TrackUri::parse("spotify:track:4uLU6hMCjMI75M1A2tKUQC").unwrap();

        let result = h.dispatcher.dispatch(ActionKind::Enqueue(uri)).await;

        assert!(result.is_success());
        assert_eq!(
            *h.sonos.enqueued.lock(),
            vec![(
                "10.0.0.3".to_string(),
                "spotify:track:4uLU6hMCjMI75M1A2tKUQC".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn local_failure_is_reported_once() {
        let spotify = MockSpotify::active();
        spotify.script(&[Some(403)]);
        let h = harness(spotify, vec![native_speaker()]);
        h.sonos.local_fails.store(true, Ordering::SeqCst);

        let result = h.dispatcher.dispatch(ActionKind::Skip).await;

        assert_eq!(result, ActionResult::Failure(FailureReason::LocalActionFailed));
        assert_eq!(h.sonos.local_calls(), 1);
    }

    #[tokio::test]
    async fn other_status_is_remote_error() {
        let spotify = MockSpotify::active();
        spotify.script(&[Some(404)]);
        let h = harness(spotify, vec![native_speaker()]);

        let result = h.dispatcher.dispatch(ActionKind::Skip).await;

        assert_eq!(result, ActionResult::Failure(FailureReason::RemoteError));
        assert_eq!(h.sonos.discover_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.credentials.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failure_codes() {
        assert_eq!(FailureReason::NoActivePlayback.code(), "no_active_playback");
        assert_eq!(FailureReason::PostRefreshFailure.code(), "post_refresh_failure");
        assert_eq!(
            ActionResult::Failure(FailureReason::NoLocalFallback).failure_reason(),
            Some(FailureReason::NoLocalFallback)
        );
    }
}
