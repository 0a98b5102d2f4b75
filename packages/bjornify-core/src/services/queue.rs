//! The `add` flow: resolve a track, queue it, or start playback.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ErrorCode;
use crate::services::dispatcher::{
    ActionKind, ActionResult, FailureReason, PlaybackDispatcher, PlaybackTarget,
};
use crate::spotify::error::SpotifyResult;
use crate::spotify::traits::SpotifyCatalog;
use crate::spotify::types::{Device, TrackUri};

/// What happened to an `add` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueOutcome {
    /// Appended to the queue of the active session or speaker.
    Queued { track: String, target: PlaybackTarget },
    /// No session was active, so playback was started with the track.
    Started { track: String, device: String },
    NoResults,
    NoDevices,
    /// Machine-readable code of whatever went wrong.
    Failed { code: &'static str },
}

impl QueueOutcome {
    /// Chat reply for this outcome.
    pub fn reply(&self) -> String {
        match self {
            Self::Queued { track, .. } => format!("Queued: {}", track),
            Self::Started { track, .. } => format!("Started playback: {}", track),
            Self::NoResults => "No results".to_string(),
            Self::NoDevices => "No available devices to start playback.".to_string(),
            Self::Failed { .. } => "Failed to add track to queue.".to_string(),
        }
    }
}

/// A track ready to be queued, with the label shown to users.
struct ResolvedTrack {
    uri: TrackUri,
    label: String,
}

/// Adds tracks by URI, share link, or free-text search.
pub struct TrackQueue {
    catalog: Arc<dyn SpotifyCatalog>,
    dispatcher: Arc<PlaybackDispatcher>,
    preferred_device: String,
}

impl TrackQueue {
    pub fn new(
        catalog: Arc<dyn SpotifyCatalog>,
        dispatcher: Arc<PlaybackDispatcher>,
        preferred_device: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            dispatcher,
            preferred_device: preferred_device.into(),
        }
    }

    pub async fn add(&self, query: &str) -> QueueOutcome {
        let track = match self.resolve(query).await {
            Ok(Some(track)) => track,
            Ok(None) => {
                log::info!("[Queue] No results for {:?}", query);
                return QueueOutcome::NoResults;
            }
            Err(e) => {
                log::error!("[Queue] Search for {:?} failed: {}", query, e);
                return QueueOutcome::Failed { code: e.code() };
            }
        };

        match self
            .dispatcher
            .dispatch(ActionKind::Enqueue(track.uri.clone()))
            .await
        {
            ActionResult::Success(target) => QueueOutcome::Queued {
                track: track.label,
                target,
            },
            ActionResult::Failure(FailureReason::NoActivePlayback) => self.start(track).await,
            ActionResult::Failure(reason) => QueueOutcome::Failed { code: reason.code() },
        }
    }

    async fn resolve(&self, query: &str) -> SpotifyResult<Option<ResolvedTrack>> {
        if let Some(uri) = TrackUri::parse(query) {
            return Ok(Some(ResolvedTrack {
                label: uri.to_string(),
                uri,
            }));
        }

        let tracks = self.catalog.search_tracks(query, 1).await?;
        Ok(tracks.into_iter().next().and_then(|track| {
            let uri = TrackUri::parse(&track.uri)?;
            log::debug!("[Queue] Top result: {} ({})", track.display_name(), uri);
            Some(ResolvedTrack {
                label: track.display_name(),
                uri,
            })
        }))
    }

    /// Starts playback on the preferred device, else the first one listed.
    async fn start(&self, track: ResolvedTrack) -> QueueOutcome {
        let devices = match self.catalog.devices().await {
            Ok(devices) => devices,
            Err(e) => {
                log::error!("[Queue] Listing devices failed: {}", e);
                return QueueOutcome::Failed { code: e.code() };
            }
        };

        let Some((device_id, device_name)) = pick_device(&devices, &self.preferred_device) else {
            log::warn!("[Queue] No available devices to start playback");
            return QueueOutcome::NoDevices;
        };

        match self
            .catalog
            .start_playback(device_id, std::slice::from_ref(&track.uri))
            .await
        {
            Ok(()) => {
                log::info!("[Queue] Started {} on {}", track.label, device_name);
                QueueOutcome::Started {
                    track: track.label,
                    device: device_name.to_string(),
                }
            }
            Err(e) => {
                log::error!("[Queue] Starting playback on {} failed: {}", device_name, e);
                QueueOutcome::Failed { code: e.code() }
            }
        }
    }
}

/// Returns `(id, name)` of the device to start playback on.
///
/// Devices without an id (restricted web players) cannot be targeted.
fn pick_device<'a>(devices: &'a [Device], preferred: &str) -> Option<(&'a str, &'a str)> {
    let usable = || {
        devices
            .iter()
            .filter_map(|d| d.id.as_deref().map(|id| (id, d.name.as_str())))
    };
    usable()
        .find(|(_, name)| *name == preferred)
        .or_else(|| usable().next())
}
