//! Scripted Spotify and Sonos collaborators shared by the service tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::sonos::discovery::{DiscoveryError, DiscoveryResult, Speaker};
use crate::sonos::soap::{SoapError, SoapResult};
use crate::sonos::traits::{SonosDiscovery, SonosPlayback};
use crate::sonos::types::{PositionInfo, TransportInfo, TransportState};
use crate::spotify::auth::Credential;
use crate::spotify::error::{AuthError, SpotifyError, SpotifyResult};
use crate::spotify::traits::{CredentialProvider, SpotifyCatalog, SpotifyPlayback};
use crate::spotify::types::{
    Album, Artist, CurrentPlayback, Device, Image, PlaybackContext, Track, TrackUri,
};

// ─────────────────────────────────────────────────────────────────────────────
// Spotify
// ─────────────────────────────────────────────────────────────────────────────

pub fn status_error(status: u16) -> SpotifyError {
    SpotifyError::Status {
        status,
        message: format!("status {}", status),
    }
}

pub fn track(uri: &str, artist: &str, name: &str) -> Track {
    Track {
        uri: uri.to_string(),
        name: name.to_string(),
        artists: vec![Artist {
            name: artist.to_string(),
        }],
        album: Some(Album {
            name: "Greatest Hits".to_string(),
            images: vec![Image {
                url: "https://i.scdn.co/image/cover".to_string(),
                height: Some(640),
                width: Some(640),
            }],
        }),
        duration_ms: 200_000,
    }
}

pub fn device(id: Option<&str>, name: &str) -> Device {
    Device {
        id: id.map(str::to_string),
        name: name.to_string(),
        device_type: "Speaker".to_string(),
        is_active: false,
        is_restricted: false,
        volume_percent: None,
    }
}

/// An active session on `device_name` playing a 3:20 track at 2:05.
pub fn active_playback(device_name: &str) -> CurrentPlayback {
    CurrentPlayback {
        device: Device {
            is_active: true,
            ..device(Some("dev-1"), device_name)
        },
        is_playing: true,
        progress_ms: Some(125_000),
        item: Some(track("spotify:track:abc", "Rick Astley", "Never Gonna Give You Up")),
        context: Some(PlaybackContext {
            context_type: "playlist".to_string(),
            uri: "spotify:playlist:xyz".to_string(),
        }),
    }
}

/// Scripted Spotify Web API.
///
/// Remote actions pop their outcome from `remote_outcomes`; an empty script
/// means success. `None` is success, `Some(status)` an HTTP error.
pub struct MockSpotify {
    pub playback: Mutex<Option<CurrentPlayback>>,
    pub status_fails: AtomicBool,
    pub remote_outcomes: Mutex<VecDeque<Option<u16>>>,
    pub search_results: Mutex<Vec<Track>>,
    pub devices: Mutex<Vec<Device>>,

    pub status_calls: AtomicUsize,
    pub pause_calls: AtomicUsize,
    pub next_calls: AtomicUsize,
    pub queue_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub started: Mutex<Vec<(String, Vec<TrackUri>)>>,
    pub queued: Mutex<Vec<TrackUri>>,
}

impl MockSpotify {
    pub fn new(playback: Option<CurrentPlayback>) -> Self {
        Self {
            playback: Mutex::new(playback),
            status_fails: AtomicBool::new(false),
            remote_outcomes: Mutex::new(VecDeque::new()),
            search_results: Mutex::new(Vec::new()),
            devices: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            pause_calls: AtomicUsize::new(0),
            next_calls: AtomicUsize::new(0),
            queue_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            queued: Mutex::new(Vec::new()),
        }
    }

    pub fn active() -> Self {
        Self::new(Some(active_playback("Living Room")))
    }

    /// Queues outcomes for the next remote actions, in order.
    pub fn script(&self, outcomes: &[Option<u16>]) {
        self.remote_outcomes.lock().extend(outcomes.iter().copied());
    }

    pub fn remote_calls(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
            + self.next_calls.load(Ordering::SeqCst)
            + self.queue_calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> SpotifyResult<()> {
        match self.remote_outcomes.lock().pop_front().flatten() {
            Some(status) => Err(status_error(status)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SpotifyPlayback for MockSpotify {
    async fn current_playback(&self) -> SpotifyResult<Option<CurrentPlayback>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.status_fails.load(Ordering::SeqCst) {
            return Err(status_error(502));
        }
        Ok(self.playback.lock().clone())
    }

    async fn pause(&self) -> SpotifyResult<()> {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.next_outcome()
    }

    async fn next_track(&self) -> SpotifyResult<()> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        self.next_outcome()
    }

    async fn add_to_queue(&self, uri: &TrackUri) -> SpotifyResult<()> {
        self.queue_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.next_outcome();
        if outcome.is_ok() {
            self.queued.lock().push(uri.clone());
        }
        outcome
    }
}

#[async_trait]
impl SpotifyCatalog for MockSpotify {
    async fn search_tracks(&self, _query: &str, limit: u32) -> SpotifyResult<Vec<Track>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .search_results
            .lock()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn devices(&self) -> SpotifyResult<Vec<Device>> {
        Ok(self.devices.lock().clone())
    }

    async fn start_playback(&self, device_id: &str, uris: &[TrackUri]) -> SpotifyResult<()> {
        self.started
            .lock()
            .push((device_id.to_string(), uris.to_vec()));
        Ok(())
    }
}

/// Credential provider counting refresh requests.
pub struct MockCredentials {
    pub refresh_fails: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub forced_refreshes: AtomicUsize,
}

impl MockCredentials {
    pub fn new() -> Self {
        Self {
            refresh_fails: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            forced_refreshes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CredentialProvider for MockCredentials {
    fn get(&self) -> Arc<Credential> {
        Arc::new(Credential {
            access_token: "access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh".to_string()),
            scope: None,
            expires_at: i64::MAX,
        })
    }

    async fn refresh(&self, force: bool) -> Result<bool, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if force {
            self.forced_refreshes.fetch_add(1, Ordering::SeqCst);
        }
        if self.refresh_fails.load(Ordering::SeqCst) {
            return Err(AuthError::Rejected {
                status: 400,
                message: "invalid_grant".to_string(),
            });
        }
        Ok(force)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sonos
// ─────────────────────────────────────────────────────────────────────────────

/// One scripted speaker.
#[derive(Clone)]
pub struct MockSpeaker {
    pub speaker: Speaker,
    /// `None` makes every query to this speaker fail.
    pub state: Option<TransportState>,
    pub position: PositionInfo,
    pub position_fails: bool,
}

impl MockSpeaker {
    fn base(name: &str, ip: &str, state: Option<TransportState>) -> Self {
        Self {
            speaker: Speaker {
                ip: ip.to_string(),
                name: name.to_string(),
                uuid: format!("RINCON_{}01400", ip.replace('.', "")),
                model_name: Some("Sonos One".to_string()),
            },
            state,
            position: PositionInfo::default(),
            position_fails: false,
        }
    }

    pub fn playing(name: &str, ip: &str, track_uri: &str, metadata: &str) -> Self {
        let mut speaker = Self::base(name, ip, Some(TransportState::Playing));
        speaker.position.track_uri = track_uri.to_string();
        speaker.position.track_metadata = metadata.to_string();
        speaker
    }

    pub fn paused(name: &str, ip: &str) -> Self {
        Self::base(name, ip, Some(TransportState::Paused))
    }

    pub fn unreachable(name: &str, ip: &str) -> Self {
        Self::base(name, ip, None)
    }
}

/// Scripted Sonos network.
pub struct MockSonos {
    pub speakers: Vec<MockSpeaker>,
    pub discovery_fails: AtomicBool,
    pub local_fails: AtomicBool,

    pub discover_calls: AtomicUsize,
    pub transport_queries: AtomicUsize,
    pub local_attempts: AtomicUsize,
    pub paused: Mutex<Vec<String>>,
    pub skipped: Mutex<Vec<String>>,
    pub enqueued: Mutex<Vec<(String, String)>>,
}

impl MockSonos {
    pub fn new(speakers: Vec<MockSpeaker>) -> Self {
        Self {
            speakers,
            discovery_fails: AtomicBool::new(false),
            local_fails: AtomicBool::new(false),
            discover_calls: AtomicUsize::new(0),
            transport_queries: AtomicUsize::new(0),
            local_attempts: AtomicUsize::new(0),
            paused: Mutex::new(Vec::new()),
            skipped: Mutex::new(Vec::new()),
            enqueued: Mutex::new(Vec::new()),
        }
    }

    /// Local actions attempted, successful or not.
    pub fn local_calls(&self) -> usize {
        self.local_attempts.load(Ordering::SeqCst)
    }

    fn find(&self, ip: &str) -> SoapResult<&MockSpeaker> {
        self.speakers
            .iter()
            .find(|s| s.speaker.ip == ip && s.state.is_some())
            .ok_or_else(|| SoapError::HttpStatus(503, "unreachable".to_string()))
    }

    fn local_outcome(&self, ip: &str) -> SoapResult<()> {
        self.local_attempts.fetch_add(1, Ordering::SeqCst);
        self.find(ip)?;
        if self.local_fails.load(Ordering::SeqCst) {
            return Err(SoapError::Fault {
                code: Some(800),
                message: "Action failed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SonosDiscovery for MockSonos {
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if self.discovery_fails.load(Ordering::SeqCst) {
            return Err(DiscoveryError::NoInterfaces);
        }
        Ok(self.speakers.iter().map(|s| s.speaker.clone()).collect())
    }
}

#[async_trait]
impl SonosPlayback for MockSonos {
    async fn get_transport_info(&self, ip: &str) -> SoapResult<TransportInfo> {
        self.transport_queries.fetch_add(1, Ordering::SeqCst);
        let speaker = self.find(ip)?;
        Ok(TransportInfo {
            state: speaker.state.unwrap_or(TransportState::Stopped),
            status: "OK".to_string(),
        })
    }

    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo> {
        let speaker = self.find(ip)?;
        if speaker.position_fails {
            return Err(SoapError::Parse);
        }
        Ok(speaker.position.clone())
    }

    async fn pause(&self, ip: &str) -> SoapResult<()> {
        self.local_outcome(ip)?;
        self.paused.lock().push(ip.to_string());
        Ok(())
    }

    async fn next(&self, ip: &str) -> SoapResult<()> {
        self.local_outcome(ip)?;
        self.skipped.lock().push(ip.to_string());
        Ok(())
    }

    async fn add_uri_to_queue(&self, ip: &str, spotify_uri: &str) -> SoapResult<u32> {
        self.local_outcome(ip)?;
        let mut enqueued = self.enqueued.lock();
        enqueued.push((ip.to_string(), spotify_uri.to_string()));
        Ok(enqueued.len() as u32)
    }
}
