//! Sonos speaker discovery.
//!
//! ```text
//! DiscoveryCoordinator
//! ├── SSDP multicast (239.255.255.250:1900)
//! └── SSDP broadcast (directed per-interface + 255.255.255.255)
//! ```
//!
//! Both searches run in parallel; hits are merged by canonical UUID and each
//! speaker's device description is fetched for its room name.

pub mod ssdp;
pub mod types;

pub use types::{
    normalize_uuid, DeviceInfo, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod,
    DiscoveryResult, Speaker,
};

use futures::stream::{self, StreamExt};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use self::ssdp::SsdpConfig;
use crate::sonos::utils::{build_sonos_url, extract_ip_from_location};

/// Configuration for the discovery coordinator.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub ssdp_multicast_enabled: bool,
    pub ssdp_broadcast_enabled: bool,
    pub ssdp: SsdpConfig,
    /// Timeout for each device description fetch.
    pub description_fetch_timeout: Duration,
    /// Maximum concurrent device description fetches.
    pub max_concurrent_fetches: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ssdp_multicast_enabled: true,
            ssdp_broadcast_enabled: true,
            ssdp: SsdpConfig::default(),
            description_fetch_timeout: Duration::from_secs(2),
            max_concurrent_fetches: 8,
        }
    }
}

/// Runs the SSDP searches and resolves the hits into [`Speaker`]s.
pub struct DiscoveryCoordinator {
    config: DiscoveryConfig,
    http_client: Client,
}

impl DiscoveryCoordinator {
    pub fn new(config: DiscoveryConfig) -> Self {
        let http_client = Client::builder()
            .timeout(config.description_fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!(
                    "[Discovery] Failed to build HTTP client with custom timeout: {}. Using default.",
                    e
                );
                Client::default()
            });

        Self {
            config,
            http_client,
        }
    }

    /// Discovers playable speakers, ordered by UUID.
    ///
    /// Succeeds with an empty list when the searches ran but nobody answered;
    /// fails only when every enabled search method errored.
    pub async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        log::info!(
            "[Discovery] Starting discovery (multicast={}, broadcast={})",
            self.config.ssdp_multicast_enabled,
            self.config.ssdp_broadcast_enabled
        );

        let (multicast, broadcast) = tokio::join!(
            async {
                if self.config.ssdp_multicast_enabled {
                    Some(ssdp::discover_multicast(&self.config.ssdp).await)
                } else {
                    None
                }
            },
            async {
                if self.config.ssdp_broadcast_enabled {
                    Some(ssdp::discover_broadcast(&self.config.ssdp).await)
                } else {
                    None
                }
            }
        );

        let mut found = Vec::new();
        let mut failures = Vec::new();
        for (method, result) in [
            (DiscoveryMethod::SsdpMulticast, multicast),
            (DiscoveryMethod::SsdpBroadcast, broadcast),
        ] {
            match result {
                Some(Ok(speakers)) => {
                    log::debug!("[Discovery] {} found {} speaker(s)", method, speakers.len());
                    found.extend(speakers);
                }
                Some(Err(e)) => {
                    log::warn!("[Discovery] {} failed: {}", method, e);
                    failures.push((method, e.to_string()));
                }
                None => {}
            }
        }

        if found.is_empty() && !failures.is_empty() {
            return Err(DiscoveryError::AllMethodsFailed(failures));
        }

        let merged = merge_discovered(found);
        let mut speakers: Vec<Speaker> = self
            .resolve_speakers(merged)
            .await
            .into_iter()
            .filter(|s| {
                let playable = !s.is_infrastructure_device();
                if !playable {
                    log::debug!("[Discovery] Skipping infrastructure device {}", s.name);
                }
                playable
            })
            .collect();
        speakers.sort_by(|a, b| a.uuid.cmp(&b.uuid));

        log::info!("[Discovery] {} speaker(s) available", speakers.len());
        Ok(speakers)
    }

    /// Fetches device descriptions concurrently, falling back to the IP as name.
    async fn resolve_speakers(&self, discovered: Vec<DiscoveredSpeaker>) -> Vec<Speaker> {
        stream::iter(discovered)
            .map(|speaker| async move {
                let info = self.fetch_device_info(&speaker).await;
                let ip = speaker
                    .location
                    .as_deref()
                    .and_then(extract_ip_from_location)
                    .unwrap_or_else(|| speaker.ip.clone());

                match info {
                    Some(info) => Speaker {
                        ip,
                        name: info.room_name,
                        uuid: normalize_uuid(&info.uuid),
                        model_name: info.model_name,
                    },
                    None => Speaker {
                        name: format!("Sonos ({})", ip),
                        ip,
                        uuid: speaker.uuid,
                        model_name: None,
                    },
                }
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await
    }

    /// Tries the SSDP LOCATION first, then the standard port.
    async fn fetch_device_info(&self, speaker: &DiscoveredSpeaker) -> Option<DeviceInfo> {
        if let Some(location) = &speaker.location {
            if let Some(info) = fetch_device_description(&self.http_client, location).await {
                return Some(info);
            }
        }
        let url = build_sonos_url(&speaker.ip, "/xml/device_description.xml");
        fetch_device_description(&self.http_client, &url).await
    }
}

/// Collapses hits for the same speaker, keeping the first LOCATION seen.
fn merge_discovered(discovered: Vec<DiscoveredSpeaker>) -> Vec<DiscoveredSpeaker> {
    let mut by_uuid: HashMap<String, DiscoveredSpeaker> = HashMap::new();

    for mut speaker in discovered {
        let uuid = normalize_uuid(&speaker.uuid);
        match by_uuid.get_mut(&uuid) {
            Some(existing) => {
                if existing.location.is_none() {
                    existing.location = speaker.location.take();
                }
            }
            None => {
                speaker.uuid = uuid.clone();
                by_uuid.insert(uuid, speaker);
            }
        }
    }

    by_uuid.into_values().collect()
}

async fn fetch_device_description(client: &Client, url: &str) -> Option<DeviceInfo> {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            log::debug!("[Discovery] Description fetch from {} failed: {}", url, e);
            return None;
        }
    };
    let body = response.text().await.ok()?;
    parse_device_description(&body)
}

/// Parses `device_description.xml`; UDN and a name are required.
fn parse_device_description(xml: &str) -> Option<DeviceInfo> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut uuid = None;
    let mut room_name = None;
    let mut friendly_name = None;
    let mut model_name = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let slot = match e.local_name().as_ref() {
                    // Embedded MediaRenderer/MediaServer devices repeat these; keep the root's.
                    b"UDN" => &mut uuid,
                    b"roomName" => &mut room_name,
                    b"friendlyName" => &mut friendly_name,
                    b"modelName" => &mut model_name,
                    _ => {
                        buf.clear();
                        continue;
                    }
                };
                if slot.is_none() {
                    *slot = reader.read_text(e.name()).ok().map(|t| t.trim().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::trace!("[Discovery] Bad device description: {:?}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Some(DeviceInfo {
        uuid: uuid?,
        room_name: room_name.or(friendly_name)?,
        model_name,
    })
}
