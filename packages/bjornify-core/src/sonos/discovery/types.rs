//! Types shared by the SSDP search and the discovery coordinator.

use serde::Serialize;
use thiserror::Error;

/// Which SSDP transport found a speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryMethod {
    /// M-SEARCH to 239.255.255.250:1900
    SsdpMulticast,
    /// M-SEARCH to the per-interface and limited broadcast addresses
    SsdpBroadcast,
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SsdpMulticast => write!(f, "SSDP multicast"),
            Self::SsdpBroadcast => write!(f, "SSDP broadcast"),
        }
    }
}

/// Errors that can occur during discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to create or bind the UDP socket.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No usable network interfaces found.
    #[error("no usable network interfaces found")]
    NoInterfaces,

    /// Every enabled search method failed.
    #[error("all discovery methods failed: {0:?}")]
    AllMethodsFailed(Vec<(DiscoveryMethod, String)>),
}

/// Convenient Result alias for speaker discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A Sonos speaker found on the local network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Speaker {
    /// IPv4 address of the speaker.
    pub ip: String,
    /// Room name as shown in the Sonos app.
    pub name: String,
    /// Canonical RINCON_xxx UUID.
    pub uuid: String,
    #[serde(rename = "modelName", skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// Models that bridge the network but cannot render audio.
const INFRASTRUCTURE_MODELS: &[&str] = &["boost", "bridge"];

impl Speaker {
    /// Returns true for Boost/Bridge devices, which never play anything.
    pub fn is_infrastructure_device(&self) -> bool {
        self.model_name.as_deref().is_some_and(|m| {
            let model = m.to_lowercase();
            INFRASTRUCTURE_MODELS.iter().any(|infra| model.contains(infra))
        })
    }
}

/// Raw SSDP hit, before the device description has been fetched.
#[derive(Debug, Clone)]
pub struct DiscoveredSpeaker {
    pub ip: String,
    pub uuid: String,
    /// LOCATION header, if the response carried one.
    pub location: Option<String>,
    pub method: DiscoveryMethod,
}

/// Strips the decorations UPnP puts around a Sonos UUID.
///
/// `uuid:RINCON_X::urn:...`, `RINCON_X01400:58` and `RINCON_X_MR` all
/// normalize to the bare `RINCON_X...` identifier.
pub fn normalize_uuid(raw: &str) -> String {
    let mut uuid = raw.strip_prefix("uuid:").unwrap_or(raw);

    if let Some(idx) = uuid.find("::") {
        uuid = &uuid[..idx];
    }

    if uuid.starts_with("RINCON_") {
        if let Some((head, tail)) = uuid.rsplit_once(':') {
            if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                uuid = head;
            }
        }
    }

    while let Some(stripped) = ["_MS", "_MR", "_LR"]
        .iter()
        .find_map(|suffix| uuid.strip_suffix(suffix))
    {
        uuid = stripped;
    }

    uuid.to_string()
}

/// Fields read from `device_description.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// UDN, still carrying its `uuid:` prefix.
    pub uuid: String,
    /// `roomName` when present, otherwise `friendlyName`.
    pub room_name: String,
    pub model_name: Option<String>,
}

/// Interface name prefixes that never lead to a Sonos household.
const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

pub fn is_virtual_interface(name: &str) -> bool {
    let name = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}
