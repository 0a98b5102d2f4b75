//! SSDP search for Sonos ZonePlayers.
//!
//! One socket per usable IPv4 interface sends the M-SEARCH and also receives
//! the replies, because speakers answer unicast to the sending port. The
//! broadcast variant exists for networks where multicast is filtered.

use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use super::types::{is_virtual_interface, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod};

const MULTICAST_ADDR: &str = "239.255.255.250:1900";
const LIMITED_BROADCAST_ADDR: &str = "255.255.255.255:1900";
const SONOS_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// Timing knobs for one SSDP search.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Number of M-SEARCH packets per target address.
    pub send_count: u32,
    /// Gap between repeated M-SEARCH packets.
    pub retry_delay: Duration,
    /// How long to collect replies.
    pub discovery_timeout: Duration,
    /// MX header value in seconds.
    pub mx_value: u64,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            send_count: 3,
            retry_delay: Duration::from_millis(800),
            discovery_timeout: Duration::from_secs(3),
            mx_value: 1,
        }
    }
}

/// The HOST header names the multicast group even for broadcast sends.
fn build_msearch_message(mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        mx, SONOS_SEARCH_TARGET
    )
}

/// Returns the value of an HTTP-style header, matching the name case-insensitively.
fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

/// Parses one M-SEARCH reply. Anything without a RINCON USN is ignored.
fn parse_ssdp_response(
    response: &str,
    src_ip: &str,
    method: DiscoveryMethod,
) -> Option<DiscoveredSpeaker> {
    let usn = header_value(response, "usn")?;
    let uuid_start = usn.to_ascii_lowercase().find("uuid:")? + "uuid:".len();
    let uuid = usn[uuid_start..].split("::").next().unwrap_or_default();

    // Sonos UUIDs are always upper-case RINCON_.
    if !uuid.starts_with("RINCON_") {
        return None;
    }

    Some(DiscoveredSpeaker {
        ip: src_ip.to_string(),
        uuid: uuid.to_string(),
        location: header_value(response, "location").map(str::to_string),
        method,
    })
}

#[derive(Debug, Clone)]
struct Interface {
    name: String,
    ip: Ipv4Addr,
    broadcast: Ipv4Addr,
}

/// Lists non-loopback, non-virtual IPv4 interfaces.
///
/// The netmask is not available here, so the directed broadcast address
/// assumes a /24.
fn usable_interfaces() -> Vec<Interface> {
    let interfaces = match list_afinet_netifas() {
        Ok(list) => list,
        Err(e) => {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            return Vec::new();
        }
    };

    interfaces
        .into_iter()
        .filter(|(name, _)| !is_virtual_interface(name))
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(ip) if !ip.is_loopback() => {
                let [a, b, c, _] = ip.octets();
                Some(Interface {
                    name,
                    ip,
                    broadcast: Ipv4Addr::new(a, b, c, 255),
                })
            }
            _ => None,
        })
        .collect()
}

fn bind_socket(iface_ip: Ipv4Addr, broadcast: bool) -> Result<UdpSocket, DiscoveryError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] SO_REUSEADDR failed on {}: {}", iface_ip, e);
    }
    // UPnP 1.0 asks for a TTL of 4 on SSDP multicast.
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[Discovery] Multicast TTL failed on {}: {}", iface_ip, e);
    }
    if broadcast {
        if let Err(e) = socket.set_broadcast(true) {
            log::warn!("[Discovery] SO_BROADCAST failed on {}: {}", iface_ip, e);
        }
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&SocketAddr::new(IpAddr::V4(iface_ip), 0).into())
        .map_err(DiscoveryError::SocketBind)?;

    UdpSocket::from_std(socket.into()).map_err(DiscoveryError::SocketBind)
}

/// Searches over SSDP multicast.
pub async fn discover_multicast(
    config: &SsdpConfig,
) -> Result<Vec<DiscoveredSpeaker>, DiscoveryError> {
    search(config, DiscoveryMethod::SsdpMulticast).await
}

/// Searches over directed and limited broadcast.
pub async fn discover_broadcast(
    config: &SsdpConfig,
) -> Result<Vec<DiscoveredSpeaker>, DiscoveryError> {
    search(config, DiscoveryMethod::SsdpBroadcast).await
}

async fn search(
    config: &SsdpConfig,
    method: DiscoveryMethod,
) -> Result<Vec<DiscoveredSpeaker>, DiscoveryError> {
    let broadcast = method == DiscoveryMethod::SsdpBroadcast;

    let sockets: Vec<(Interface, UdpSocket)> = usable_interfaces()
        .into_iter()
        .filter_map(|iface| match bind_socket(iface.ip, broadcast) {
            Ok(socket) => Some((iface, socket)),
            Err(e) => {
                log::warn!("[{}] No socket for {} ({}): {}", method, iface.name, iface.ip, e);
                None
            }
        })
        .collect();

    if sockets.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    log::debug!(
        "[{}] Searching on {} interface(s) for {:?}",
        method,
        sockets.len(),
        config.discovery_timeout
    );

    let message = build_msearch_message(config.mx_value);
    let per_interface = sockets.iter().map(|(iface, socket)| {
        let targets = if broadcast {
            vec![format!("{}:1900", iface.broadcast), LIMITED_BROADCAST_ADDR.to_string()]
        } else {
            vec![MULTICAST_ADDR.to_string()]
        };
        search_interface(config, method, iface, socket, targets, message.as_bytes())
    });

    let mut found: Vec<DiscoveredSpeaker> = futures::future::join_all(per_interface)
        .await
        .into_iter()
        .flatten()
        .collect();

    let mut seen = HashSet::new();
    found.retain(|s| seen.insert(s.uuid.clone()));

    log::debug!("[{}] {} unique speaker(s) answered", method, found.len());
    Ok(found)
}

/// Sends the M-SEARCH burst on one socket while collecting replies on it.
async fn search_interface(
    config: &SsdpConfig,
    method: DiscoveryMethod,
    iface: &Interface,
    socket: &UdpSocket,
    targets: Vec<String>,
    message: &[u8],
) -> Vec<DiscoveredSpeaker> {
    let send = async {
        for attempt in 0..config.send_count {
            if attempt > 0 {
                tokio::time::sleep(config.retry_delay).await;
            }
            for target in &targets {
                if let Err(e) = socket.send_to(message, target.as_str()).await {
                    log::warn!(
                        "[{}] M-SEARCH to {} via {} failed: {}",
                        method,
                        target,
                        iface.name,
                        e
                    );
                }
            }
        }
    };

    let recv = async {
        let mut found = Vec::new();
        let mut buf = [0u8; 2048];
        let start = Instant::now();

        loop {
            let remaining = config.discovery_timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, src))) => {
                    let response = String::from_utf8_lossy(&buf[..len]);
                    if let Some(speaker) =
                        parse_ssdp_response(&response, &src.ip().to_string(), method)
                    {
                        log::debug!("[{}] {} answered as {}", method, speaker.ip, speaker.uuid);
                        found.push(speaker);
                    }
                }
                Ok(Err(e)) => log::warn!("[{}] recv on {} failed: {}", method, iface.name, e),
                Err(_) => break,
            }
        }
        found
    };

    let ((), found) = tokio::join!(send, recv);
    found
}
