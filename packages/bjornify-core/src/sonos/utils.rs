//! XML and URL helpers shared by the Sonos SOAP, DIDL and discovery code.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Default Sonos speaker control port.
pub const SONOS_PORT: u16 = 1400;

// ─────────────────────────────────────────────────────────────────────────────
// XML Parsing Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts text content from the first occurrence of an XML element.
///
/// Matches on the local name, so `<u:CurrentTransportState>` is found by
/// `"CurrentTransportState"`. HTML entities in the text are decoded, which
/// is what turns an escaped `TrackMetaData` payload back into DIDL-Lite.
///
/// # Example
/// ```ignore
/// let xml = r#"<u:CurrentSpeed>1</u:CurrentSpeed>"#;
/// assert_eq!(extract_xml_text(xml, "CurrentSpeed"), Some("1".to_string()));
/// ```
pub fn extract_xml_text(xml: &str, element_name: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let target_bytes = element_name.as_bytes();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == target_bytes => {
                if let Ok(text) = reader.read_text(e.name()) {
                    let decoded = html_escape::decode_html_entities(&text);
                    return Some(decoded.to_string());
                }
            }
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == target_bytes => {
                return Some(String::new());
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts the host IP from a UPnP `LOCATION` URL.
///
/// # Example
/// ```ignore
/// let ip = extract_ip_from_location("http://192.168.1.100:1400/xml/device_description.xml");
/// assert_eq!(ip, Some("192.168.1.100".to_string()));
/// ```
pub fn extract_ip_from_location(location: &str) -> Option<String> {
    let stripped = location.strip_prefix("http://")?;
    let host_end = stripped.find(':')?;
    Some(stripped[..host_end].to_string())
}

/// Builds a Sonos speaker URL for the given IP and endpoint.
pub fn build_sonos_url(ip: &str, endpoint: &str) -> String {
    format!("http://{}:{}{}", ip, SONOS_PORT, endpoint)
}

/// Resolves album art from DIDL metadata to an absolute URL.
///
/// Sonos reports its own art proxy as a path (`/getaa?s=1&u=...`) relative to
/// the speaker; absolute URLs pass through unchanged.
pub fn absolute_art_url(ip: &str, art: &str) -> String {
    if art.starts_with('/') {
        build_sonos_url(ip, art)
    } else {
        art.to_string()
    }
}

/// Percent-encodes a Spotify URI the way Sonos expects inside its own
/// `x-sonos-spotify:` URIs and DIDL item ids.
///
/// Only unreserved characters pass through; `spotify:track:abc` becomes
/// `spotify%3atrack%3aabc` (Sonos uses lowercase hex).
pub fn encode_uri_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02x}", b)),
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// XML Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Escapes the five XML special characters.
///
/// Used for SOAP arguments and DIDL-Lite values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
