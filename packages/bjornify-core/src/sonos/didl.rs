//! DIDL-Lite metadata handling.
//!
//! Sonos reports what it is playing as a DIDL-Lite blob in `TrackMetaData`,
//! and expects one alongside any URI it is asked to enqueue.

use crate::protocol_constants::SONOS_SPOTIFY_MARKER;
use crate::sonos::types::TrackMetadata;
use crate::sonos::utils::{encode_uri_component, escape_xml, extract_xml_text};

/// DIDL item-id prefix Sonos uses for Spotify tracks.
const SPOTIFY_TRACK_ITEM_KEY: &str = "00032020";

/// Parses the display fields out of a DIDL-Lite `TrackMetaData` payload.
///
/// Radio-style sources leave `dc:title` empty and put "Artist - Title" into
/// `r:streamContent`; that is used as a fallback.
pub(crate) fn parse_track_metadata(didl: &str) -> TrackMetadata {
    let field = |name: &str| extract_xml_text(didl, name).filter(|v| !v.trim().is_empty());

    let mut metadata = TrackMetadata {
        title: field("title"),
        artist: field("creator"),
        album: field("album"),
        album_art_uri: field("albumArtURI"),
    };

    if metadata.title.is_none() {
        if let Some(stream_content) = field("streamContent") {
            match stream_content.split_once(" - ") {
                Some((artist, title)) => {
                    metadata.artist.get_or_insert_with(|| artist.trim().to_string());
                    metadata.title = Some(title.trim().to_string());
                }
                None => metadata.title = Some(stream_content),
            }
        }
    }

    metadata
}

/// Builds the `x-sonos-spotify:` URI for a Spotify track URI.
pub(crate) fn spotify_enqueue_uri(spotify_uri: &str) -> String {
    format!(
        "{}{}",
        SONOS_SPOTIFY_MARKER,
        encode_uri_component(spotify_uri)
    )
}

/// Formats the DIDL-Lite item Sonos needs to resolve a Spotify track.
///
/// The `desc` element names the Spotify music service account on the
/// household; `service_type` is the Sonos service type (2311 for most
/// regions, 3079 in the US).
pub(crate) fn format_spotify_track_didl(spotify_uri: &str, service_type: u32) -> String {
    let item_id = format!(
        "{}{}",
        SPOTIFY_TRACK_ITEM_KEY,
        encode_uri_component(spotify_uri)
    );
    let desc = format!("SA_RINCON{0}_X_#Svc{0}-0-Token", service_type);

    log::debug!("[DIDL] Spotify item id={}, desc={}", item_id, desc);

    let mut didl = String::from(
        r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:r="urn:schemas-rinconnetworks-com:metadata-1-0/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#,
    );
    didl.push_str(&format!(
        r#"<item id="{}" parentID="" restricted="true">"#,
        escape_xml(&item_id)
    ));
    didl.push_str("<dc:title></dc:title>");
    didl.push_str("<upnp:class>object.item.audioItem.musicTrack</upnp:class>");
    didl.push_str(&format!(
        r#"<desc id="cdudn" nameSpace="urn:schemas-rinconnetworks-com:metadata-1-0/">{}</desc>"#,
        escape_xml(&desc)
    ));
    didl.push_str("</item>");
    didl.push_str("</DIDL-Lite>");

    didl
}
