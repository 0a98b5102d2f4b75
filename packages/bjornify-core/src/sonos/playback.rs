//! AVTransport commands for Sonos speakers.
//!
//! Read side: transport state and position/track info, which the device
//! classifier and the now-playing reader inspect. Write side: pause, next and
//! queueing a Spotify track, used when Spotify refuses to control the device.

use reqwest::Client;

use crate::sonos::didl::{format_spotify_track_didl, spotify_enqueue_uri};
use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};
use crate::sonos::types::{PositionInfo, TransportInfo, TransportState};
use crate::sonos::utils::extract_xml_text;

/// Gets the transport state of a speaker.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of the Sonos speaker
pub async fn get_transport_info(client: &Client, ip: &str) -> SoapResult<TransportInfo> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetTransportInfo")
        .instance_id()
        .send()
        .await?;

    parse_transport_info(&response)
}

fn parse_transport_info(response: &str) -> SoapResult<TransportInfo> {
    let state = extract_xml_text(response, "CurrentTransportState")
        .ok_or(SoapError::Parse)?
        .parse::<TransportState>()
        .map_err(|_| SoapError::Parse)?;
    let status = extract_xml_text(response, "CurrentTransportStatus").unwrap_or_default();

    Ok(TransportInfo { state, status })
}

/// Gets the currently loaded track and playback position from a speaker.
///
/// `TrackMetaData` comes back entity-escaped inside the SOAP body;
/// `extract_xml_text` decodes it, so `track_metadata` holds plain DIDL-Lite.
pub async fn get_position_info(client: &Client, ip: &str) -> SoapResult<PositionInfo> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetPositionInfo")
        .instance_id()
        .send()
        .await?;

    Ok(parse_position_info(&response))
}

fn parse_position_info(response: &str) -> PositionInfo {
    let track = extract_xml_text(response, "Track")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let track_duration = extract_xml_text(response, "TrackDuration").unwrap_or_default();
    let track_uri = extract_xml_text(response, "TrackURI").unwrap_or_default();
    let track_metadata = extract_xml_text(response, "TrackMetaData")
        .filter(|m| m != "NOT_IMPLEMENTED")
        .unwrap_or_default();
    let rel_time = extract_xml_text(response, "RelTime").unwrap_or_else(|| "0:00:00".to_string());
    let rel_time_ms = PositionInfo::parse_time_to_ms(&rel_time);

    PositionInfo {
        track,
        track_duration,
        track_uri,
        track_metadata,
        rel_time,
        rel_time_ms,
    }
}

/// Pauses playback on a speaker.
///
/// Sonos answers 701 when the speaker is already paused or stopped; that is
/// treated as success.
pub async fn pause(client: &Client, ip: &str) -> SoapResult<()> {
    log::info!("[Sonos] Sending Pause to {}", ip);

    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("Pause")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if e.fault_code() == Some(701) => {
            log::debug!("[Sonos] Pause: {} is not playing (ignoring 701)", ip);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Skips to the next track on a speaker.
pub async fn next(client: &Client, ip: &str) -> SoapResult<()> {
    log::info!("[Sonos] Sending Next to {}", ip);

    with_retry("Next", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("Next")
            .instance_id()
            .send()
    })
    .await?;

    Ok(())
}

/// Appends a Spotify track to the speaker's queue.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of the Sonos speaker (group coordinator)
/// * `spotify_uri` - A `spotify:track:<id>` URI
/// * `service_type` - Sonos service type of the linked Spotify account
///
/// # Returns
/// The queue position Sonos assigned to the first enqueued track.
pub async fn add_spotify_track_to_queue(
    client: &Client,
    ip: &str,
    spotify_uri: &str,
    service_type: u32,
) -> SoapResult<u32> {
    let enqueued_uri = spotify_enqueue_uri(spotify_uri);
    let metadata = format_spotify_track_didl(spotify_uri, service_type);

    log::info!("[Sonos] AddURIToQueue: ip={}, uri={}", ip, enqueued_uri);

    let response = with_retry("AddURIToQueue", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("AddURIToQueue")
            .instance_id()
            .arg("EnqueuedURI", &enqueued_uri)
            .arg("EnqueuedURIMetaData", &metadata)
            .arg("DesiredFirstTrackNumberEnqueued", "0")
            .arg("EnqueueAsNext", "0")
            .send()
    })
    .await?;

    Ok(extract_xml_text(&response, "FirstTrackNumberEnqueued")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0))
}
