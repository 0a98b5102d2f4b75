//! Low-level SOAP transport for UPnP/Sonos control.
//!
//! Builds the SOAP envelope, posts it to the speaker and turns SOAP faults
//! into [`SoapError`]. Higher-level AVTransport commands live in `playback.rs`.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use super::services::SonosService;
use super::utils::{build_sonos_url, escape_xml, extract_xml_text};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking SOAP to a Sonos speaker.
#[derive(Debug, Error)]
pub enum SoapError {
    /// HTTP request to the speaker failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Speaker returned a non-success HTTP status without a SOAP fault.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Speaker returned a SOAP fault. `code` is the UPnP `errorCode`, when present.
    #[error("SOAP fault (code {code:?}): {message}")]
    Fault { code: Option<u16>, message: String },

    /// Response did not contain the expected elements.
    #[error("Failed to parse SOAP response")]
    Parse,
}

/// Convenient Result alias for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

/// UPnP AVTransport error codes Sonos returns while a device is busy.
///
/// - 701: transition not available (device changing states)
/// - 714: illegal seek target (previous source still loading)
/// - 716: resource not found (device busy initializing)
const TRANSIENT_FAULT_CODES: [u16; 3] = [701, 714, 716];

impl SoapError {
    /// Returns true if the operation is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SoapError::Fault { code: Some(code), .. } => TRANSIENT_FAULT_CODES.contains(code),
            SoapError::Fault { code: None, message } => {
                message.to_lowercase().contains("transition")
            }
            SoapError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns the UPnP fault code, if this is a fault carrying one.
    #[must_use]
    pub fn fault_code(&self) -> Option<u16> {
        match self {
            SoapError::Fault { code, .. } => *code,
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request/Response
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the SOAP envelope for an action.
///
/// Must be a single line: Sonos rejects XML with whitespace before the root element.
fn build_envelope(service: &str, action: &str, args: &[(&str, &str)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{} xmlns:u="{}">"#,
        action, service
    );

    for (k, v) in args {
        body.push_str(&format!("<{k}>{}</{k}>", escape_xml(v)));
    }

    body.push_str(&format!(r#"</u:{}></s:Body></s:Envelope>"#, action));
    body
}

/// Turns a response body into a [`SoapError::Fault`] if it contains one.
fn parse_fault(response_text: &str) -> Option<SoapError> {
    if !response_text.contains("<s:Fault>") && !response_text.contains("<soap:Fault>") {
        return None;
    }

    let code = extract_xml_text(response_text, "errorCode").and_then(|c| c.trim().parse().ok());
    let message = extract_xml_text(response_text, "errorDescription")
        .or_else(|| extract_xml_text(response_text, "faultstring"))
        .unwrap_or_else(|| "Unknown SOAP fault".to_string());

    Some(SoapError::Fault { code, message })
}

/// Sends a SOAP request to a Sonos speaker and returns the raw response body.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of the Sonos speaker
/// * `service` - The UPnP service to address
/// * `action` - The SOAP action name (e.g., "Pause", "GetTransportInfo")
/// * `args` - Key-value pairs for action arguments (order is preserved)
pub async fn send_soap_request(
    client: &Client,
    ip: &str,
    service: SonosService,
    action: &str,
    args: &[(&str, &str)],
) -> SoapResult<String> {
    let url = build_sonos_url(ip, service.control_path());
    let body = build_envelope(service.urn(), action, args);

    log::debug!("[SOAP] {} -> {} (body: {} bytes)", action, url, body.len());
    log::trace!("[SOAP] Request body: {}", body);

    let start = std::time::Instant::now();
    let res = client
        .post(&url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPAction", format!("\"{}#{}\"", service.urn(), action))
        .body(body)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await;

    log::debug!(
        "[SOAP] {} completed in {:?}: {:?}",
        action,
        start.elapsed(),
        res.as_ref().map(|r| r.status())
    );

    let res = res?;
    let status = res.status();
    let response_text = res.text().await?;

    // Faults usually arrive with a 500, so check for them before the status.
    if let Some(fault) = parse_fault(&response_text) {
        return Err(fault);
    }

    if !status.is_success() {
        return Err(SoapError::HttpStatus(status.as_u16(), response_text));
    }

    Ok(response_text)
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Fluent builder for SOAP calls.
///
/// # Example
/// ```ignore
/// let response = SoapRequestBuilder::new(&client, "192.168.1.100")
///     .service(SonosService::AVTransport)
///     .action("Pause")
///     .instance_id()
///     .send()
///     .await?;
/// ```
pub struct SoapRequestBuilder<'a> {
    client: &'a Client,
    ip: &'a str,
    service: Option<SonosService>,
    action: Option<&'a str>,
    args: Vec<(&'a str, String)>,
}

impl<'a> SoapRequestBuilder<'a> {
    #[must_use]
    pub fn new(client: &'a Client, ip: &'a str) -> Self {
        Self {
            client,
            ip,
            service: None,
            action: None,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn service(mut self, service: SonosService) -> Self {
        self.service = Some(service);
        self
    }

    #[must_use]
    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }

    /// Adds an argument; arguments keep their insertion order in the body.
    #[must_use]
    pub fn arg(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.args.push((key, value.into()));
        self
    }

    /// Adds the standard `InstanceID=0` argument used by every AVTransport action.
    #[must_use]
    pub fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    /// Sends the request and returns the response body.
    ///
    /// # Errors
    /// Returns `SoapError` if the service or action is not set, or if the
    /// request fails.
    pub async fn send(self) -> SoapResult<String> {
        let service = self.service.ok_or_else(|| SoapError::Fault {
            code: None,
            message: "SoapRequestBuilder: service not set".into(),
        })?;
        let action = self.action.ok_or_else(|| SoapError::Fault {
            code: None,
            message: "SoapRequestBuilder: action not set".into(),
        })?;

        let args: Vec<(&str, &str)> = self.args.iter().map(|(k, v)| (*k, v.as_str())).collect();

        send_soap_request(self.client, self.ip, service, action, &args).await
    }

    /// Returns the request parts without sending (for testing).
    #[cfg(test)]
    pub fn into_parts(self) -> Option<(SonosService, &'a str, Vec<(&'a str, String)>)> {
        let service = self.service?;
        let action = self.action?;
        Some((service, action, self.args))
    }
}
