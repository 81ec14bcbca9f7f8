//! UPnP device description parsing.
//!
//! A camera advertises its services in the `X_ScalarWebAPI_DeviceInfo`
//! extension of its description document. Each service becomes an entry in
//! the [`EndpointTable`], keyed by service type (`camera`, `system`, ...).

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;

/// Manufacturer prefix of supported devices.
const MANUFACTURER_PREFIX: &str = "sony";

/// `modelDescription` of devices exposing the remote API.
const REMOTE_MODEL_DESCRIPTION: &str = "SonyRemoteCamera";

/// Service name of the main camera endpoint.
pub const CAMERA_SERVICE: &str = "camera";

/// Mapping from service name to absolute endpoint URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointTable(BTreeMap<String, String>);

impl EndpointTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an endpoint, joining `action_list_url` and `service` with a
    /// single slash.
    pub fn insert_service(&mut self, service: &str, action_list_url: &str) {
        let base = action_list_url.trim_end_matches('/');
        self.0
            .insert(service.to_string(), format!("{}/{}", base, service));
    }

    /// Adds an endpoint with an already complete URL.
    pub fn insert(&mut self, service: impl Into<String>, url: impl Into<String>) {
        self.0.insert(service.into(), url.into());
    }

    /// Returns the URL of a service.
    pub fn get(&self, service: &str) -> Option<&str> {
        self.0.get(service).map(String::as_str)
    }

    /// Returns true if the table contains the service.
    pub fn contains(&self, service: &str) -> bool {
        self.0.contains_key(service)
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the table has no endpoints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(service, url)` pairs in service-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EndpointTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A parsed device description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// URL the description was fetched from.
    pub location: String,
    pub friendly_name: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_url: Option<String>,
    pub model_description: Option<String>,
    pub model_name: Option<String>,
    pub model_number: Option<String>,
    pub model_url: Option<String>,
    pub serial_number: Option<String>,
    /// Raw `UDN`, e.g. `uuid:00000000-0005-0010-8000-1c994c0e8586`.
    pub udn: Option<String>,
    /// UDN without its `uuid:` prefix.
    pub uuid: Option<String>,
    pub endpoints: EndpointTable,
}

impl DeviceDescriptor {
    /// Creates a descriptor from already known parts.
    pub fn new(friendly_name: impl Into<String>, endpoints: EndpointTable) -> Self {
        Self {
            friendly_name: Some(friendly_name.into()),
            endpoints,
            ..Self::default()
        }
    }

    /// Parses a description document.
    pub fn from_xml(location: impl Into<String>, xml: &str) -> ClientResult<Self> {
        if xml.trim().is_empty() {
            return Err(ClientError::descriptor("empty device description"));
        }

        let mut descriptor = Self {
            location: location.into(),
            ..Self::default()
        };

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut path: Vec<String> = Vec::new();
        let mut service_type: Option<String> = None;
        let mut action_list_url: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = local_name(e.name().as_ref());
                    if name == "X_ScalarWebAPI_Service" {
                        service_type = None;
                        action_list_url = None;
                    }
                    path.push(name);
                }
                Ok(Event::Empty(_)) => {}
                Ok(Event::End(_)) => {
                    if path.pop().as_deref() == Some("X_ScalarWebAPI_Service") {
                        if let (Some(service), Some(url)) =
                            (service_type.take(), action_list_url.take())
                        {
                            Url::parse(&url).map_err(|e| {
                                ClientError::descriptor(format!(
                                    "invalid action list URL '{}' for '{}': {}",
                                    url, service, e
                                ))
                            })?;
                            descriptor.endpoints.insert_service(&service, &url);
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| ClientError::descriptor(e.to_string()))?
                        .trim()
                        .to_string();
                    if text.is_empty() {
                        continue;
                    }
                    // Only root/device/<field>; embedded devices are ignored.
                    let root_device = path.len() == 3 && path[1] == "device";
                    match (root_device, path.last().map(String::as_str)) {
                        (true, Some(field)) => descriptor.set_field(field, text),
                        (_, Some("X_ScalarWebAPI_ServiceType")) => service_type = Some(text),
                        (_, Some("X_ScalarWebAPI_ActionList_URL")) => {
                            action_list_url = Some(text)
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ClientError::descriptor(format!(
                        "malformed XML at position {}: {}",
                        reader.error_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        if !path.is_empty() {
            return Err(ClientError::descriptor("unexpected end of document"));
        }

        descriptor.uuid = descriptor.udn.as_deref().map(strip_uuid_prefix);

        if descriptor.endpoints.is_empty() {
            return Err(ClientError::descriptor("no API endpoints advertised"));
        }

        debug!(
            friendly_name = ?descriptor.friendly_name,
            endpoints = descriptor.endpoints.len(),
            "Parsed device description"
        );
        Ok(descriptor)
    }

    /// Fetches and parses the description document at `url`.
    pub async fn fetch(transport: &dyn Transport, url: &str) -> ClientResult<Self> {
        let bytes = transport.get(url).await?;
        // Some firmwares label the document with a charset they do not use.
        let xml = String::from_utf8_lossy(&bytes);
        Self::from_xml(url, &xml)
    }

    /// Returns true if the device is a remote-controllable camera.
    pub fn is_valid(&self) -> bool {
        let vendor = self
            .manufacturer
            .as_deref()
            .is_some_and(|m| {
                m.get(..MANUFACTURER_PREFIX.len())
                    .is_some_and(|p| p.eq_ignore_ascii_case(MANUFACTURER_PREFIX))
            });
        vendor && self.model_description.as_deref() == Some(REMOTE_MODEL_DESCRIPTION)
    }

    /// Returns the advertised camera endpoint, before any quirk adjustment.
    pub fn camera_endpoint(&self) -> Option<&str> {
        self.endpoints.get(CAMERA_SERVICE)
    }

    fn set_field(&mut self, field: &str, value: String) {
        let slot = match field {
            "friendlyName" => &mut self.friendly_name,
            "manufacturer" => &mut self.manufacturer,
            "manufacturerURL" => &mut self.manufacturer_url,
            "modelDescription" => &mut self.model_description,
            "modelName" => &mut self.model_name,
            "modelNumber" => &mut self.model_number,
            "modelURL" => &mut self.model_url,
            "serialNumber" => &mut self.serial_number,
            "UDN" => &mut self.udn,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Returns the element name without its namespace prefix.
fn local_name(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    match name.rfind(':') {
        Some(pos) => name[pos + 1..].to_string(),
        None => name.into_owned(),
    }
}

fn strip_uuid_prefix(udn: &str) -> String {
    match udn.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("uuid:") => udn[5..].to_string(),
        _ => udn.to_string(),
    }
}
