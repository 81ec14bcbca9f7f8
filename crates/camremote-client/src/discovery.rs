//! Device lookup on top of an SSDP search implementation.
//!
//! This crate does not speak SSDP itself. A [`Discovery`] implementation
//! returns the description URLs of devices answering a search target; the
//! helpers here turn those into parsed [`DeviceDescriptor`]s.

use std::time::Duration;

use tracing::{debug, info};

use crate::descriptor::DeviceDescriptor;
use crate::error::ClientResult;
use crate::transport::{BoxFuture, Transport};

/// Search target advertised by cameras exposing the remote API.
pub const SCALAR_WEB_API_TARGET: &str = "urn:schemas-sony-com:service:ScalarWebAPI:1";

/// An SSDP search.
pub trait Discovery: Send + Sync {
    /// Returns the description URLs of devices answering `target`.
    fn search<'a>(&'a self, target: &'a str) -> BoxFuture<'a, ClientResult<Vec<String>>>;
}

/// Looks up a device by UUID and fetches its description.
///
/// Returns `Ok(None)` if no device answers.
pub async fn find_device(
    discovery: &dyn Discovery,
    transport: &dyn Transport,
    uuid: &str,
) -> ClientResult<Option<DeviceDescriptor>> {
    let target = format!("uuid:{}", uuid);
    find_first(discovery, transport, &target).await
}

/// Like [`find_device`], giving up after `timeout`.
pub async fn find_device_within(
    discovery: &dyn Discovery,
    transport: &dyn Transport,
    uuid: &str,
    timeout: Duration,
) -> ClientResult<Option<DeviceDescriptor>> {
    match tokio::time::timeout(timeout, find_device(discovery, transport, uuid)).await {
        Ok(result) => result,
        Err(_) => {
            info!(uuid = %uuid, timeout = ?timeout, "Device lookup timed out");
            Ok(None)
        }
    }
}

/// Finds the first remote-controllable camera, giving up after `timeout`.
pub async fn find_first_camera_within(
    discovery: &dyn Discovery,
    transport: &dyn Transport,
    timeout: Duration,
) -> ClientResult<Option<DeviceDescriptor>> {
    let search = find_first(discovery, transport, SCALAR_WEB_API_TARGET);
    match tokio::time::timeout(timeout, search).await {
        Ok(result) => result,
        Err(_) => {
            info!(timeout = ?timeout, "Camera search timed out");
            Ok(None)
        }
    }
}

async fn find_first(
    discovery: &dyn Discovery,
    transport: &dyn Transport,
    target: &str,
) -> ClientResult<Option<DeviceDescriptor>> {
    let locations = discovery.search(target).await?;
    debug!(target = %target, found = locations.len(), "Search finished");

    let Some(location) = locations.first() else {
        return Ok(None);
    };
    let descriptor = DeviceDescriptor::fetch(transport, location).await?;
    Ok(Some(descriptor))
}
