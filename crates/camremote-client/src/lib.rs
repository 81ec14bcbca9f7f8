//! Camera remote-control client.
//!
//! This crate talks to cameras exposing the JSON-RPC remote API:
//!
//! - [`DeviceDescriptor`] - Parsed UPnP description with the API endpoints
//! - [`DeviceSession`] - Version negotiation, capability checks, typed calls
//! - [`LiveviewReader`] - Background reader for the preview stream
//! - [`Transport`] - The HTTP seam, with [`HttpTransport`] as implementation
//! - [`ClientError`] - Error types for client operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐      ┌──────────────────┐
//! │    Discovery    │─URL─▶│ DeviceDescriptor │
//! └─────────────────┘      └────────┬─────────┘
//!                                   │ endpoints
//!                                   ▼
//!                          ┌──────────────────┐  encode/decode  ┌─────────────────────┐
//!                          │  DeviceSession   │◀───────────────▶│ camremote-protocol  │
//!                          └────────┬─────────┘                 └─────────────────────┘
//!                                   │ startLiveview URL
//!                                   ▼
//!                          ┌──────────────────┐
//!                          │  LiveviewReader  │──▶ LiveviewEvent channel
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use camremote_client::{ClientConfig, DeviceDescriptor, DeviceSession, HttpTransport};
//!
//! let config = ClientConfig::default();
//! let transport = std::sync::Arc::new(HttpTransport::new(&config)?);
//! let descriptor = DeviceDescriptor::fetch(transport.as_ref(), location).await?;
//! let session = DeviceSession::new(descriptor, transport, config)?;
//!
//! session.initialize().await?;
//! let shot = session.take_picture().await?;
//! println!("{}", shot);
//! ```

pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod liveview;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use descriptor::{CAMERA_SERVICE, DeviceDescriptor, EndpointTable};
pub use discovery::{
    Discovery, SCALAR_WEB_API_TARGET, find_device, find_device_within, find_first_camera_within,
};
pub use error::{ClientError, ClientResult};
pub use liveview::{LiveviewError, LiveviewEvent, LiveviewReader, StreamFrame};
pub use session::{
    DeviceProfile, DeviceSession, MethodCatalog, SessionPhase, ZoomDirection, ZoomMovement,
};
pub use transport::{BoxFuture, ByteStream, HttpTransport, Transport, TransportError};

pub use camremote_core::{TracingConfig, TracingOutputFormat, init_tracing};
pub use camremote_protocol::{DecodeStrategy, Params, RpcError, RpcResult, Value};
