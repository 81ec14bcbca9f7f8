//! Liveview stream reading.
//!
//! The camera serves its preview as one long HTTP response carrying framed
//! JPEG images. [`FrameParser`] extracts frames from any byte stream and
//! [`LiveviewReader`] runs it on a background task, delivering
//! [`LiveviewEvent`]s over a bounded channel.
//!
//! ```ignore
//! let url = session.liveview_url().await?;
//! let (reader, mut events) = session.liveview_reader();
//! reader.start(url)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LiveviewEvent::Frame(frame) => show(&frame.data),
//!         LiveviewEvent::Error(e) => warn!(error = %e, "liveview failed"),
//!         LiveviewEvent::Closed => break,
//!     }
//! }
//! ```

mod frame;
mod reader;

pub use frame::{
    COMMON_HEADER_LEN, CommonHeader, FrameParser, PAYLOAD_MARKER, RESERVED_HEADER_LEN, ReadStep,
    StreamFrame, encode_unit,
};
pub use reader::{LiveviewEvent, LiveviewReader};

use thiserror::Error;

use crate::transport::TransportError;

/// Errors ending a liveview cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveviewError {
    /// The stream could not be opened.
    #[error("failed to open liveview stream: {0}")]
    Connect(#[from] TransportError),

    /// Reading the stream failed.
    #[error("liveview read failed: {0}")]
    Io(String),

    /// The stream ended inside a common header.
    #[error("liveview stream ended inside a common header ({read} of 8 bytes)")]
    TruncatedHeader { read: usize },

    /// The stream ended while looking for a payload marker.
    #[error("liveview stream ended before a payload marker ({skipped} bytes skipped)")]
    LostSync { skipped: usize },
}

impl From<std::io::Error> for LiveviewError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
