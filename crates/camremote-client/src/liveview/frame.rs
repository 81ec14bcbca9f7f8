//! Liveview stream framing.
//!
//! The stream is a sequence of units:
//!
//! ```text
//! common header   8 bytes   start byte, payload type, sequence (u16 BE), timestamp (u32 BE)
//! payload header  128 bytes marker 24 35 68 79, payload size (u24 BE), padding size (u8),
//!                           120 reserved bytes
//! payload         payload size bytes
//! padding         padding size bytes
//! ```
//!
//! The marker is searched four bytes at a time, which resynchronizes the
//! parser after corrupted or unexpected data.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use super::LiveviewError;

/// Start of a payload header.
pub const PAYLOAD_MARKER: [u8; 4] = [0x24, 0x35, 0x68, 0x79];

/// Length of the common header.
pub const COMMON_HEADER_LEN: usize = 8;

/// Length of the reserved part of the payload header.
pub const RESERVED_HEADER_LEN: u64 = 120;

const IMAGE_FLAG: u8 = 0x01;

/// The common header preceding every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub start_byte: u8,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
}

impl CommonHeader {
    /// Parses the 8 header bytes.
    pub fn parse(bytes: &[u8; COMMON_HEADER_LEN]) -> Self {
        Self {
            start_byte: bytes[0],
            payload_type: bytes[1],
            sequence: u16::from_be_bytes([bytes[2], bytes[3]]),
            timestamp: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Returns true if the payload is a JPEG image.
    pub fn is_image(&self) -> bool {
        self.payload_type & IMAGE_FLAG != 0
    }
}

/// One payload extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    /// Raw payload bytes (JPEG data for images).
    pub data: Vec<u8>,
    pub is_image: bool,
}

/// Outcome of one parsing step.
#[derive(Debug)]
pub enum ReadStep {
    /// A complete payload.
    Frame(StreamFrame),
    /// The stream ended.
    End,
    /// The reader was stopped while resynchronizing.
    Cancelled,
}

/// Pulls frames out of a liveview byte stream.
#[derive(Debug)]
pub struct FrameParser<R> {
    reader: R,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> FrameParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }

    /// Reads the next unit.
    ///
    /// `is_active` is consulted after each common header and before every
    /// resynchronization read. A short read of the payload or its padding
    /// ends the stream cleanly; a truncated common header or an end of
    /// stream while looking for the marker is an error.
    pub async fn next_frame(
        &mut self,
        is_active: impl Fn() -> bool,
    ) -> Result<ReadStep, LiveviewError> {
        if self.exhausted {
            return Ok(ReadStep::End);
        }

        let mut header = [0u8; COMMON_HEADER_LEN];
        match self.read_up_to(&mut header).await? {
            0 => return Ok(self.finish()),
            n if n < COMMON_HEADER_LEN => {
                return Err(LiveviewError::TruncatedHeader { read: n });
            }
            _ => {}
        }
        let header = CommonHeader::parse(&header);
        trace!(
            payload_type = header.payload_type,
            sequence = header.sequence,
            "Read common header"
        );

        if !self.synchronize(&is_active).await? {
            return Ok(ReadStep::Cancelled);
        }

        let mut size = [0u8; 3];
        if self.read_up_to(&mut size).await? < size.len() {
            return Ok(self.finish());
        }
        let payload_size = accumulate(&size);

        let mut padding = [0u8; 1];
        if self.read_up_to(&mut padding).await? < padding.len() {
            return Ok(self.finish());
        }
        let padding_size = accumulate(&padding);

        if self.skip(RESERVED_HEADER_LEN).await? < RESERVED_HEADER_LEN {
            return Ok(self.finish());
        }

        let mut data = vec![0u8; payload_size as usize];
        let read = self.read_up_to(&mut data).await?;
        if read < data.len() {
            debug!(
                expected = payload_size,
                read = read,
                "Stream ended inside a payload"
            );
            return Ok(self.finish());
        }

        if self.skip(padding_size as u64).await? < padding_size as u64 {
            self.exhausted = true;
        }

        Ok(ReadStep::Frame(StreamFrame {
            payload_type: header.payload_type,
            sequence: header.sequence,
            timestamp: header.timestamp,
            data,
            is_image: header.is_image(),
        }))
    }

    /// Scans forward for the payload marker. Returns false if cancelled.
    async fn synchronize(&mut self, is_active: &impl Fn() -> bool) -> Result<bool, LiveviewError> {
        let mut word = [0u8; 4];
        let mut skipped = 0usize;
        loop {
            if !is_active() {
                return Ok(false);
            }
            let read = self.read_up_to(&mut word).await?;
            if read < word.len() {
                return Err(LiveviewError::LostSync { skipped });
            }
            if word == PAYLOAD_MARKER {
                if skipped > 0 {
                    debug!(skipped = skipped, "Resynchronized on payload marker");
                }
                return Ok(true);
            }
            skipped += word.len();
        }
    }

    /// Fills as much of `buf` as the stream allows, returning the count.
    async fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize, LiveviewError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]).await? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    async fn skip(&mut self, count: u64) -> Result<u64, LiveviewError> {
        if count == 0 {
            return Ok(0);
        }
        let skipped =
            tokio::io::copy(&mut (&mut self.reader).take(count), &mut tokio::io::sink()).await?;
        Ok(skipped)
    }

    fn finish(&mut self) -> ReadStep {
        self.exhausted = true;
        ReadStep::End
    }
}

/// Big-endian accumulation: `(acc << 8) | byte`.
fn accumulate(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

/// Builds one stream unit. Used by tests and stream simulators.
pub fn encode_unit(payload_type: u8, sequence: u16, data: &[u8], padding: u8) -> Vec<u8> {
    let mut unit = Vec::with_capacity(COMMON_HEADER_LEN + 128 + data.len() + padding as usize);
    unit.push(0xFF);
    unit.push(payload_type);
    unit.extend_from_slice(&sequence.to_be_bytes());
    unit.extend_from_slice(&0u32.to_be_bytes());
    unit.extend_from_slice(&PAYLOAD_MARKER);
    let size = data.len() as u32;
    unit.extend_from_slice(&size.to_be_bytes()[1..]);
    unit.push(padding);
    unit.extend(std::iter::repeat_n(0u8, RESERVED_HEADER_LEN as usize));
    unit.extend_from_slice(data);
    unit.extend(std::iter::repeat_n(0u8, padding as usize));
    unit
}
