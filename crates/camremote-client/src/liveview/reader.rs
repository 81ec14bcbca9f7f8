//! Background liveview reader.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, Permit};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use super::LiveviewError;
use super::frame::{FrameParser, ReadStep, StreamFrame};
use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;

/// Something that happened on the liveview stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveviewEvent {
    /// An image, in stream order.
    Frame(StreamFrame),
    /// The cycle failed. Sent at most once per cycle, and the last event of
    /// that cycle.
    Error(LiveviewError),
    /// The cycle ended at end of stream or after [`LiveviewReader::stop`].
    Closed,
}

#[derive(Debug, Default)]
struct ReaderState {
    active: bool,
    /// Incremented by every successful start.
    generation: u64,
    /// Cancels the current cycle's pending reads and channel waits.
    cancel: CancellationToken,
}

/// Starts and stops the background task reading a liveview stream.
///
/// Clones control the same reader.
#[derive(Clone)]
pub struct LiveviewReader {
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<ReaderState>>,
    events: mpsc::Sender<LiveviewEvent>,
}

impl std::fmt::Debug for LiveviewReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveviewReader")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl LiveviewReader {
    /// Creates an idle reader and the receiving end of its event channel.
    pub fn new(
        transport: Arc<dyn Transport>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<LiveviewEvent>) {
        let (events, receiver) = mpsc::channel(capacity.max(1));
        let reader = Self {
            transport,
            state: Arc::new(Mutex::new(ReaderState::default())),
            events,
        };
        (reader, receiver)
    }

    /// Starts reading `url` in the background.
    ///
    /// Returns `Ok(false)` without doing anything if the reader is already
    /// active. Must be called from within a tokio runtime.
    pub fn start(&self, url: impl Into<String>) -> ClientResult<bool> {
        let handle = Handle::try_current().map_err(|e| {
            ClientError::configuration(format!("liveview requires a tokio runtime: {}", e))
        })?;
        let url = url.into();

        let (generation, cancel) = {
            let mut state = lock(&self.state);
            if state.active {
                debug!(url = %url, "Liveview already active");
                return Ok(false);
            }
            state.active = true;
            state.generation += 1;
            state.cancel = CancellationToken::new();
            (state.generation, state.cancel.clone())
        };

        info!(url = %url, generation = generation, "Starting liveview");
        let worker = Worker {
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            generation,
            cancel,
        };
        let span = info_span!("liveview", generation = generation);
        handle.spawn(async move { worker.run(url).await }.instrument(span));
        Ok(true)
    }

    /// Asks the background task to stop.
    ///
    /// A pending read or a wait for channel capacity is abandoned, which
    /// releases the connection even if the receiver is not draining.
    /// Returns false if the reader was not active.
    pub fn stop(&self) -> bool {
        let mut state = lock(&self.state);
        if !state.active {
            return false;
        }
        state.active = false;
        state.cancel.cancel();
        info!(generation = state.generation, "Stopping liveview");
        true
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }
}

fn lock(state: &Mutex<ReaderState>) -> MutexGuard<'_, ReaderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The task owning the connection for one start/stop cycle.
struct Worker {
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<ReaderState>>,
    events: mpsc::Sender<LiveviewEvent>,
    generation: u64,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self, url: String) {
        let outcome = self.pump(&url).await;
        let event = match outcome {
            Ok(()) => {
                debug!("Liveview closed");
                LiveviewEvent::Closed
            }
            Err(e) => {
                warn!(error = %e, "Liveview failed");
                LiveviewEvent::Error(e)
            }
        };

        // The stream is closed by now. A stopped cycle does not wait for room.
        let permit = if self.cancel.is_cancelled() {
            self.events.try_reserve().ok()
        } else {
            tokio::select! {
                permit = self.events.reserve() => permit.ok(),
                _ = self.cancel.cancelled() => self.events.try_reserve().ok(),
            }
        };
        self.finish(permit, event);
    }

    async fn pump(&self, url: &str) -> Result<(), LiveviewError> {
        let stream = tokio::select! {
            stream = self.transport.open_stream(url) => stream?,
            _ = self.cancel.cancelled() => return Ok(()),
        };
        let mut parser = FrameParser::new(stream);

        while self.is_current() {
            let step = tokio::select! {
                step = parser.next_frame(|| self.is_current()) => step?,
                _ = self.cancel.cancelled() => return Ok(()),
            };
            match step {
                ReadStep::Frame(frame) if frame.is_image => {
                    let permit = tokio::select! {
                        permit = self.events.reserve() => permit,
                        _ = self.cancel.cancelled() => {
                            debug!("Stopped while waiting for channel capacity");
                            return Ok(());
                        }
                    };
                    let Ok(permit) = permit else {
                        debug!("Event receiver dropped");
                        return Ok(());
                    };
                    if !self.deliver(permit, frame) {
                        return Ok(());
                    }
                }
                ReadStep::Frame(frame) => {
                    trace!(
                        payload_type = frame.payload_type,
                        len = frame.data.len(),
                        "Skipped non-image payload"
                    );
                }
                ReadStep::End => {
                    debug!("End of liveview stream");
                    return Ok(());
                }
                ReadStep::Cancelled => return Ok(()),
            }
        }
        Ok(())
    }

    fn is_current(&self) -> bool {
        let state = lock(&self.state);
        state.active && state.generation == self.generation
    }

    /// Sends a frame unless this cycle was stopped meanwhile.
    fn deliver(&self, permit: Permit<'_, LiveviewEvent>, frame: StreamFrame) -> bool {
        let state = lock(&self.state);
        if !(state.active && state.generation == self.generation) {
            return false;
        }
        permit.send(LiveviewEvent::Frame(frame));
        true
    }

    /// Deactivates the reader and sends the closing event, unless a newer
    /// cycle has taken over.
    fn finish(&self, permit: Option<Permit<'_, LiveviewEvent>>, event: LiveviewEvent) {
        let mut state = lock(&self.state);
        if state.generation != self.generation {
            return;
        }
        state.active = false;
        if let Some(permit) = permit {
            permit.send(event);
        }
    }
}
