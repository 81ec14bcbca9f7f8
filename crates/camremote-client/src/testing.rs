//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value as Json, json};

use crate::transport::{BoxFuture, ByteStream, Transport, TransportError, TransportResult};

type Responder = Box<dyn Fn(&str, &Json) -> TransportResult<Json> + Send + Sync>;

/// A request recorded by [`FakeCamera`].
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub url: String,
    pub body: Json,
    pub timeout: Option<Duration>,
}

impl Recorded {
    pub fn method(&self) -> &str {
        self.body["method"].as_str().unwrap_or_default()
    }
}

/// A camera answering RPC calls through a closure and serving queued
/// liveview streams.
pub(crate) struct FakeCamera {
    responder: Responder,
    requests: Mutex<Vec<Recorded>>,
    streams: Mutex<VecDeque<ByteStream>>,
    stream_opens: AtomicUsize,
}

impl FakeCamera {
    /// Answers every call with `{"result": <responder output>, "id": <id>}`,
    /// or with the transport error the responder returns.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Json) -> TransportResult<Json> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            streams: Mutex::new(VecDeque::new()),
            stream_opens: AtomicUsize::new(0),
        }
    }

    /// A camera answering every call with `[0]`.
    pub fn accepting() -> Self {
        Self::new(|_, _| Ok(json!([0])))
    }

    /// Queues a stream for the next `open_stream`.
    pub fn push_stream(&self, stream: ByteStream) {
        self.streams.lock().unwrap().push_back(stream);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.method().to_string())
            .collect()
    }

    pub fn stream_opens(&self) -> usize {
        self.stream_opens.load(Ordering::SeqCst)
    }
}

impl Transport for FakeCamera {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: String,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            let request: Json = serde_json::from_str(&body).unwrap();
            self.requests.lock().unwrap().push(Recorded {
                url: url.to_string(),
                body: request.clone(),
                timeout,
            });
            let method = request["method"].as_str().unwrap_or_default();
            let answer = (self.responder)(method, &request)?;
            let envelope = if answer.get("error").is_some() {
                let mut answer = answer;
                answer["id"] = request["id"].clone();
                answer
            } else {
                json!({ "result": answer, "id": request["id"] })
            };
            Ok(envelope.to_string().into_bytes())
        })
    }

    fn get<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async { Err(TransportError::Status { status: 404 }) })
    }

    fn open_stream<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, TransportResult<ByteStream>> {
        Box::pin(async move {
            self.stream_opens.fetch_add(1, Ordering::SeqCst);
            self.streams
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Connect("connection refused".to_string()))
        })
    }
}
