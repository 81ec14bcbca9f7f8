//! HTTP transport.
//!
//! The session and the liveview reader talk to the network only through the
//! [`Transport`] trait. [`HttpTransport`] is the reqwest-backed
//! implementation; tests substitute in-memory fakes.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep [`Transport`] object-safe so a session and its liveview
/// reader can share one `Arc<dyn Transport>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The body of a long-lived streaming response.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A failed HTTP exchange. The display text becomes the error text of the
/// synthesized RPC result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset, ...
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request or connection timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The device answered with a non-2xx status.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else if err.is_builder() {
            Self::Client(err.to_string())
        } else {
            Self::Connect(err.to_string())
        }
    }
}

/// Network access used by the core.
pub trait Transport: Send + Sync {
    /// POSTs a JSON body and returns the raw response body.
    ///
    /// `timeout` overrides the default request timeout for this call.
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: String,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>>;

    /// GETs a document and returns the raw body.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, TransportResult<Vec<u8>>>;

    /// Opens a long-lived GET and returns its body as a byte stream.
    ///
    /// The stream is not subject to the request timeout.
    fn open_stream<'a>(&'a self, url: &'a str) -> BoxFuture<'a, TransportResult<ByteStream>>;
}

/// reqwest-backed transport with a pooled client for RPC calls and a second
/// client, without a total timeout, for streams.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    stream_client: Client,
}

impl HttpTransport {
    /// Creates a transport from the client configuration.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        let stream_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            stream_client,
        })
    }

    fn check_status(response: Response) -> TransportResult<Response> {
        let status = response.status();
        trace!(status = %status, "Received response");
        if status.is_success() {
            Ok(response)
        } else {
            debug!(status = %status, url = %response.url(), "Non-success status");
            Err(TransportError::Status {
                status: status.as_u16(),
            })
        }
    }
}

impl Transport for HttpTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: String,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            let mut request = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body);
            if let Some(t) = timeout {
                request = request.timeout(t);
            }

            trace!(url = %url, "Sending POST");
            let response = Self::check_status(request.send().await?)?;
            // Raw bytes: some firmwares send a charset label reqwest rejects.
            let bytes = response.bytes().await?;
            Ok(bytes.to_vec())
        })
    }

    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            trace!(url = %url, "Sending GET");
            let response = Self::check_status(self.client.get(url).send().await?)?;
            let bytes = response.bytes().await?;
            Ok(bytes.to_vec())
        })
    }

    fn open_stream<'a>(&'a self, url: &'a str) -> BoxFuture<'a, TransportResult<ByteStream>> {
        Box::pin(async move {
            debug!(url = %url, "Opening stream");
            let response = Self::check_status(self.stream_client.get(url).send().await?)?;
            let body = response.bytes_stream().map_err(io::Error::other);
            let stream: ByteStream = Box::pin(StreamReader::new(body));
            Ok(stream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let config = ClientConfig::default().with_request_timeout(Duration::from_secs(2));
        assert!(HttpTransport::new(&config).is_ok());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ClientConfig::default().with_liveview_channel_capacity(0);
        assert!(HttpTransport::new(&config).is_err());
    }

    #[test]
    fn status_error_display() {
        let err = TransportError::Status { status: 404 };
        assert_eq!(err.to_string(), "unexpected HTTP status 404");
    }

    #[tokio::test]
    async fn connection_refused_is_connect_or_timeout() {
        let config = ClientConfig::default()
            .with_request_timeout(Duration::from_secs(2))
            .with_connect_timeout(Duration::from_secs(1));
        let transport = HttpTransport::new(&config).unwrap();

        // Port 9 (discard) on localhost is closed on test machines.
        let err = transport
            .post_json("http://127.0.0.1:9/sony/camera", "{}".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect(_) | TransportError::Timeout(_)
        ));
    }
}
