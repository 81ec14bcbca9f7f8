//! Client configuration.
//!
//! Settings can be built in code or loaded from a TOML file:
//!
//! ```toml
//! request_timeout_secs = 10
//! long_poll_timeout_secs = 35
//! user_agent = "my-remote/1.0"
//! ```
//!
//! Every key is optional.

use std::path::Path;
use std::time::Duration;

use camremote_protocol::DEFAULT_VERSION;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration shared by the device session, its transport and the
/// liveview reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for a whole RPC request, in seconds.
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection, in seconds.
    pub connect_timeout_secs: u64,

    /// Timeout for long-polling event requests, in seconds. Cameras hold
    /// these open for up to about half a minute.
    pub long_poll_timeout_secs: u64,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Protocol version used until `getVersions` has been negotiated.
    pub default_version: String,

    /// Number of liveview events buffered before the reader waits for the
    /// consumer.
    pub liveview_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: Self::DEFAULT_CONNECT_TIMEOUT_SECS,
            long_poll_timeout_secs: Self::DEFAULT_LONG_POLL_TIMEOUT_SECS,
            user_agent: format!("camremote/{}", env!("CARGO_PKG_VERSION")),
            default_version: DEFAULT_VERSION.to_string(),
            liveview_channel_capacity: Self::DEFAULT_LIVEVIEW_CHANNEL_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Default RPC timeout in seconds.
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Default connect timeout in seconds.
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

    /// Default long-poll timeout in seconds.
    pub const DEFAULT_LONG_POLL_TIMEOUT_SECS: u64 = 35;

    /// Default liveview channel capacity.
    pub const DEFAULT_LIVEVIEW_CHANNEL_CAPACITY: usize = 64;

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ClientError::configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Checks that all timeouts and capacities are usable.
    pub fn validate(&self) -> ClientResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(ClientError::configuration(
                "request_timeout_secs must be greater than zero",
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ClientError::configuration(
                "connect_timeout_secs must be greater than zero",
            ));
        }
        if self.long_poll_timeout_secs == 0 {
            return Err(ClientError::configuration(
                "long_poll_timeout_secs must be greater than zero",
            ));
        }
        if self.liveview_channel_capacity == 0 {
            return Err(ClientError::configuration(
                "liveview_channel_capacity must be greater than zero",
            ));
        }
        if self.default_version.trim().is_empty() {
            return Err(ClientError::configuration("default_version must not be empty"));
        }
        Ok(())
    }

    /// Sets the RPC request timeout, rounded up to whole seconds.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = whole_secs(timeout);
        self
    }

    /// Sets the connect timeout, rounded up to whole seconds.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = whole_secs(timeout);
        self
    }

    /// Sets the long-poll timeout, rounded up to whole seconds.
    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout_secs = whole_secs(timeout);
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the liveview channel capacity.
    pub fn with_liveview_channel_capacity(mut self, capacity: usize) -> Self {
        self.liveview_channel_capacity = capacity;
        self
    }

    /// Returns the RPC request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the long-poll timeout.
    pub fn long_poll_timeout(&self) -> Duration {
        Duration::from_secs(self.long_poll_timeout_secs)
    }
}

/// Timeouts are stored in seconds; a sub-second remainder counts as one more.
fn whole_secs(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}
