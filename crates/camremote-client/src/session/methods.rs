//! Typed camera operations.
//!
//! Each operation fixes the wire method, its parameters and how the answer
//! is decoded. Anything not covered here goes through
//! [`DeviceSession::call`].

use std::fmt;

use camremote_protocol::{DecodeStrategy, Params, RpcResult};

use super::DeviceSession;
use crate::error::ClientResult;

/// Zoom direction for `actZoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for ZoomDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Zoom movement for `actZoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomMovement {
    /// Zoom until stopped.
    Start,
    Stop,
    /// A single step.
    OneShot,
}

impl ZoomMovement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::OneShot => "1shot",
        }
    }
}

impl fmt::Display for ZoomMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl DeviceSession {
    async fn call_plain(&self, method: &str, strategy: DecodeStrategy) -> ClientResult<RpcResult> {
        self.call(method, Params::none(), strategy).await
    }

    /// Sends `echo`, a connectivity check.
    pub async fn hello(&self) -> ClientResult<RpcResult> {
        self.call("echo", Params::single("Hello camera"), DecodeStrategy::Scalar)
            .await
    }

    /// Lists the protocol versions the device supports.
    pub async fn get_versions(&self) -> ClientResult<RpcResult> {
        self.call_plain("getVersions", DecodeStrategy::FlatArray).await
    }

    /// Lists the methods the device currently offers.
    pub async fn get_available_api_list(&self) -> ClientResult<RpcResult> {
        self.call_plain("getAvailableApiList", DecodeStrategy::FlatArray)
            .await
    }

    /// Returns the server application name and version.
    pub async fn get_application_info(&self) -> ClientResult<RpcResult> {
        self.call_plain("getApplicationInfo", DecodeStrategy::FlatArray)
            .await
    }

    pub async fn get_shoot_mode(&self) -> ClientResult<RpcResult> {
        self.call_plain("getShootMode", DecodeStrategy::Scalar).await
    }

    pub async fn get_supported_shoot_mode(&self) -> ClientResult<RpcResult> {
        self.call_plain("getSupportedShootMode", DecodeStrategy::FlatArray)
            .await
    }

    /// Returns the current shoot mode and its candidates.
    pub async fn get_available_shoot_mode(&self) -> ClientResult<RpcResult> {
        self.call_plain("getAvailableShootMode", DecodeStrategy::FirstElement)
            .await
    }

    /// Sets the shoot mode (`still`, `movie`, ...).
    pub async fn set_shoot_mode(&self, mode: &str) -> ClientResult<RpcResult> {
        self.call("setShootMode", Params::single(mode), DecodeStrategy::NoValue)
            .await
    }

    /// Puts the camera in remote shooting mode. Some models need this before
    /// liveview or capture.
    pub async fn start_rec_mode(&self) -> ClientResult<RpcResult> {
        self.call_plain("startRecMode", DecodeStrategy::Scalar).await
    }

    pub async fn stop_rec_mode(&self) -> ClientResult<RpcResult> {
        self.call_plain("stopRecMode", DecodeStrategy::Scalar).await
    }

    /// Starts liveview. The payload is the stream URL.
    pub async fn start_liveview(&self) -> ClientResult<RpcResult> {
        self.call_plain("startLiveview", DecodeStrategy::Scalar).await
    }

    /// Starts liveview at a given size (`L`, `M`).
    pub async fn start_liveview_with_size(&self, size: &str) -> ClientResult<RpcResult> {
        self.call(
            "startLiveviewWithSize",
            Params::single(size),
            DecodeStrategy::Scalar,
        )
        .await
    }

    pub async fn stop_liveview(&self) -> ClientResult<RpcResult> {
        self.call_plain("stopLiveview", DecodeStrategy::Scalar).await
    }

    pub async fn get_liveview_size(&self) -> ClientResult<RpcResult> {
        self.call_plain("getLiveviewSize", DecodeStrategy::Scalar).await
    }

    pub async fn get_supported_liveview_size(&self) -> ClientResult<RpcResult> {
        self.call_plain("getSupportedLiveviewSize", DecodeStrategy::FlatArray)
            .await
    }

    pub async fn get_available_liveview_size(&self) -> ClientResult<RpcResult> {
        self.call_plain("getAvailableLiveviewSize", DecodeStrategy::FirstElement)
            .await
    }

    /// Enables or disables frame information in the liveview stream.
    pub async fn set_liveview_frame_info(&self, frame_info: bool) -> ClientResult<RpcResult> {
        self.call(
            "setLiveviewFrameInfo",
            Params::named([("frameInfo", frame_info)]),
            DecodeStrategy::Scalar,
        )
        .await
    }

    pub async fn get_liveview_frame_info(&self) -> ClientResult<RpcResult> {
        self.call_plain("getLiveviewFrameInfo", DecodeStrategy::FirstElement)
            .await
    }

    /// Takes a picture. The payload lists the postview image URLs.
    pub async fn take_picture(&self) -> ClientResult<RpcResult> {
        self.call_plain("actTakePicture", DecodeStrategy::FlatArray).await
    }

    /// Waits for a capture that answered `40403` (still processing).
    pub async fn await_take_picture(&self) -> ClientResult<RpcResult> {
        self.call_plain("awaitTakePicture", DecodeStrategy::FlatArray)
            .await
    }

    pub async fn zoom(
        &self,
        direction: ZoomDirection,
        movement: ZoomMovement,
    ) -> ClientResult<RpcResult> {
        self.call(
            "actZoom",
            Params::positional([direction.as_str(), movement.as_str()]),
            DecodeStrategy::Scalar,
        )
        .await
    }

    pub async fn zoom_in(&self) -> ClientResult<RpcResult> {
        self.zoom(ZoomDirection::In, ZoomMovement::Start).await
    }

    pub async fn zoom_in_stop(&self) -> ClientResult<RpcResult> {
        self.zoom(ZoomDirection::In, ZoomMovement::Stop).await
    }

    pub async fn zoom_in_step(&self) -> ClientResult<RpcResult> {
        self.zoom(ZoomDirection::In, ZoomMovement::OneShot).await
    }

    pub async fn zoom_out(&self) -> ClientResult<RpcResult> {
        self.zoom(ZoomDirection::Out, ZoomMovement::Start).await
    }

    pub async fn zoom_out_stop(&self) -> ClientResult<RpcResult> {
        self.zoom(ZoomDirection::Out, ZoomMovement::Stop).await
    }

    pub async fn zoom_out_step(&self) -> ClientResult<RpcResult> {
        self.zoom(ZoomDirection::Out, ZoomMovement::OneShot).await
    }

    /// Polls for camera status changes.
    ///
    /// With `long_polling` the device holds the request until something
    /// changes, so the long-poll timeout applies instead of the request one.
    pub async fn get_event(&self, long_polling: bool) -> ClientResult<RpcResult> {
        let timeout = long_polling.then(|| self.config.long_poll_timeout());
        self.call_with_timeout(
            self.profile.event_method,
            Params::single(long_polling),
            DecodeStrategy::FirstElement,
            timeout,
        )
        .await
    }

    /// Switches between `Remote Shooting` and `Contents Transfer`.
    pub async fn set_camera_function(&self, function: &str) -> ClientResult<RpcResult> {
        self.call(
            "setCameraFunction",
            Params::single(function),
            DecodeStrategy::Scalar,
        )
        .await
    }
}
