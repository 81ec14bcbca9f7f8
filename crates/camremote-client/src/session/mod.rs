//! Device session.
//!
//! A [`DeviceSession`] owns everything needed to talk to one camera: its
//! endpoint, the negotiated protocol version, the advertised method catalog
//! and the model quirks. The typed camera operations live in `methods`.
//!
//! ```ignore
//! let descriptor = DeviceDescriptor::fetch(&transport, &location).await?;
//! let session = DeviceSession::new(descriptor, transport, ClientConfig::default())?;
//!
//! let init = session.initialize().await?;
//! if init.has_error() {
//!     warn!("camera only partially initialized: {}", init);
//! }
//! let photo = session.take_picture().await?;
//! ```

mod catalog;
mod methods;
mod quirks;

pub use catalog::MethodCatalog;
pub use methods::{ZoomDirection, ZoomMovement};
pub use quirks::DeviceProfile;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use camremote_protocol::{
    DecodeStrategy, Params, RpcResult, Value, decode_response, encode_request,
};
use tokio::sync::{RwLock, mpsc};
use tracing::{Instrument, debug, debug_span, info, trace, warn};

use crate::config::ClientConfig;
use crate::descriptor::{CAMERA_SERVICE, DeviceDescriptor};
use crate::error::{ClientError, ClientResult};
use crate::liveview::{LiveviewEvent, LiveviewReader};
use crate::transport::{HttpTransport, Transport};

/// Initialization progress of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// `initialize` has not been called.
    #[default]
    Uninitialized,
    /// `initialize` is running.
    Initializing,
    /// Version and method catalog are known.
    Ready,
    /// Initialization failed; calls are not gated.
    Degraded,
}

impl SessionPhase {
    /// Returns a human-readable name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
struct SessionState {
    version: String,
    catalog: MethodCatalog,
    phase: SessionPhase,
}

/// A connection to one camera.
///
/// Calls may be issued concurrently; each gets a unique id.
pub struct DeviceSession {
    descriptor: DeviceDescriptor,
    profile: DeviceProfile,
    camera_endpoint: String,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    next_id: AtomicU64,
    state: RwLock<SessionState>,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("friendly_name", &self.descriptor.friendly_name)
            .field("profile", &self.profile.name)
            .field("camera_endpoint", &self.camera_endpoint)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Creates a session over an existing transport.
    ///
    /// Fails with a configuration error if the descriptor has no camera
    /// endpoint.
    pub fn new(
        descriptor: DeviceDescriptor,
        transport: Arc<dyn Transport>,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        config.validate()?;

        let advertised = descriptor.camera_endpoint().ok_or_else(|| {
            ClientError::configuration(format!(
                "device description has no '{}' endpoint",
                CAMERA_SERVICE
            ))
        })?;
        let profile = DeviceProfile::for_friendly_name(descriptor.friendly_name.as_deref());
        let camera_endpoint = profile.camera_endpoint(advertised);

        info!(
            friendly_name = ?descriptor.friendly_name,
            profile = profile.name,
            endpoint = %camera_endpoint,
            "Created device session"
        );

        Ok(Self {
            state: RwLock::new(SessionState {
                version: config.default_version.clone(),
                catalog: MethodCatalog::new(),
                phase: SessionPhase::Uninitialized,
            }),
            descriptor,
            profile,
            camera_endpoint,
            transport,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// Creates a session with an HTTP transport built from `config`.
    pub fn connect(descriptor: DeviceDescriptor, config: ClientConfig) -> ClientResult<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::new(descriptor, transport, config)
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Returns true if the device needs the model-specific protocol variant.
    pub fn is_quirk_mode(&self) -> bool {
        self.profile.is_quirk()
    }

    /// The camera endpoint, after quirk adjustment.
    pub fn camera_endpoint(&self) -> &str {
        &self.camera_endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// The protocol version sent with each request.
    pub async fn version(&self) -> String {
        self.state.read().await.version.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    /// A snapshot of the advertised methods.
    pub async fn catalog(&self) -> MethodCatalog {
        self.state.read().await.catalog.clone()
    }

    /// Returns an error if the device did not advertise `method`.
    pub async fn check_available(&self, method: &str) -> ClientResult<()> {
        self.state.read().await.catalog.check(method)
    }

    /// Negotiates the protocol version and loads the method catalog.
    ///
    /// Returns the `getAvailableApiList` result on success. If the device
    /// answers either step with an error, that result is returned instead and
    /// the session stays usable without capability checks.
    pub async fn initialize(&self) -> ClientResult<RpcResult> {
        {
            let mut state = self.state.write().await;
            state.phase = SessionPhase::Initializing;
            state.catalog = MethodCatalog::new();
        }
        debug!("Initializing session");

        match self.negotiate().await {
            Ok(result) if !result.has_error() => {
                let catalog = MethodCatalog::from_methods(result.strings());
                let mut state = self.state.write().await;
                info!(
                    version = %state.version,
                    methods = catalog.len(),
                    "Session ready"
                );
                state.catalog = catalog;
                state.phase = SessionPhase::Ready;
                Ok(result)
            }
            Ok(result) => {
                warn!(error = %result, "Session initialization rejected by device");
                self.state.write().await.phase = SessionPhase::Degraded;
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "Session initialization failed");
                self.state.write().await.phase = SessionPhase::Degraded;
                Err(e)
            }
        }
    }

    async fn negotiate(&self) -> ClientResult<RpcResult> {
        let versions = self.get_versions().await?;
        if versions.has_error() {
            return Ok(versions);
        }
        match versions.values().first().and_then(Value::as_str) {
            Some(version) => {
                debug!(version = %version, "Adopted protocol version");
                self.state.write().await.version = version.to_string();
            }
            None => debug!("Device listed no versions, keeping default"),
        }

        self.get_available_api_list().await
    }

    /// Calls any method on the camera endpoint.
    ///
    /// Transport failures come back as a result carrying
    /// [`TRANSPORT_ERROR_CODE`](camremote_protocol::TRANSPORT_ERROR_CODE). An
    /// `Err` means no request was sent.
    pub async fn call(
        &self,
        method: &str,
        params: Params,
        strategy: DecodeStrategy,
    ) -> ClientResult<RpcResult> {
        self.call_with_timeout(method, params, strategy, None).await
    }

    pub(crate) async fn call_with_timeout(
        &self,
        method: &str,
        params: Params,
        strategy: DecodeStrategy,
        timeout: Option<Duration>,
    ) -> ClientResult<RpcResult> {
        let version = {
            let state = self.state.read().await;
            state.catalog.check(method)?;
            state.version.clone()
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = encode_request(method, &params, id, &version)?;

        let span = debug_span!("rpc", method = %method, id = id);
        async move {
            trace!(body = %body, "Sending request");
            match self
                .transport
                .post_json(&self.camera_endpoint, body, timeout)
                .await
            {
                Ok(bytes) => {
                    let result = decode_response(&bytes, strategy);
                    match result.error() {
                        Some(err) => debug!(code = err.code, text = %err.text, "Device error"),
                        None => trace!("Call succeeded"),
                    }
                    Ok(result)
                }
                Err(e) => {
                    warn!(error = %e, "Transport failure");
                    Ok(RpcResult::transport_failure(id.to_string(), e.to_string()))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Starts liveview on the camera and returns the stream URL.
    pub async fn liveview_url(&self) -> ClientResult<String> {
        let result = self.start_liveview().await?.into_result()?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::configuration("startLiveview returned no URL"))
    }

    /// Creates a liveview reader sharing this session's transport.
    pub fn liveview_reader(&self) -> (LiveviewReader, mpsc::Receiver<LiveviewEvent>) {
        LiveviewReader::new(self.transport(), self.config.liveview_channel_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::EndpointTable;
    use crate::testing::FakeCamera;
    use crate::transport::TransportError;
    use camremote_protocol::TRANSPORT_ERROR_CODE;
    use serde_json::json;
    use std::collections::HashSet;

    fn descriptor(name: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(
            name,
            EndpointTable::from_iter([("camera", "http://10.0.0.1:10000/sony/camera")]),
        )
    }

    fn session(name: &str, camera: FakeCamera) -> (DeviceSession, Arc<FakeCamera>) {
        let camera = Arc::new(camera);
        let session =
            DeviceSession::new(descriptor(name), camera.clone(), ClientConfig::default()).unwrap();
        (session, camera)
    }

    fn api_camera(methods: serde_json::Value) -> FakeCamera {
        FakeCamera::new(move |method, _| match method {
            "getVersions" => Ok(json!([["1.0", "1.1"]])),
            "getAvailableApiList" => Ok(methods.clone()),
            _ => Ok(json!([0])),
        })
    }

    #[test]
    fn missing_camera_endpoint_is_configuration_error() {
        let descriptor = DeviceDescriptor::new(
            "ILCE-7",
            EndpointTable::from_iter([("guide", "http://10.0.0.1/sony/guide")]),
        );
        let err = DeviceSession::new(
            descriptor,
            Arc::new(FakeCamera::accepting()),
            ClientConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Configuration { .. }));
    }

    #[tokio::test]
    async fn initialize_adopts_version_and_catalog() {
        let (session, camera) = session(
            "ILCE-7",
            api_camera(json!([["getVersions", "getAvailableApiList", "actTakePicture"]])),
        );
        assert_eq!(session.phase().await, SessionPhase::Uninitialized);

        let result = session.initialize().await.unwrap();
        assert!(!result.has_error());
        assert_eq!(session.phase().await, SessionPhase::Ready);
        assert_eq!(session.version().await, "1.0");
        assert_eq!(session.catalog().await.len(), 3);
        assert_eq!(camera.methods(), vec!["getVersions", "getAvailableApiList"]);

        // Subsequent requests carry the negotiated version.
        session.take_picture().await.unwrap();
        assert_eq!(camera.requests()[2].body["version"], "1.0");
    }

    #[tokio::test]
    async fn initialize_error_leaves_session_degraded_and_permissive() {
        let camera = FakeCamera::new(|method, _| match method {
            "getVersions" => Ok(json!({"error": [40401, "Camera Not Ready"]})),
            _ => Ok(json!([0])),
        });
        let (session, camera) = session("ILCE-7", camera);

        let result = session.initialize().await.unwrap();
        assert_eq!(result.error_code(), 40401);
        assert_eq!(result.error_text(), Some("Camera Not Ready"));
        assert_eq!(session.phase().await, SessionPhase::Degraded);
        assert_eq!(camera.methods(), vec!["getVersions"]);

        // Not gated.
        assert!(session.zoom_in().await.is_ok());
    }

    #[tokio::test]
    async fn api_list_error_is_surfaced() {
        let camera = FakeCamera::new(|method, _| match method {
            "getVersions" => Ok(json!([["1.0"]])),
            _ => Ok(json!({"error": [1, "Any"]})),
        });
        let (session, _camera) = session("ILCE-7", camera);

        let result = session.initialize().await.unwrap();
        assert_eq!(result.error_code(), 1);
        assert_eq!(session.phase().await, SessionPhase::Degraded);
        assert!(!session.catalog().await.is_populated());
    }

    #[tokio::test]
    async fn capability_gate_blocks_without_network() {
        let (session, camera) = session(
            "ILCE-7",
            api_camera(json!([["getVersions", "getAvailableApiList"]])),
        );
        session.initialize().await.unwrap();
        let before = camera.requests().len();

        let err = session.take_picture().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnsupportedMethod { ref method } if method == "actTakePicture"
        ));
        assert!(err.is_precondition());
        assert_eq!(camera.requests().len(), before);
    }

    #[tokio::test]
    async fn transport_failure_becomes_result() {
        let camera = FakeCamera::new(|_, _| Err(TransportError::Timeout("10s elapsed".into())));
        let (session, _camera) = session("ILCE-7", camera);

        let result = session.get_shoot_mode().await.unwrap();
        assert!(result.has_error());
        assert!(result.is_transport_failure());
        assert_eq!(result.error_code(), TRANSPORT_ERROR_CODE);
        assert_eq!(result.error_text(), Some("request timed out: 10s elapsed"));
        assert_eq!(result.id(), "1");
    }

    #[tokio::test]
    async fn dsc_quirk_rewrites_endpoint_and_event_method() {
        let (session, camera) = session("DSC-WX300", FakeCamera::accepting());
        assert!(session.is_quirk_mode());
        assert_eq!(session.camera_endpoint(), "http://10.0.0.1:10000/camera");

        session.get_event(false).await.unwrap();
        let requests = camera.requests();
        assert_eq!(requests[0].url, "http://10.0.0.1:10000/camera");
        assert_eq!(requests[0].method(), "receiveEvent");
        assert_eq!(requests[0].body["params"], json!([false]));
    }

    #[tokio::test]
    async fn standard_model_uses_get_event() {
        let (session, camera) = session("ILCE-7", FakeCamera::accepting());
        assert!(!session.is_quirk_mode());

        session.get_event(true).await.unwrap();
        let request = &camera.requests()[0];
        assert_eq!(request.url, "http://10.0.0.1:10000/sony/camera");
        assert_eq!(request.method(), "getEvent");
        assert_eq!(request.timeout, Some(Duration::from_secs(35)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_get_unique_ids() {
        let (session, camera) = session("ILCE-7", FakeCamera::accepting());
        let session = Arc::new(session);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move { session.hello().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let ids: HashSet<u64> = camera
            .requests()
            .iter()
            .map(|r| r.body["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn liveview_url_from_scalar_payload() {
        let camera = FakeCamera::new(|method, _| match method {
            "startLiveview" => Ok(json!(["http://10.0.0.1:60152/liveview.JPG?%211234"])),
            _ => Ok(json!([0])),
        });
        let (session, _camera) = session("ILCE-7", camera);

        let url = session.liveview_url().await.unwrap();
        assert_eq!(url, "http://10.0.0.1:60152/liveview.JPG?%211234");
    }

    #[tokio::test]
    async fn liveview_url_error_is_protocol_error() {
        let camera = FakeCamera::new(|_, _| Ok(json!({"error": [3, "Illegal Argument"]})));
        let (session, _camera) = session("ILCE-7", camera);

        let err = session.liveview_url().await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(ref e) if e.code == 3));
    }
}
