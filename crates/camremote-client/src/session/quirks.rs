//! Per-model protocol deviations.

/// Protocol details that differ between device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Profile name, for logs.
    pub name: &'static str,
    /// Friendly-name prefix selecting this profile. Empty for the fallback.
    pub friendly_name_prefix: &'static str,
    /// Path segment replaced by `/` in the camera endpoint, if any.
    pub strip_path_segment: Option<&'static str>,
    /// Method used to poll for camera events.
    pub event_method: &'static str,
}

/// Profile for devices that follow the documented protocol.
pub const STANDARD: DeviceProfile = DeviceProfile {
    name: "standard",
    friendly_name_prefix: "",
    strip_path_segment: None,
    event_method: "getEvent",
};

/// Profile for "DSC" compact cameras.
pub const DSC: DeviceProfile = DeviceProfile {
    name: "dsc",
    friendly_name_prefix: "DSC",
    strip_path_segment: Some("/sony/"),
    event_method: "receiveEvent",
};

/// Profiles with a prefix, checked in order.
const PROFILES: &[DeviceProfile] = &[DSC];

impl DeviceProfile {
    /// Selects the profile for a device from its friendly name.
    pub fn for_friendly_name(friendly_name: Option<&str>) -> Self {
        let Some(name) = friendly_name else {
            return STANDARD;
        };
        PROFILES
            .iter()
            .find(|p| name.starts_with(p.friendly_name_prefix))
            .copied()
            .unwrap_or(STANDARD)
    }

    /// Returns true if this profile deviates from the standard protocol.
    pub fn is_quirk(&self) -> bool {
        *self != STANDARD
    }

    /// Applies the endpoint rewrite to an advertised camera URL.
    pub fn camera_endpoint(&self, advertised: &str) -> String {
        match self.strip_path_segment {
            Some(segment) => advertised.replace(segment, "/"),
            None => advertised.to_string(),
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        STANDARD
    }
}
