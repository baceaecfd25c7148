//! Point identity: which node / device / tag a reader addresses.

use std::collections::BTreeMap;

use datahub_protocol::{TagCreateRequest, TagType};
use serde::{Deserialize, Serialize};

use crate::error::DataHubError;

/// Mode tag → device id (e.g. `joint`, `image`, `pointcloud`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceMap(BTreeMap<String, String>);

impl DeviceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mode: impl Into<String>, device_id: impl Into<String>) -> Self {
        self.0.insert(mode.into(), device_id.into());
        self
    }

    /// Look up the device id for `mode`, failing with the list of known modes.
    pub fn resolve(&self, mode: &str) -> Result<&str, DataHubError> {
        self.0.get(mode).map(String::as_str).ok_or_else(|| DataHubError::UnknownMode {
            mode: mode.to_string(),
            available: self.modes().map(String::from).collect(),
        })
    }

    pub fn modes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DeviceMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One addressable data point. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointIdentity {
    node_id: String,
    device_id: String,
    tag_name: String,
    tag_type: TagType,
    array_size: u32,
    description: Option<String>,
}

impl PointIdentity {
    /// Build a point whose device id is picked from `devices` by `mode`.
    ///
    /// The mode is resolved here, once. An unknown mode fails before any
    /// client touches the network.
    pub fn resolve(
        node_id: impl Into<String>,
        devices: &DeviceMap,
        mode: &str,
        tag_name: impl Into<String>,
    ) -> Result<Self, DataHubError> {
        let device_id = devices.resolve(mode)?.to_string();
        Self::new(node_id, device_id, tag_name)
    }

    pub fn new(
        node_id: impl Into<String>,
        device_id: impl Into<String>,
        tag_name: impl Into<String>,
    ) -> Result<Self, DataHubError> {
        let point = Self {
            node_id: node_id.into(),
            device_id: device_id.into(),
            tag_name: tag_name.into(),
            tag_type: TagType::default(),
            array_size: 0,
            description: None,
        };
        for (label, value) in [
            ("node id", &point.node_id),
            ("device id", &point.device_id),
            ("tag name", &point.tag_name),
        ] {
            if value.trim().is_empty() {
                return Err(DataHubError::InvalidInput(format!("{} must not be empty", label)));
            }
        }
        Ok(point)
    }

    pub fn with_tag_type(mut self, tag_type: TagType) -> Self {
        self.tag_type = tag_type;
        self
    }

    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    pub fn is_array(&self) -> bool {
        self.array_size > 0
    }

    /// Explicit description, or "Plant ID" + the last `_` segment of the tag name.
    pub fn description(&self) -> String {
        match &self.description {
            Some(d) => d.clone(),
            None => {
                let suffix = self.tag_name.rsplit('_').next().unwrap_or_default();
                format!("Plant ID{}", suffix)
            }
        }
    }

    pub(crate) fn create_body<'a>(&'a self, description: &'a str) -> TagCreateRequest<'a> {
        TagCreateRequest {
            node_id: &self.node_id,
            device_id: &self.device_id,
            tag_name: &self.tag_name,
            tag_type: self.tag_type,
            description,
            read_only: false,
            array_size: self.array_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> DeviceMap {
        DeviceMap::new()
            .with("joint", "arm-joint")
            .with("image", "camera-01")
            .with("pointcloud", "lidar-01")
    }

    #[test]
    fn test_resolve_picks_device_by_mode() {
        let point = PointIdentity::resolve("node-a", &devices(), "image", "frame_7").unwrap();
        assert_eq!(point.device_id(), "camera-01");
        assert_eq!(point.node_id(), "node-a");
        assert_eq!(point.tag_name(), "frame_7");
        assert!(!point.is_array());
    }

    #[test]
    fn test_unknown_mode_fails_with_known_modes() {
        let err = PointIdentity::resolve("node-a", &devices(), "thermal", "t").unwrap_err();
        match err {
            DataHubError::UnknownMode { mode, available } => {
                assert_eq!(mode, "thermal");
                assert_eq!(available, vec!["image", "joint", "pointcloud"]);
            }
            other => panic!("expected UnknownMode, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(matches!(
            PointIdentity::new("", "dev", "tag"),
            Err(DataHubError::InvalidInput(_))
        ));
        assert!(matches!(
            PointIdentity::new("node", "dev", "  "),
            Err(DataHubError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_default_description_uses_tag_suffix() {
        let point = PointIdentity::new("n", "d", "joint_angle_3").unwrap();
        assert_eq!(point.description(), "Plant ID3");

        let point = PointIdentity::new("n", "d", "plain").unwrap();
        assert_eq!(point.description(), "Plant IDplain");

        let point = point.with_description("Gripper force");
        assert_eq!(point.description(), "Gripper force");
    }

    #[test]
    fn test_device_map_from_iter_and_toml_shape() {
        let map: DeviceMap = [("joint", "arm-joint")].into_iter().collect();
        assert_eq!(map.resolve("joint").unwrap(), "arm-joint");
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"joint": "arm-joint"}));
    }
}
