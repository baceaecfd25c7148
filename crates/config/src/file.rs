// config.toml schema and conversion into client options

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use datahub_client::{
    AgentOptions, ConnectType, Credential, DeviceMap, EdgeType, PointIdentity, RestOptions, TagType,
};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::secrets;

/// `<config_dir>/datahub/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("datahub")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataHubConfig {
    pub rest: Option<RestSection>,
    pub point: Option<PointSection>,
    pub agent: Option<AgentSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestSection {
    /// API base URL, including the version prefix (".../api/v1")
    pub api_base: String,
    pub username: String,
    /// Environment variable holding the password
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointSection {
    pub node_id: String,
    pub tag_name: String,
    /// Key into `devices`
    pub mode: String,
    #[serde(default)]
    pub tag_type: TagType,
    #[serde(default)]
    pub array_size: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub devices: DeviceMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectKind {
    Dccs,
    Mqtt,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    pub node_id: String,
    #[serde(default)]
    pub edge_type: EdgeType,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_true")]
    pub data_recover: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub use_secure: bool,
    pub connect_type: ConnectKind,
    #[serde(default)]
    pub dccs: Option<DccsSection>,
    #[serde(default)]
    pub mqtt: Option<MqttSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DccsSection {
    pub api_url: String,
    #[serde(default = "default_credential_key_env")]
    pub credential_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttSection {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub username: String,
    #[serde(default = "default_mqtt_password_env")]
    pub password_env: String,
}

fn default_password_env() -> String {
    "DATAHUB_PASSWORD".to_string()
}

fn default_credential_key_env() -> String {
    "DATAHUB_CREDENTIAL_KEY".to_string()
}

fn default_mqtt_password_env() -> String {
    "DATAHUB_MQTT_PASSWORD".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_heartbeat_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_true() -> bool {
    true
}

impl DataHubConfig {
    /// Load from `path`, or from [`default_config_path`] when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let contents = fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        let config = Self::from_toml_str(&contents)
            .map_err(|message| ConfigError::Parse { path: path.clone(), message })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }

    pub fn rest(&self) -> Result<&RestSection, ConfigError> {
        self.rest.as_ref().ok_or(ConfigError::MissingSection("rest"))
    }

    pub fn point(&self) -> Result<&PointSection, ConfigError> {
        self.point.as_ref().ok_or(ConfigError::MissingSection("point"))
    }

    pub fn agent(&self) -> Result<&AgentSection, ConfigError> {
        self.agent.as_ref().ok_or(ConfigError::MissingSection("agent"))
    }

    pub fn rest_options(&self) -> Result<RestOptions, ConfigError> {
        let rest = self.rest()?;
        Ok(RestOptions::new(rest.api_base.clone())
            .with_timeout(Duration::from_secs(rest.timeout_secs)))
    }

    /// Username from the file, password from keychain or environment.
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        let rest = self.rest()?;
        let password = secrets::require("rest/password", &rest.password_env)?;
        Ok(Credential::new(rest.username.clone(), password))
    }

    /// Point identity with its device resolved from `mode`.
    pub fn point_identity(&self) -> Result<PointIdentity, ConfigError> {
        let point = self.point()?;
        let mut identity = PointIdentity::resolve(
            point.node_id.clone(),
            &point.devices,
            &point.mode,
            point.tag_name.clone(),
        )?
        .with_tag_type(point.tag_type)
        .with_array_size(point.array_size);
        if let Some(description) = &point.description {
            identity = identity.with_description(description.clone());
        }
        Ok(identity)
    }

    pub fn agent_options(&self) -> Result<AgentOptions, ConfigError> {
        let agent = self.agent()?;
        let connect_type = match agent.connect_type {
            ConnectKind::Dccs => {
                let dccs = agent.dccs.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("connect_type = \"dccs\" needs an [agent.dccs] section".into())
                })?;
                ConnectType::Dccs {
                    api_url: dccs.api_url.clone(),
                    credential_key: secrets::require("agent/credential-key", &dccs.credential_key_env)?,
                }
            }
            ConnectKind::Mqtt => {
                let mqtt = agent.mqtt.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("connect_type = \"mqtt\" needs an [agent.mqtt] section".into())
                })?;
                ConnectType::Mqtt {
                    host: mqtt.host.clone(),
                    port: mqtt.port,
                    username: mqtt.username.clone(),
                    password: secrets::require("agent/mqtt-password", &mqtt.password_env)?,
                }
            }
        };

        if agent.heartbeat_secs == 0 {
            return Err(ConfigError::Invalid("heartbeat_secs must be at least 1".into()));
        }
        if agent.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("connect_timeout_secs must be at least 1".into()));
        }

        let mut options = AgentOptions::new(agent.node_id.clone(), connect_type);
        options.edge_type = agent.edge_type;
        options.heartbeat = Duration::from_secs(agent.heartbeat_secs);
        options.data_recover = agent.data_recover;
        options.connect_timeout = Duration::from_secs(agent.connect_timeout_secs);
        options.use_secure = agent.use_secure;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datahub_client::DataHubError;

    const FULL: &str = r#"
[rest]
api_base = "https://portal-datahub.example.com/api/v1"
username = "operator@example.com"
password_env = "DATAHUB_TEST_PW_FULL"

[point]
node_id = "node-a"
tag_name = "joint_angle_3"
mode = "joint"
array_size = 6

[point.devices]
joint = "arm-joint"
image = "camera-01"
pointcloud = "lidar-01"

[agent]
node_id = "node-a"
edge_type = "device"
heartbeat_secs = 30
connect_type = "dccs"

[agent.dccs]
api_url = "https://api-dccs.example.com"
credential_key_env = "DATAHUB_TEST_CK_FULL"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = DataHubConfig::from_toml_str(FULL).unwrap();
        let rest = config.rest().unwrap();
        assert_eq!(rest.timeout_secs, 30);
        assert_eq!(rest.password_env, "DATAHUB_TEST_PW_FULL");

        let point = config.point_identity().unwrap();
        assert_eq!(point.device_id(), "arm-joint");
        assert_eq!(point.array_size(), 6);
        assert_eq!(point.tag_type(), TagType::Analog);

        let agent = config.agent().unwrap();
        assert_eq!(agent.edge_type, EdgeType::Device);
        assert!(agent.data_recover);
        assert_eq!(agent.connect_type, ConnectKind::Dccs);
    }

    #[test]
    fn test_agent_options_resolve_secret() {
        std::env::set_var("DATAHUB_TEST_CK_FULL", "ck-abc");
        let config = DataHubConfig::from_toml_str(FULL).unwrap();
        let options = config.agent_options().unwrap();
        std::env::remove_var("DATAHUB_TEST_CK_FULL");

        assert_eq!(options.heartbeat, Duration::from_secs(30));
        assert_eq!(options.edge_type, EdgeType::Device);
        assert_eq!(
            options.connect_type,
            ConnectType::Dccs {
                api_url: "https://api-dccs.example.com".into(),
                credential_key: "ck-abc".into(),
            }
        );
    }

    #[test]
    fn test_missing_password_is_error() {
        let config = DataHubConfig::from_toml_str(FULL).unwrap();
        assert!(matches!(config.credential(), Err(ConfigError::MissingSecret(_))));
    }

    #[test]
    fn test_unknown_mode_surfaces_client_error() {
        let toml = FULL.replace("mode = \"joint\"", "mode = \"thermal\"");
        let config = DataHubConfig::from_toml_str(&toml).unwrap();
        match config.point_identity() {
            Err(ConfigError::Client(DataHubError::UnknownMode { mode, .. })) => assert_eq!(mode, "thermal"),
            other => panic!("expected UnknownMode, got {:?}", other),
        }
    }

    #[test]
    fn test_mqtt_without_section_is_invalid() {
        let toml = r#"
[agent]
node_id = "n"
connect_type = "mqtt"
"#;
        let config = DataHubConfig::from_toml_str(toml).unwrap();
        assert!(matches!(config.agent_options(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_mqtt_defaults_port() {
        let toml = r#"
[agent]
node_id = "n"
connect_type = "mqtt"

[agent.mqtt]
host = "broker.local"
username = "edge"
password_env = "DATAHUB_TEST_MQTT_PW"
"#;
        std::env::set_var("DATAHUB_TEST_MQTT_PW", "pw");
        let config = DataHubConfig::from_toml_str(toml).unwrap();
        let options = config.agent_options().unwrap();
        std::env::remove_var("DATAHUB_TEST_MQTT_PW");

        match options.connect_type {
            ConnectType::Mqtt { host, port, .. } => {
                assert_eq!(host, "broker.local");
                assert_eq!(port, 1883);
            }
            other => panic!("expected Mqtt, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_durations_are_invalid() {
        std::env::set_var("DATAHUB_TEST_CK_ZERO", "ck");
        let base = FULL.replace("DATAHUB_TEST_CK_FULL", "DATAHUB_TEST_CK_ZERO");

        let toml = base.replace("heartbeat_secs = 30", "heartbeat_secs = 0");
        let config = DataHubConfig::from_toml_str(&toml).unwrap();
        assert!(matches!(config.agent_options(), Err(ConfigError::Invalid(_))));

        let toml = base.replace("heartbeat_secs = 30", "heartbeat_secs = 30\nconnect_timeout_secs = 0");
        let config = DataHubConfig::from_toml_str(&toml).unwrap();
        match config.agent_options() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("connect_timeout_secs"), "{}", msg),
            other => panic!("expected Invalid, got {:?}", other),
        }
        std::env::remove_var("DATAHUB_TEST_CK_ZERO");
    }

    #[test]
    fn test_missing_sections() {
        let config = DataHubConfig::from_toml_str("").unwrap();
        assert!(matches!(config.rest_options(), Err(ConfigError::MissingSection("rest"))));
        assert!(matches!(config.point_identity(), Err(ConfigError::MissingSection("point"))));
        assert!(matches!(config.agent_options(), Err(ConfigError::MissingSection("agent"))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = DataHubConfig::from_toml_str("[rest]\napi_base = \"x\"\nusername = \"u\"\npassword = \"inline\"\n")
            .unwrap_err();
        assert!(err.contains("password"), "{}", err);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, FULL).unwrap();

        let config = DataHubConfig::load(Some(&path)).unwrap();
        assert_eq!(config.rest_options().unwrap().api_base, "https://portal-datahub.example.com/api/v1");

        let missing = dir.path().join("absent.toml");
        assert!(matches!(DataHubConfig::load(Some(&missing)), Err(ConfigError::NotFound(_))));

        std::fs::write(&path, "[rest\n").unwrap();
        assert!(matches!(DataHubConfig::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_path_under_datahub() {
        let path = default_config_path();
        assert!(path.ends_with("datahub/config.toml"));
    }
}
