// Configuration loading
//
// Settings live in ~/.config/datahub/config.toml. Secrets never do: the file
// names where to find them (keychain entry or environment variable).

mod error;
mod file;
pub mod secrets;

pub use error::ConfigError;
pub use file::{
    AgentSection, ConnectKind, DataHubConfig, DccsSection, MqttSection, PointSection, RestSection,
    default_config_path,
};
