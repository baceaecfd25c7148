use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("secret '{0}' not found in keychain or environment")]
    MissingSecret(String),

    #[error("config has no [{0}] section")]
    MissingSection(&'static str),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Client(#[from] datahub_client::DataHubError),
}
