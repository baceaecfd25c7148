//! Error taxonomy shared by the reader and the publisher.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from DataHub operations.
///
/// Reads and connects return these directly. Sends only return them for
/// malformed input or unreadable files; transport failures on send are
/// reported through [`crate::SendOutcome`] instead.
#[derive(Debug, Error)]
pub enum DataHubError {
    /// Bad credentials, rejected session, or unreachable auth endpoint
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Edge agent connection could not be established
    #[error("agent connection failed: {0}")]
    Connection(String),

    /// Lookup returned no records
    #[error("no records found for tag '{tag}'")]
    NotFound { tag: String },

    /// Response body was not in the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Local file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mode key missing from the device map
    #[error("unknown mode '{mode}' (known modes: {})", .available.join(", "))]
    UnknownMode { mode: String, available: Vec<String> },

    /// Caller passed a value the service cannot represent
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The reader was used after `close()`
    #[error("session is closed")]
    SessionClosed,

    /// Non-success HTTP status outside of auth
    #[error("HTTP {0}: {1}")]
    Http(u16, String),

    /// Transport-level failure talking to the REST endpoint
    #[error("network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_lists_available() {
        let err = DataHubError::UnknownMode {
            mode: "lidar".into(),
            available: vec!["image".into(), "joint".into()],
        };
        assert_eq!(err.to_string(), "unknown mode 'lidar' (known modes: image, joint)");
    }

    #[test]
    fn test_io_error_names_path() {
        let err = DataHubError::Io {
            path: PathBuf::from("/tmp/missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.png"), "{}", msg);
        assert!(msg.contains("gone"), "{}", msg);
    }
}
