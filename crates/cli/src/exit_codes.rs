//! CLI Exit Code Registry
//!
//! Single source of truth for `datahub` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | Usage or configuration error                     |
//! | 40   | Authentication failed or session rejected        |
//! | 41   | Point has no stored records                      |
//! | 42   | Network or HTTP error talking to the REST API    |
//! | 43   | Edge agent connection could not be established  |
//! | 44   | Record was not delivered by the agent            |
//! | 45   | Response body could not be parsed                |
//! | 46   | Local file could not be read                     |

use datahub_client::DataHubError;
use datahub_config::ConfigError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or invalid config.
pub const EXIT_USAGE: u8 = 2;

/// Bad credentials, expired session, or unreachable auth endpoint.
pub const EXIT_AUTH: u8 = 40;

/// Lookup returned no records.
pub const EXIT_NOT_FOUND: u8 = 41;

/// Network failure or non-success HTTP status.
pub const EXIT_NETWORK: u8 = 42;

/// Agent connection failed.
pub const EXIT_CONNECT: u8 = 43;

/// Send returned a non-delivered outcome.
pub const EXIT_NOT_DELIVERED: u8 = 44;

/// Malformed response body.
pub const EXIT_PARSE: u8 = 45;

/// Local file unreadable.
pub const EXIT_IO: u8 = 46;

/// Map a client error to its exit code.
pub fn client_exit_code(err: &DataHubError) -> u8 {
    match err {
        DataHubError::Auth(_) | DataHubError::SessionClosed => EXIT_AUTH,
        DataHubError::NotFound { .. } => EXIT_NOT_FOUND,
        DataHubError::Network(_) | DataHubError::Http(..) => EXIT_NETWORK,
        DataHubError::Connection(_) => EXIT_CONNECT,
        DataHubError::Parse(_) => EXIT_PARSE,
        DataHubError::Io { .. } => EXIT_IO,
        DataHubError::UnknownMode { .. } | DataHubError::InvalidInput(_) => EXIT_USAGE,
    }
}

/// Map a config error to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Client(inner) => client_exit_code(inner),
        ConfigError::Io { .. } => EXIT_IO,
        _ => EXIT_USAGE,
    }
}
