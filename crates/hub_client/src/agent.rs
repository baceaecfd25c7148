//! Edge agent boundary: options, the agent trait, and send outcomes.

use std::fmt;
use std::time::Duration;

use datahub_protocol::EdgeData;
use serde::{Deserialize, Serialize};

use crate::error::DataHubError;

const DEFAULT_HEARTBEAT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024; // 16 MB

/// Result of handing one record to the agent.
///
/// Sends never fail with an error for transport problems; callers that only
/// care about success can convert to `bool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted by the agent for delivery
    Delivered,
    /// Refused by the agent (e.g. payload too large)
    Rejected(String),
    /// Connection down or request queue closed
    TransportError(String),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

impl From<SendOutcome> for bool {
    fn from(outcome: SendOutcome) -> bool {
        outcome.is_delivered()
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendOutcome::Delivered => write!(f, "delivered"),
            SendOutcome::Rejected(reason) => write!(f, "rejected: {}", reason),
            SendOutcome::TransportError(reason) => write!(f, "transport error: {}", reason),
        }
    }
}

/// Role the agent announces itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    #[default]
    Gateway,
    Device,
}

/// How the agent finds its broker.
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectType {
    /// Resolve broker credentials from the credential service
    Dccs { api_url: String, credential_key: String },
    /// Connect to a known broker directly
    Mqtt { host: String, port: u16, username: String, password: String },
}

impl fmt::Debug for ConnectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectType::Dccs { api_url, .. } => f
                .debug_struct("Dccs")
                .field("api_url", api_url)
                .field("credential_key", &"<redacted>")
                .finish(),
            ConnectType::Mqtt { host, port, username, .. } => f
                .debug_struct("Mqtt")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Connection parameters for one edge agent.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub node_id: String,
    pub edge_type: EdgeType,
    pub heartbeat: Duration,
    /// Forwarded for compatibility; store-and-forward is not performed.
    pub data_recover: bool,
    pub connect_type: ConnectType,
    /// How long `connect` waits for the broker to acknowledge
    pub connect_timeout: Duration,
    pub use_secure: bool,
    pub max_payload_bytes: usize,
}

impl AgentOptions {
    pub fn new(node_id: impl Into<String>, connect_type: ConnectType) -> Self {
        Self {
            node_id: node_id.into(),
            edge_type: EdgeType::default(),
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            data_recover: true,
            connect_type,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            use_secure: false,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// A live connection to the delivery agent.
///
/// Implementations own their connection exclusively and are driven from a
/// single call site.
pub trait EdgeAgent {
    /// Hand `data` to the agent. Never blocks on delivery confirmation.
    fn send_data(&mut self, data: &EdgeData) -> SendOutcome;

    /// Tear the connection down. Must tolerate being called twice.
    fn disconnect(&mut self) -> Result<(), DataHubError>;

    fn is_connected(&self) -> bool;
}
