//! DataHub clients.
//!
//! Two independent roles against the same service:
//!
//! - [`DataHubReader`]: logs in over REST and reads the last stored value of
//!   one point.
//! - [`Publisher`]: holds one edge agent connection and pushes tagged
//!   records (scalars, arrays, base64 images) through it.
//!
//! No retries, batching, or store-and-forward. Every call blocks until the
//! transport returns.

mod agent;
mod auth;
mod error;
mod mqtt;
mod point;
mod publisher;
mod reader;
mod record;

pub use agent::{AgentOptions, ConnectType, EdgeAgent, EdgeType, SendOutcome};
pub use auth::Credential;
pub use error::DataHubError;
pub use mqtt::{BrokerEndpoint, MqttEdgeAgent, resolve_dccs};
pub use point::{DeviceMap, PointIdentity};
pub use publisher::Publisher;
pub use reader::{DataHubReader, RestOptions};

pub use datahub_protocol::{DataRecord, EdgeData, NO_INDEX, RealDataRecord, Scalar, TagType, TagValue};
