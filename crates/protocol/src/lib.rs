//! DataHub wire format.
//!
//! This crate defines the canonical shapes exchanged with the DataHub
//! service, for both the REST boundary (login, tag creation, raw reads) and
//! the edge agent boundary (connection state and tagged data messages).
//!
//! No I/O lives here. Clients in `datahub-client` serialize these types and
//! hand them to a transport.
//!
//! # Usage
//!
//! ```ignore
//! use datahub_protocol::{DataRecord, EdgeData, DataMessage, TagValue};
//!
//! let record = DataRecord::new("dev1", "tag1", TagValue::from(5));
//! let data = EdgeData::single(record);
//! let payload = serde_json::to_vec(&DataMessage::from_edge_data(&data))?;
//! ```

mod agent;
mod rest;
mod value;

pub use agent::{ConnMessage, ConnState, DataMessage, Topics, format_ts};
pub use rest::{LoginRequest, RealDataQuery, RealDataRecord, TagCreateRequest, TagType};
pub use value::{DataRecord, EdgeData, Scalar, TagValue};

/// Sentinel index meaning "this point is not an array".
pub const NO_INDEX: i64 = -1;
