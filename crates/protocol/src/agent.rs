// Edge agent messages and topics

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{EdgeData, Scalar, TagValue};

/// Format a timestamp the way the agent endpoint expects (UTC, millisecond precision).
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// MQTT topics for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub data: String,
    pub conn: String,
}

impl Topics {
    pub fn for_node(node_id: &str) -> Self {
        Self {
            data: format!("/wisepaas/scada/{}/data", node_id),
            conn: format!("/wisepaas/scada/{}/conn", node_id),
        }
    }
}

/// Connection state markers published on the conn topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnState {
    /// Connected
    #[serde(rename = "Con")]
    Connected,
    /// Heartbeat
    #[serde(rename = "Hbt")]
    Heartbeat,
    /// Graceful disconnect
    #[serde(rename = "DsC")]
    Disconnected,
    /// Unexpected disconnect (last will)
    #[serde(rename = "UeD")]
    Unexpected,
}

/// `{"d":{"Con":1},"ts":"..."}` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnMessage {
    pub d: BTreeMap<ConnState, u8>,
    pub ts: String,
}

impl ConnMessage {
    pub fn new(state: ConnState, ts: &DateTime<Utc>) -> Self {
        let mut d = BTreeMap::new();
        d.insert(state, 1);
        Self { d, ts: format_ts(ts) }
    }

    pub fn now(state: ConnState) -> Self {
        Self::new(state, &Utc::now())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // A map of unit markers to integers cannot fail to serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Data message: `{"d":{"<device>":{"<tag>":<value>}},"ts":"..."}`.
///
/// Array values go out as index-keyed objects (`{"0":v0,"1":v1}`), which is
/// how the ingestion side addresses array elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMessage {
    pub d: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    pub ts: String,
}

impl DataMessage {
    pub fn from_edge_data(data: &EdgeData) -> Self {
        let mut d: BTreeMap<String, BTreeMap<String, serde_json::Value>> = BTreeMap::new();
        for record in &data.records {
            d.entry(record.device_id.clone())
                .or_default()
                .insert(record.tag_name.clone(), wire_value(&record.value));
        }
        Self { d, ts: format_ts(&data.timestamp) }
    }
}

fn scalar_json(s: &Scalar) -> serde_json::Value {
    match s {
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Int(i) => serde_json::Value::from(*i),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Scalar::Text(t) => serde_json::Value::String(t.clone()),
    }
}

fn wire_value(value: &TagValue) -> serde_json::Value {
    match value {
        TagValue::Single(s) => scalar_json(s),
        TagValue::Array(items) => {
            let obj: serde_json::Map<String, serde_json::Value> = items
                .iter()
                .enumerate()
                .map(|(i, s)| (i.to_string(), scalar_json(s)))
                .collect();
            serde_json::Value::Object(obj)
        }
    }
}
