// Tag values and data records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tag value. Serialized as the bare JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// False only for NaN or infinite floats, which JSON cannot carry.
    pub fn is_finite(&self) -> bool {
        match self {
            Scalar::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    /// Parse a command-line style token: int, then float, then bool, else text.
    pub fn parse_loose(s: &str) -> Scalar {
        if let Ok(i) = s.parse::<i64>() {
            return Scalar::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Scalar::Float(f);
        }
        match s {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            _ => Scalar::Text(s.to_string()),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Value carried by a record: one scalar, or an ordered sequence of scalars.
///
/// Untagged on the wire: `5` and `[1,2,3]`, never `{"Single":5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Single(Scalar),
    Array(Vec<Scalar>),
}

impl TagValue {
    pub fn is_finite(&self) -> bool {
        match self {
            TagValue::Single(s) => s.is_finite(),
            TagValue::Array(items) => items.iter().all(Scalar::is_finite),
        }
    }

    pub fn as_array(&self) -> Option<&[Scalar]> {
        match self {
            TagValue::Array(items) => Some(items),
            TagValue::Single(_) => None,
        }
    }
}

macro_rules! single_from {
    ($($t:ty),*) => {
        $(impl From<$t> for TagValue {
            fn from(v: $t) -> Self {
                TagValue::Single(Scalar::from(v))
            }
        })*
    };
}

single_from!(bool, i32, i64, f64, &str, String);

impl From<Scalar> for TagValue {
    fn from(v: Scalar) -> Self {
        TagValue::Single(v)
    }
}

impl From<Vec<Scalar>> for TagValue {
    fn from(v: Vec<Scalar>) -> Self {
        TagValue::Array(v)
    }
}

/// One (device, tag, value) unit of data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRecord {
    pub device_id: String,
    pub tag_name: String,
    pub value: TagValue,
}

impl DataRecord {
    pub fn new(device_id: impl Into<String>, tag_name: impl Into<String>, value: TagValue) -> Self {
        Self {
            device_id: device_id.into(),
            tag_name: tag_name.into(),
            value,
        }
    }
}

/// A batch of records handed to the edge agent in one send.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub records: Vec<DataRecord>,
    pub timestamp: DateTime<Utc>,
}

impl EdgeData {
    pub fn new(records: Vec<DataRecord>) -> Self {
        Self { records, timestamp: Utc::now() }
    }

    pub fn single(record: DataRecord) -> Self {
        Self::new(vec![record])
    }
}
