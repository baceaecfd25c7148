// REST request / response bodies

use serde::{Deserialize, Deserializer, Serialize};

use crate::value::TagValue;

/// Body for `POST /Auth`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Tag data type, sent as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TagType {
    #[default]
    Analog,
    Discrete,
    Text,
}

impl TagType {
    pub fn code(self) -> u8 {
        match self {
            TagType::Analog => 1,
            TagType::Discrete => 2,
            TagType::Text => 3,
        }
    }
}

impl From<TagType> for u8 {
    fn from(t: TagType) -> u8 {
        t.code()
    }
}

impl TryFrom<u8> for TagType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TagType::Analog),
            2 => Ok(TagType::Discrete),
            3 => Ok(TagType::Text),
            other => Err(format!("unknown tag type code {}", other)),
        }
    }
}

/// Body for `POST /Tags`. The service ignores it if the tag already exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCreateRequest<'a> {
    pub node_id: &'a str,
    pub device_id: &'a str,
    pub tag_name: &'a str,
    pub tag_type: TagType,
    pub description: &'a str,
    pub read_only: bool,
    pub array_size: u32,
}

/// Body for `POST /RealData/raw`.
///
/// `index` is omitted entirely for non-array points.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealDataQuery<'a> {
    pub node_id: &'a str,
    pub device_id: &'a str,
    pub tag_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// One record in the `/RealData/raw` response array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealDataRecord {
    pub value: TagValue,
    /// As sent: RFC 3339 text, or an epoch number rendered as text.
    #[serde(default, deserialize_with = "lenient_ts")]
    pub ts: Option<String>,
    #[serde(default)]
    pub tag_name: Option<String>,
}

fn lenient_ts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
