// Shaping application values into records

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use datahub_protocol::{DataRecord, Scalar, TagValue};

use crate::error::DataHubError;

/// Seconds since the Unix epoch, fractional.
fn unix_secs(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// `[timestamp, base64(bytes)]`, the two-element array an image travels as.
fn image_items(bytes: &[u8], at: SystemTime) -> Vec<Scalar> {
    let b64 = base64::engine::general_purpose::STANDARD;
    vec![
        Scalar::Float(unix_secs(at)),
        Scalar::Text(b64.encode(bytes)),
    ]
}

/// Image file as array items, stamped with the current time.
pub(crate) fn read_image(path: &Path) -> Result<Vec<Scalar>, DataHubError> {
    let bytes = std::fs::read(path).map_err(|source| DataHubError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image_items(&bytes, SystemTime::now()))
}

/// Validate and wrap one value. Rejects what the service cannot store.
pub(crate) fn build_record(
    device_id: &str,
    tag_name: &str,
    value: TagValue,
) -> Result<DataRecord, DataHubError> {
    if device_id.trim().is_empty() {
        return Err(DataHubError::InvalidInput("device id must not be empty".into()));
    }
    if tag_name.trim().is_empty() {
        return Err(DataHubError::InvalidInput("tag name must not be empty".into()));
    }
    if !value.is_finite() {
        return Err(DataHubError::InvalidInput(format!(
            "tag '{}' has a non-finite value",
            tag_name
        )));
    }
    Ok(DataRecord::new(device_id, tag_name, value))
}
