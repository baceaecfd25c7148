//! REST reader client.
//!
//! Blocking reqwest client (no Tokio runtime required). Logs in once, keeps
//! the session cookie, and reads the last stored value of a single point.

use std::time::Duration;

use datahub_protocol::{NO_INDEX, RealDataQuery, RealDataRecord, TagValue};
use log::{debug, info};
use serde::Serialize;

use crate::auth::Credential;
use crate::error::DataHubError;
use crate::point::PointIdentity;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the REST API lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct RestOptions {
    /// API base URL, e.g. "https://portal-datahub.example.com/api/v1"
    pub api_base: String,
    pub timeout: Duration,
}

impl RestOptions {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Reader for one point. Owns its session exclusively.
pub struct DataHubReader {
    http: Option<reqwest::blocking::Client>,
    options: RestOptions,
    point: PointIdentity,
}

impl DataHubReader {
    /// Log in and return a reader bound to `point`.
    ///
    /// The credential is consumed by the login request and not kept.
    pub fn connect(
        options: RestOptions,
        credential: Credential,
        point: PointIdentity,
    ) -> Result<Self, DataHubError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("datahub-client/{}", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| DataHubError::Network(e.to_string()))?;

        login(&http, &options, credential)?;

        Ok(Self { http: Some(http), options, point })
    }

    pub fn point(&self) -> &PointIdentity {
        &self.point
    }

    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    /// Create the point's tag. A tag that already exists is left untouched.
    pub fn ensure_tag(&self) -> Result<(), DataHubError> {
        let description = self.point.description();
        let body = self.point.create_body(&description);
        debug!("Ensuring tag {}/{}", self.point.device_id(), self.point.tag_name());
        self.post_json("Tags", &body)?;
        Ok(())
    }

    /// Last stored value of the point.
    ///
    /// `index` is the array offset, or [`NO_INDEX`] (-1) for a non-array point.
    pub fn read_last(&self, index: i64) -> Result<TagValue, DataHubError> {
        self.read_last_record(index).map(|record| record.value)
    }

    /// Like [`read_last`](Self::read_last) but keeps the record's timestamp.
    pub fn read_last_record(&self, index: i64) -> Result<RealDataRecord, DataHubError> {
        let index = match index {
            NO_INDEX => None,
            i => Some(u32::try_from(i).map_err(|_| {
                DataHubError::InvalidInput(format!(
                    "index must be -1 or a non-negative array offset, got {}",
                    i
                ))
            })?),
        };

        let query = RealDataQuery {
            node_id: self.point.node_id(),
            device_id: self.point.device_id(),
            tag_name: self.point.tag_name(),
            index,
        };
        debug!("Reading last value of {} (index {:?})", self.point.tag_name(), index);

        let response = self.post_json("RealData/raw", &query)?;
        let body = response.text().map_err(|e| DataHubError::Network(e.to_string()))?;
        first_record(&body, self.point.tag_name())
    }

    /// Release the session. Safe to call more than once.
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            info!("DataHub session closed");
        } else {
            debug!("DataHub session already closed");
        }
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::blocking::Response, DataHubError> {
        let http = self.http.as_ref().ok_or(DataHubError::SessionClosed)?;
        let url = self.options.url(path);

        let response = http.post(&url)
            .json(body)
            .send()
            .map_err(|e| DataHubError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            if status == 401 || status == 403 {
                return Err(DataHubError::Auth(format!("session rejected (HTTP {}): {}", status, body)));
            }
            return Err(DataHubError::Http(status, body));
        }

        Ok(response)
    }
}

fn login(
    http: &reqwest::blocking::Client,
    options: &RestOptions,
    credential: Credential,
) -> Result<(), DataHubError> {
    let url = options.url("Auth");
    let response = http.post(&url)
        .json(&credential.login_body())
        .send()
        .map_err(|e| DataHubError::Auth(format!("cannot reach {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(DataHubError::Auth(format!("HTTP {}: {}", status.as_u16(), body)));
    }

    info!("Logged in to {} as {}", options.api_base, credential.username());
    Ok(())
}

fn first_record(body: &str, tag: &str) -> Result<RealDataRecord, DataHubError> {
    let records: Vec<RealDataRecord> = serde_json::from_str(body)
        .map_err(|e| DataHubError::Parse(format!("RealData/raw response: {}", e)))?;
    records.into_iter().next().ok_or_else(|| DataHubError::NotFound { tag: tag.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use datahub_protocol::Scalar;
    use httpmock::prelude::*;

    fn point() -> PointIdentity {
        PointIdentity::new("node-a", "arm-joint", "joint_angle_3")
            .unwrap()
            .with_array_size(6)
    }

    fn mock_login(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/Auth")
                .json_body(serde_json::json!({"username": "alice", "password": "pw"}));
            then.status(200)
                .header("set-cookie", "EIToken=abc123; Path=/")
                .json_body(serde_json::json!({"accessToken": "abc123"}));
        })
    }

    fn connect(server: &MockServer) -> DataHubReader {
        DataHubReader::connect(
            RestOptions::new(server.base_url()),
            Credential::new("alice", "pw"),
            point(),
        )
        .unwrap()
    }

    #[test]
    fn test_url_join() {
        let opts = RestOptions::new("https://host/api/v1/");
        assert_eq!(opts.url("Auth"), "https://host/api/v1/Auth");
        assert_eq!(opts.url("/RealData/raw"), "https://host/api/v1/RealData/raw");
    }

    #[test]
    fn test_login_rejected_is_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/Auth");
            then.status(401).body("bad credentials");
        });

        let result = DataHubReader::connect(
            RestOptions::new(server.base_url()),
            Credential::new("alice", "wrong"),
            point(),
        );
        match result {
            Err(DataHubError::Auth(msg)) => assert!(msg.contains("401"), "{}", msg),
            Err(other) => panic!("expected Auth, got {:?}", other),
            Ok(_) => panic!("expected Auth error"),
        }
    }

    #[test]
    fn test_login_unreachable_is_auth_error() {
        // Port 9 (discard) on localhost is not listening in test environments
        let result = DataHubReader::connect(
            RestOptions::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
            Credential::new("alice", "pw"),
            point(),
        );
        assert!(matches!(result, Err(DataHubError::Auth(_))));
    }

    #[test]
    fn test_read_last_sends_index() {
        let server = MockServer::start();
        let login = mock_login(&server);
        let read = server.mock(|when, then| {
            when.method(POST)
                .path("/RealData/raw")
                .json_body(serde_json::json!({
                    "nodeId": "node-a",
                    "deviceId": "arm-joint",
                    "tagName": "joint_angle_3",
                    "index": 2
                }));
            then.status(200)
                .json_body(serde_json::json!([{"tagName": "joint_angle_3", "value": 41.5, "ts": "2026-01-01T00:00:00Z"}]));
        });

        let reader = connect(&server);
        let value = reader.read_last(2).unwrap();

        login.assert();
        read.assert();
        assert_eq!(value, TagValue::Single(Scalar::Float(41.5)));
    }

    #[test]
    fn test_read_last_without_index_omits_field() {
        let server = MockServer::start();
        mock_login(&server);
        let read = server.mock(|when, then| {
            when.method(POST)
                .path("/RealData/raw")
                .json_body(serde_json::json!({
                    "nodeId": "node-a",
                    "deviceId": "arm-joint",
                    "tagName": "joint_angle_3"
                }));
            then.status(200).json_body(serde_json::json!([{"value": [1, 2, 3]}, {"value": 0}]));
        });

        let reader = connect(&server);
        let value = reader.read_last(NO_INDEX).unwrap();

        read.assert();
        assert_eq!(value, TagValue::Array(vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]));
    }

    #[test]
    fn test_read_last_empty_is_not_found() {
        let server = MockServer::start();
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/RealData/raw");
            then.status(200).json_body(serde_json::json!([]));
        });

        let reader = connect(&server);
        match reader.read_last(NO_INDEX) {
            Err(DataHubError::NotFound { tag }) => assert_eq!(tag, "joint_angle_3"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_read_last_malformed_is_parse_error() {
        let server = MockServer::start();
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/RealData/raw");
            then.status(200).body("<html>maintenance</html>");
        });

        let reader = connect(&server);
        assert!(matches!(reader.read_last(0), Err(DataHubError::Parse(_))));
    }

    #[test]
    fn test_read_last_record_missing_value_is_parse_error() {
        assert!(matches!(
            first_record(r#"[{"ts": "2026-01-01T00:00:00Z"}]"#, "t"),
            Err(DataHubError::Parse(_))
        ));
        assert!(matches!(first_record(r#"{"value": 1}"#, "t"), Err(DataHubError::Parse(_))));
    }

    #[test]
    fn test_read_last_rejects_negative_index() {
        let server = MockServer::start();
        mock_login(&server);
        let read = server.mock(|when, then| {
            when.method(POST).path("/RealData/raw");
            then.status(200).json_body(serde_json::json!([{"value": 1}]));
        });

        let reader = connect(&server);
        assert!(matches!(reader.read_last(-5), Err(DataHubError::InvalidInput(_))));
        read.assert_calls(0);
    }

    #[test]
    fn test_expired_session_is_auth_error() {
        let server = MockServer::start();
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/RealData/raw");
            then.status(401).body("token expired");
        });

        let reader = connect(&server);
        assert!(matches!(reader.read_last(NO_INDEX), Err(DataHubError::Auth(_))));
    }

    #[test]
    fn test_server_error_is_http_error() {
        let server = MockServer::start();
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/RealData/raw");
            then.status(503).body("unavailable");
        });

        let reader = connect(&server);
        match reader.read_last(NO_INDEX) {
            Err(DataHubError::Http(503, body)) => assert_eq!(body, "unavailable"),
            other => panic!("expected Http(503), got {:?}", other),
        }
    }

    #[test]
    fn test_session_cookie_is_reused() {
        let server = MockServer::start();
        mock_login(&server);
        let read = server.mock(|when, then| {
            when.method(POST)
                .path("/RealData/raw")
                .header_exists("cookie");
            then.status(200).json_body(serde_json::json!([{"value": 7}]));
        });

        let reader = connect(&server);
        assert_eq!(reader.read_last(NO_INDEX).unwrap(), TagValue::from(7));
        read.assert();
    }

    #[test]
    fn test_ensure_tag_posts_definition() {
        let server = MockServer::start();
        mock_login(&server);
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/Tags")
                .json_body(serde_json::json!({
                    "nodeId": "node-a",
                    "deviceId": "arm-joint",
                    "tagName": "joint_angle_3",
                    "tagType": 1,
                    "description": "Plant ID3",
                    "readOnly": false,
                    "arraySize": 6
                }));
            then.status(200).json_body(serde_json::json!({}));
        });

        let reader = connect(&server);
        reader.ensure_tag().unwrap();
        create.assert();
    }

    #[test]
    fn test_close_rejects_further_reads() {
        let server = MockServer::start();
        mock_login(&server);
        let read = server.mock(|when, then| {
            when.method(POST).path("/RealData/raw");
            then.status(200).json_body(serde_json::json!([{"value": 1}]));
        });

        let mut reader = connect(&server);
        reader.close();
        assert!(reader.is_closed());
        assert!(matches!(reader.read_last(NO_INDEX), Err(DataHubError::SessionClosed)));
        assert!(matches!(reader.ensure_tag(), Err(DataHubError::SessionClosed)));

        // Second close is a no-op
        reader.close();
        read.assert_calls(0);
    }
}
