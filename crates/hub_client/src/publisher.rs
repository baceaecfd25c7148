//! Publisher client: one agent connection, one record per send.

use std::path::Path;

use datahub_protocol::{DataRecord, EdgeData, Scalar, TagValue};
use log::{debug, warn};

use crate::agent::{AgentOptions, EdgeAgent, SendOutcome};
use crate::error::DataHubError;
use crate::mqtt::MqttEdgeAgent;
use crate::record::{build_record, read_image};

/// Pushes tagged records through a single edge agent.
///
/// Errors are only returned for malformed input or unreadable files. A send
/// the transport could not complete comes back as a non-delivered
/// [`SendOutcome`]; rejection by the agent and a dropped connection are both
/// "not delivered" to a caller that only checks the boolean.
pub struct Publisher<A: EdgeAgent = MqttEdgeAgent> {
    agent: A,
    closed: bool,
}

impl Publisher<MqttEdgeAgent> {
    /// Open the MQTT agent described by `options` and wait for it to connect.
    pub fn connect(options: AgentOptions) -> Result<Self, DataHubError> {
        Ok(Self::with_agent(MqttEdgeAgent::connect(options)?))
    }
}

impl<A: EdgeAgent> Publisher<A> {
    /// Wrap an already-connected agent.
    pub fn with_agent(agent: A) -> Self {
        Self { agent, closed: false }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Send an ordered sequence of scalars as one array value.
    pub fn send_array(
        &mut self,
        values: Vec<Scalar>,
        device_id: &str,
        tag_name: &str,
    ) -> Result<SendOutcome, DataHubError> {
        let record = build_record(device_id, tag_name, TagValue::Array(values))?;
        Ok(self.send_record(record))
    }

    /// Send one scalar, unwrapped.
    pub fn send_single(
        &mut self,
        value: impl Into<Scalar>,
        device_id: &str,
        tag_name: &str,
    ) -> Result<SendOutcome, DataHubError> {
        let record = build_record(device_id, tag_name, TagValue::Single(value.into()))?;
        Ok(self.send_record(record))
    }

    /// Read a file, base64-encode it, and send `[timestamp, base64]` as an array.
    pub fn send_image(
        &mut self,
        path: impl AsRef<Path>,
        device_id: &str,
        tag_name: &str,
    ) -> Result<SendOutcome, DataHubError> {
        let items = read_image(path.as_ref())?;
        self.send_array(items, device_id, tag_name)
    }

    /// Disconnect the agent. Later calls do nothing.
    pub fn close(&mut self) -> Result<(), DataHubError> {
        if self.closed {
            debug!("Publisher already closed");
            return Ok(());
        }
        self.closed = true;
        self.agent.disconnect()
    }

    fn send_record(&mut self, record: DataRecord) -> SendOutcome {
        if self.closed {
            return SendOutcome::TransportError("publisher is closed".into());
        }

        debug!("Sending {}/{}", record.device_id, record.tag_name);
        let data = EdgeData::single(record);
        let outcome = self.agent.send_data(&data);
        if !outcome.is_delivered() {
            warn!("Send not delivered: {}", outcome);
        }
        outcome
    }
}

impl<A: EdgeAgent> Drop for Publisher<A> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}
