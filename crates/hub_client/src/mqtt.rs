//! MQTT-backed edge agent.
//!
//! Resolves broker credentials (directly or through the DCCS credential
//! service), connects, announces itself on the node's conn topic, and keeps a
//! heartbeat running until disconnect. Data goes out on the node's data topic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use datahub_protocol::{ConnMessage, ConnState, DataMessage, EdgeData, Topics};
use log::{debug, info, warn};
use rumqttc::{
    Client, Connection, ConnectionError, ConnectReturnCode, Event, LastWill, MqttOptions,
    Outgoing, Packet, QoS, Transport,
};
use serde::Deserialize;

use crate::agent::{AgentOptions, ConnectType, EdgeAgent, SendOutcome};
use crate::error::DataHubError;

const REQUEST_QUEUE_CAP: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const PACKET_OVERHEAD_BYTES: usize = 4 * 1024;

/// Broker address and login, after DCCS resolution.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BrokerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DccsResponse {
    service_host: String,
    credential: DccsCredential,
}

#[derive(Deserialize)]
struct DccsCredential {
    protocols: HashMap<String, DccsProtocol>,
}

#[derive(Deserialize)]
struct DccsProtocol {
    port: u16,
    username: String,
    password: String,
}

/// Ask the credential service which broker to use.
///
/// `GET {api_url}/v1/serviceCredentials/{credential_key}`; picks the
/// `mqtt+ssl` entry when `use_secure`, else `mqtt`.
pub fn resolve_dccs(
    api_url: &str,
    credential_key: &str,
    use_secure: bool,
    timeout: Duration,
) -> Result<BrokerEndpoint, DataHubError> {
    let url = format!("{}/v1/serviceCredentials/{}", api_url.trim_end_matches('/'), credential_key);
    let http = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DataHubError::Connection(e.to_string()))?;

    let response = http.get(&url)
        .send()
        .map_err(|e| DataHubError::Connection(format!("credential service unreachable: {}", e)))?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().unwrap_or_default();
        return Err(DataHubError::Connection(format!("credential service HTTP {}: {}", status, body)));
    }

    let parsed: DccsResponse = response.json()
        .map_err(|e| DataHubError::Connection(format!("credential service response: {}", e)))?;

    let key = if use_secure { "mqtt+ssl" } else { "mqtt" };
    let proto = parsed.credential.protocols.get(key).ok_or_else(|| {
        DataHubError::Connection(format!("credential service offers no '{}' protocol", key))
    })?;

    Ok(BrokerEndpoint {
        host: parsed.service_host,
        port: proto.port,
        username: proto.username.clone(),
        password: proto.password.clone(),
    })
}

/// Edge agent over an MQTT broker.
pub struct MqttEdgeAgent {
    client: Client,
    topics: Topics,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    heartbeat_stop: Option<mpsc::Sender<()>>,
    event_loop: Option<JoinHandle<()>>,
    max_payload_bytes: usize,
}

impl MqttEdgeAgent {
    /// Connect and wait up to `options.connect_timeout` for the broker's ack.
    pub fn connect(options: AgentOptions) -> Result<Self, DataHubError> {
        let endpoint = match &options.connect_type {
            ConnectType::Dccs { api_url, credential_key } => {
                resolve_dccs(api_url, credential_key, options.use_secure, options.connect_timeout)?
            }
            ConnectType::Mqtt { host, port, username, password } => BrokerEndpoint {
                host: host.clone(),
                port: *port,
                username: username.clone(),
                password: password.clone(),
            },
        };

        let topics = Topics::for_node(&options.node_id);
        let mqtt = mqtt_options(&options, &endpoint, &topics);
        let (client, connection) = Client::new(mqtt, REQUEST_QUEUE_CAP);

        let connected = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (ack_tx, ack_rx) = mpsc::channel();
        let event_loop = {
            let connected = Arc::clone(&connected);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("edge-agent-mqtt".into())
                .spawn(move || drive(connection, connected, shutdown, ack_tx))
                .map_err(|e| DataHubError::Connection(e.to_string()))?
        };

        let acked = match ack_rx.recv_timeout(options.connect_timeout) {
            Ok(result) => result,
            Err(_) => Err(format!(
                "no acknowledgement from {}:{} within {}s",
                endpoint.host,
                endpoint.port,
                options.connect_timeout.as_secs_f32()
            )),
        };
        if let Err(reason) = acked {
            shutdown.store(true, Ordering::SeqCst);
            let _ = client.try_disconnect();
            return Err(DataHubError::Connection(reason));
        }

        info!(
            "Edge agent {} ({:?}) connected to {}:{}",
            options.node_id, options.edge_type, endpoint.host, endpoint.port
        );
        if options.data_recover {
            debug!("Data recovery requested; unsent records are not buffered");
        }

        client
            .try_publish(topics.conn.clone(), QoS::AtLeastOnce, true, ConnMessage::now(ConnState::Connected).to_bytes())
            .map_err(|e| DataHubError::Connection(e.to_string()))?;

        let heartbeat_stop = spawn_heartbeat(
            client.clone(),
            topics.conn.clone(),
            options.heartbeat,
            Arc::clone(&connected),
        )?;

        Ok(Self {
            client,
            topics,
            connected,
            shutdown,
            heartbeat_stop: Some(heartbeat_stop),
            event_loop: Some(event_loop),
            max_payload_bytes: options.max_payload_bytes,
        })
    }
}

impl EdgeAgent for MqttEdgeAgent {
    fn send_data(&mut self, data: &EdgeData) -> SendOutcome {
        if !self.is_connected() {
            return SendOutcome::TransportError("agent is not connected".into());
        }

        let payload = match serde_json::to_vec(&DataMessage::from_edge_data(data)) {
            Ok(p) => p,
            Err(e) => return SendOutcome::Rejected(e.to_string()),
        };
        if payload.len() > self.max_payload_bytes {
            return SendOutcome::Rejected(format!(
                "payload of {} bytes exceeds limit of {}",
                payload.len(),
                self.max_payload_bytes
            ));
        }

        debug!("Publishing {} bytes to {}", payload.len(), self.topics.data);
        match self.client.try_publish(self.topics.data.clone(), QoS::AtLeastOnce, false, payload) {
            Ok(()) => SendOutcome::Delivered,
            Err(e) => SendOutcome::TransportError(e.to_string()),
        }
    }

    fn disconnect(&mut self) -> Result<(), DataHubError> {
        let Some(stop) = self.heartbeat_stop.take() else {
            return Ok(());
        };
        let _ = stop.send(());

        if self.is_connected() {
            let bye = ConnMessage::now(ConnState::Disconnected).to_bytes();
            if let Err(e) = self.client.try_publish(self.topics.conn.clone(), QoS::AtLeastOnce, true, bye) {
                debug!("Failed to announce disconnect: {}", e);
            }
        }

        self.shutdown.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        match self.client.try_disconnect() {
            Ok(()) => {
                // Queued publishes are flushed by the event loop before it exits
                if let Some(handle) = self.event_loop.take() {
                    if handle.join().is_err() {
                        warn!("Edge agent event loop panicked");
                    }
                }
            }
            Err(e) => {
                // Request queue closed or full: the event loop has stopped or
                // exits on its next connection error now that shutdown is set.
                debug!("Disconnect request not queued: {}", e);
            }
        }
        info!("Edge agent disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for MqttEdgeAgent {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

fn mqtt_options(options: &AgentOptions, endpoint: &BrokerEndpoint, topics: &Topics) -> MqttOptions {
    let mut mqtt = MqttOptions::new(
        format!("EdgeAgent_{}", options.node_id),
        endpoint.host.clone(),
        endpoint.port,
    );
    mqtt.set_keep_alive(options.heartbeat.max(Duration::from_secs(1)));
    mqtt.set_credentials(endpoint.username.clone(), endpoint.password.clone());
    let max_packet = options.max_payload_bytes + PACKET_OVERHEAD_BYTES;
    mqtt.set_max_packet_size(max_packet, max_packet);
    mqtt.set_last_will(LastWill::new(
        topics.conn.clone(),
        ConnMessage::now(ConnState::Unexpected).to_bytes(),
        QoS::AtLeastOnce,
        true,
    ));
    if options.use_secure {
        mqtt.set_transport(Transport::tls_with_default_config());
    }
    mqtt
}

/// Event loop. Reports the first connection result on `ack`, then keeps the
/// connection alive until shutdown.
fn drive(
    mut connection: Connection,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    ack: mpsc::Sender<Result<(), String>>,
) {
    let mut acked = false;
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                if connack.code == ConnectReturnCode::Success {
                    connected.store(true, Ordering::SeqCst);
                    if acked {
                        info!("Edge agent reconnected");
                    } else {
                        acked = true;
                        let _ = ack.send(Ok(()));
                    }
                } else if !acked {
                    let _ = ack.send(Err(format!("broker refused connection: {:?}", connack.code)));
                    return;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => break,
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                if !acked {
                    let _ = ack.send(Err(e.to_string()));
                    return;
                }
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!("Edge agent connection lost: {}", e);
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    debug!("Edge agent event loop stopped");
}

/// Publishes a heartbeat every `interval` while the broker connection is up.
/// Beats are skipped, not queued, while it is down.
fn spawn_heartbeat(
    client: Client,
    topic: String,
    interval: Duration,
    connected: Arc<AtomicBool>,
) -> Result<mpsc::Sender<()>, DataHubError> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    thread::Builder::new()
        .name("edge-agent-heartbeat".into())
        .spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if !connected.load(Ordering::SeqCst) {
                        continue;
                    }
                    let beat = ConnMessage::now(ConnState::Heartbeat).to_bytes();
                    if let Err(e) = client.try_publish(topic.clone(), QoS::AtLeastOnce, true, beat) {
                        debug!("Heartbeat not sent: {}", e);
                    }
                }
                _ => break,
            }
        })
        .map_err(|e| DataHubError::Connection(e.to_string()))?;
    Ok(stop_tx)
}
