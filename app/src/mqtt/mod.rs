use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::MQTTError;
use async_trait::async_trait;
use duckweed_core::{BoardStatus, TelemetryMessage};
use parking_lot::RwLock;
use rand::Rng;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, Publish, QoS};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

#[cfg(test)]
pub mod mock;

const QOS: QoS = QoS::AtLeastOnce;
const DEFAULT_PORT: u16 = 1883;
const REQUEST_CAPACITY: usize = 64;

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum BoardMessage {
    Telemetry {
        board_id: String,
        payload: TelemetryMessage,
    },
    Status {
        board_id: String,
        status: BoardStatus,
    },
}

impl BoardMessage {
    pub fn board_id(&self) -> &str {
        match self {
            BoardMessage::Telemetry { board_id, .. } => board_id,
            BoardMessage::Status { board_id, .. } => board_id,
        }
    }
}

pub type MqttSender = UnboundedSender<BoardMessage>;

/// Outbound commands to a board
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish_frequency(&self, board_id: &str, frequency: f64) -> Result<(), MQTTError>;

    async fn publish_measure(&self, board_id: &str) -> Result<(), MQTTError>;

    fn is_connected(&self) -> bool;
}

#[derive(Serialize)]
struct FrequencyCommand {
    frequency: f64,
}

#[derive(Serialize)]
struct MeasureCommand {
    measure: bool,
}

pub struct MqttBoardClient {
    inner: Arc<MqttBoardClientInner>,
}

struct MqttBoardClientInner {
    cli: RwLock<Option<AsyncClient>>,
    is_connected: AtomicBool,
    sender: MqttSender,
    namespace: String,
}

impl MqttBoardClient {
    pub fn new(namespace: String, sender: MqttSender) -> Self {
        MqttBoardClient {
            inner: Arc::new(MqttBoardClientInner {
                cli: RwLock::new(None),
                is_connected: AtomicBool::new(false),
                sender,
                namespace,
            }),
        }
    }

    /// Polls the broker connection forever
    ///
    /// Subscriptions are renewed on every ConnAck. After the configured
    /// number of consecutive failures the next broker is tried.
    pub async fn dispatch_event_loop(&self, config: Arc<Config>) {
        loop {
            let broker = config.current_mqtt_broker();
            let options = match Self::build_options(&config, &broker) {
                Ok(options) => options,
                Err(e) => {
                    error!("{}", e);
                    config.next_mqtt_broker();
                    tokio::time::sleep(config.mqtt_timeout()).await;
                    continue;
                }
            };

            info!(broker = %broker, "Attempt connecting on broker");
            let (cli, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
            *self.inner.cli.write() = Some(cli.clone());

            let max_failures = config.mqtt_connect_retries().max(1);
            let mut failures = 0;
            while failures < max_failures {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        failures = 0;
                        self.inner.is_connected.store(true, Ordering::Relaxed);
                        info!(broker = %broker, "Connected to broker");
                        Self::subscribe_topics(&cli, &config.mqtt_topics());
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if let Err(e) = self.inner.on_board_message(&msg) {
                            warn!(topic = %msg.topic, "Dropped message: {}", e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.inner.is_connected.store(false, Ordering::Relaxed);
                        failures += 1;
                        error!(
                            broker = %broker,
                            "[{}/{}] Connection failed: {}", failures, max_failures, e
                        );
                        tokio::time::sleep(config.mqtt_timeout()).await;
                    }
                }
            }

            *self.inner.cli.write() = None;
            let next = config.next_mqtt_broker();
            warn!(broker = %next, "Switching broker");
        }
    }

    fn build_options(config: &Config, broker: &str) -> Result<MqttOptions, MQTTError> {
        let (host, port) = parse_broker(broker)?;
        let client_id = format!(
            "{}-{}",
            config.mqtt_client_id(),
            rand::thread_rng().gen_range(0..1000)
        );
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(5));
        Ok(options)
    }

    fn subscribe_topics(cli: &AsyncClient, topics: &[String]) {
        for topic in topics {
            match cli.try_subscribe(topic.as_str(), QOS) {
                Ok(_) => debug!(topic = %topic, "Subscribed topic"),
                Err(e) => error!(topic = %topic, "Failed subscribing: {}", e),
            }
        }
    }
}

#[async_trait]
impl CommandPublisher for MqttBoardClient {
    async fn publish_frequency(&self, board_id: &str, frequency: f64) -> Result<(), MQTTError> {
        let payload = serde_json::to_vec(&FrequencyCommand { frequency })?;
        self.inner
            .publish(command_topic(&self.inner.namespace, board_id, "frequency"), payload)
            .await
    }

    async fn publish_measure(&self, board_id: &str) -> Result<(), MQTTError> {
        let payload = serde_json::to_vec(&MeasureCommand { measure: true })?;
        self.inner
            .publish(command_topic(&self.inner.namespace, board_id, "measure"), payload)
            .await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected.load(Ordering::Relaxed)
    }
}

impl MqttBoardClientInner {
    async fn publish(&self, topic: String, payload: Vec<u8>) -> Result<(), MQTTError> {
        if !self.is_connected.load(Ordering::Relaxed) {
            return Err(MQTTError::NotConnected);
        }
        let cli = self.cli.read().clone().ok_or(MQTTError::NotConnected)?;
        cli.publish(topic.as_str(), QOS, false, payload).await?;
        debug!(topic = %topic, "Published command");
        Ok(())
    }

    /// Parses the message and forwards it to the ingestion loop
    fn on_board_message(&self, msg: &Publish) -> Result<(), MQTTError> {
        let message = parse_message(&self.namespace, &msg.topic, &msg.payload)?;
        debug!(topic = %msg.topic, "Received message");
        if let Err(e) = self.sender.send(message) {
            error!("Failed forwarding board message: {}", e);
        }
        Ok(())
    }
}

/// Decodes `<namespace>/<board_id>/<kind>` and its payload
pub fn parse_message(
    namespace: &str,
    topic: &str,
    payload: &[u8],
) -> Result<BoardMessage, MQTTError> {
    let path: Vec<&str> = topic.split('/').collect();
    if path.len() != 3 {
        return Err(MQTTError::Path(format!("Couldn't split topic: {}", topic)));
    } else if path[0] != namespace {
        return Err(MQTTError::Path(format!("Invalid namespace: {}", path[0])));
    } else if path[1].is_empty() {
        return Err(MQTTError::Path(format!("Missing board_id: {}", topic)));
    }

    let board_id = path[1].to_owned();
    let payload = std::str::from_utf8(payload)
        .map_err(|_| MQTTError::Payload("Couldn't decode payload".to_owned()))?;

    match path[2] {
        "telemetry" => Ok(BoardMessage::Telemetry {
            board_id,
            payload: serde_json::from_str::<TelemetryMessage>(payload)?,
        }),
        "status" => {
            let status = payload
                .trim()
                .parse::<BoardStatus>()
                .map_err(|_| MQTTError::Status(payload.to_owned()))?;
            Ok(BoardMessage::Status { board_id, status })
        }
        endpoint => Err(MQTTError::Path(format!("Invalid endpoint: {}", endpoint))),
    }
}

pub fn command_topic(namespace: &str, board_id: &str, command: &str) -> String {
    format!("{}/{}/{}", namespace, board_id, command)
}

/// Splits `host[:port]`, the port defaults to 1883
pub fn parse_broker(broker: &str) -> Result<(String, u16), MQTTError> {
    let (host, port) = match broker.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| MQTTError::Broker(broker.to_owned()))?;
            (host, port)
        }
        None => (broker, DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(MQTTError::Broker(broker.to_owned()));
    }
    Ok((host.to_owned(), port))
}
