use super::CommandPublisher;
use crate::error::MQTTError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records published commands instead of sending them
pub struct RecordingPublisher {
    connected: AtomicBool,
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn new(connected: bool) -> Self {
        RecordingPublisher {
            connected: AtomicBool::new(connected),
            published: Mutex::new(Vec::new()),
        }
    }

    /// `(topic suffix, payload)` pairs in publish order
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }

    fn record(&self, board_id: &str, command: &str, payload: String) -> Result<(), MQTTError> {
        if !self.is_connected() {
            return Err(MQTTError::NotConnected);
        }
        self.published
            .lock()
            .push((format!("{}/{}", board_id, command), payload));
        Ok(())
    }
}

#[async_trait]
impl CommandPublisher for RecordingPublisher {
    async fn publish_frequency(&self, board_id: &str, frequency: f64) -> Result<(), MQTTError> {
        self.record(board_id, "frequency", format!("{}", frequency))
    }

    async fn publish_measure(&self, board_id: &str) -> Result<(), MQTTError> {
        self.record(board_id, "measure", "true".to_owned())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
