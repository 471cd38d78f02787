//! Live viewer connections and the fan-out of board events.
//!
//! The registry map is private to [`Broadcaster`]. Every map operation takes
//! the lock for the duration of the operation only, frames are handed to the
//! per-connection queues after the lock is released.

use duckweed_core::{BoardEvent, ControlFrame, ViewerId};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;


pub type ConnectionId = Uuid;

/// Serialized frame, shared by every receiving connection
pub type Frame = Arc<str>;

pub type FrameReceiver = mpsc::Receiver<Frame>;

struct Connection {
    viewer_id: ViewerId,
    sender: mpsc::Sender<Frame>,
    boards: HashSet<String>,
}

#[derive(Clone)]
pub struct Broadcaster {
    connections: Arc<Mutex<HashMap<ConnectionId, Connection>>>,
    buffer: usize,
}

impl Broadcaster {
    pub fn new(buffer: usize) -> Self {
        Broadcaster {
            connections: Arc::new(Mutex::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    /// Adds a connection with an empty subscription set
    ///
    /// Registering an id twice replaces the previous entry, the old receiver
    /// is closed.
    pub fn register(&self, conn_id: ConnectionId, viewer_id: ViewerId) -> FrameReceiver {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let conn = Connection {
            viewer_id,
            sender,
            boards: HashSet::new(),
        };
        self.connections.lock().insert(conn_id, conn);
        debug!(conn_id = %conn_id, viewer_id, "Registered connection");
        receiver
    }

    /// Returns false if the connection is not registered
    pub fn subscribe(&self, conn_id: ConnectionId, board_id: &str) -> bool {
        match self.connections.lock().get_mut(&conn_id) {
            Some(conn) => {
                conn.boards.insert(board_id.to_owned());
                true
            }
            None => false,
        }
    }

    pub fn unregister(&self, conn_id: ConnectionId) -> bool {
        let removed = self.connections.lock().remove(&conn_id);
        if let Some(conn) = &removed {
            debug!(conn_id = %conn_id, viewer_id = conn.viewer_id, "Unregistered connection");
        }
        removed.is_some()
    }

    /// Sends the event to every connection subscribed to `board_id`
    ///
    /// A connection whose queue is full or closed is unregistered, the
    /// remaining connections still receive the frame.
    /// Returns the number of connections the frame was queued for.
    pub fn broadcast(&self, board_id: &str, event: &BoardEvent) -> usize {
        let frame = match encode(event) {
            Some(frame) => frame,
            None => return 0,
        };

        let targets: Vec<(ConnectionId, mpsc::Sender<Frame>)> = self
            .connections
            .lock()
            .iter()
            .filter(|(_, conn)| conn.boards.contains(board_id))
            .map(|(id, conn)| (*id, conn.sender.clone()))
            .collect();

        let mut delivered = 0;
        for (conn_id, sender) in targets {
            if self.deliver(conn_id, &sender, frame.clone()) {
                delivered += 1;
            }
        }
        debug!(
            board_id,
            kind = event.kind(),
            delivered,
            "Broadcasted board event"
        );
        delivered
    }

    /// Queues a frame for a single connection
    pub fn send_to(&self, conn_id: ConnectionId, frame: &ControlFrame) -> bool {
        let sender = match self.connections.lock().get(&conn_id) {
            Some(conn) => conn.sender.clone(),
            None => return false,
        };
        match encode(frame) {
            Some(encoded) => self.deliver(conn_id, &sender, encoded),
            None => false,
        }
    }

    pub fn is_subscribed(&self, conn_id: ConnectionId, board_id: &str) -> bool {
        self.connections
            .lock()
            .get(&conn_id)
            .map(|conn| conn.boards.contains(board_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn deliver(&self, conn_id: ConnectionId, sender: &mpsc::Sender<Frame>, frame: Frame) -> bool {
        match sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(conn_id = %conn_id, "Viewer queue is full, dropping connection");
                self.unregister(conn_id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id = %conn_id, "Viewer queue is closed");
                self.unregister(conn_id);
                false
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Option<Frame> {
    match serde_json::to_string(value) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!("Failed serializing frame: {}", e);
            None
        }
    }
}
