use crate::broadcast::{Broadcaster, ConnectionId, FrameReceiver};
use crate::error::{ApiError, ObserverError};
use crate::models::RelationshipStore;
use duckweed_core::{ControlFrame, ViewerId};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// An admitted viewer connection
pub struct Session {
    pub conn_id: ConnectionId,
    pub receiver: FrameReceiver,
}

pub struct ConnectionAdmission {
    relationships: Arc<dyn RelationshipStore>,
    broadcaster: Broadcaster,
}

impl ConnectionAdmission {
    pub fn new(relationships: Arc<dyn RelationshipStore>, broadcaster: Broadcaster) -> Self {
        ConnectionAdmission {
            relationships,
            broadcaster,
        }
    }

    /// Registers the viewer for the board if a relationship allows it
    ///
    /// The `subscribed` frame is queued before the subscription, so it is
    /// always the first frame of a session. A refused viewer is never
    /// registered.
    pub async fn admit(
        &self,
        viewer_id: ViewerId,
        board_id: &str,
    ) -> Result<Session, ObserverError> {
        if !self
            .relationships
            .relationship_exists(viewer_id, board_id)
            .await?
        {
            info!(viewer_id, board_id, "Refused viewer");
            return Err(ApiError::Forbidden(viewer_id, board_id.to_owned()).into());
        }

        let conn_id = Uuid::new_v4();
        let receiver = self.broadcaster.register(conn_id, viewer_id);
        let subscribed = ControlFrame::Subscribed {
            board_id: board_id.to_owned(),
        };
        if !self.broadcaster.send_to(conn_id, &subscribed) {
            debug!(conn_id = %conn_id, board_id, "Failed queueing subscribed frame");
        }
        if !self.broadcaster.subscribe(conn_id, board_id) {
            debug!(conn_id = %conn_id, board_id, "Connection gone before subscribing");
        }
        info!(conn_id = %conn_id, viewer_id, board_id, "Admitted viewer");

        Ok(Session { conn_id, receiver })
    }

    pub fn release(&self, conn_id: ConnectionId) {
        self.broadcaster.unregister(conn_id);
    }
}
