use super::Stores;
use crate::broadcast::Broadcaster;
use crate::error::DBError;
use crate::mqtt::BoardMessage;
use chrono::{DateTime, Utc};
use duckweed_core::threshold::{self, Breach};
use duckweed_core::{Board, BoardEvent, BoardStatus, Reading, TelemetryMessage};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownBoard,
    NoOwner,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Ingested {
        reading: Reading,
        breaches: Vec<Breach>,
        delivered: usize,
    },
    StatusUpdated {
        board: Board,
        delivered: usize,
    },
    Dropped(DropReason),
}

/// Validates, persists and fans out inbound board messages
pub struct IngestionGateway {
    stores: Stores,
    broadcaster: Broadcaster,
    require_owner: bool,
}

impl IngestionGateway {
    pub fn new(stores: Stores, broadcaster: Broadcaster, require_owner: bool) -> Self {
        IngestionGateway {
            stores,
            broadcaster,
            require_owner,
        }
    }

    pub async fn handle(
        &self,
        msg: BoardMessage,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, DBError> {
        match msg {
            BoardMessage::Telemetry { board_id, payload } => {
                self.on_telemetry(&board_id, &payload, now).await
            }
            BoardMessage::Status { board_id, status } => {
                self.on_status(&board_id, status, now).await
            }
        }
    }

    /// A failed reading insert aborts the message, later steps only log
    pub async fn on_telemetry(
        &self,
        board_id: &str,
        payload: &TelemetryMessage,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, DBError> {
        let mut board = match self.stores.boards.find_by_board_id(board_id).await? {
            Some(board) => board,
            None => {
                info!(board_id, "Dropped telemetry of unknown board");
                return Ok(IngestOutcome::Dropped(DropReason::UnknownBoard));
            }
        };

        if self.require_owner
            && !self
                .stores
                .relationships
                .has_active_relationship(board_id)
                .await?
        {
            info!(board_id, "Dropped telemetry of board without owner");
            return Ok(IngestOutcome::Dropped(DropReason::NoOwner));
        }

        let reading = self.stores.readings.create_reading(board_id, payload).await?;

        let breaches = match self.stores.boards.find_sensors(board_id).await {
            Ok(sensors) => threshold::evaluate(&reading, &sensors),
            Err(e) => {
                error!(board_id, "Failed loading sensors: {}", e);
                Vec::new()
            }
        };
        for breach in &breaches {
            warn!(board_id, "[ALERT] {}", breach);
        }

        if board.status == BoardStatus::Inactive {
            board.status = BoardStatus::Active;
            board.last_seen = Some(now);
            match self.stores.boards.save(&board).await {
                Ok(()) => {
                    info!(board_id, "Board reported again");
                    self.broadcaster
                        .broadcast(board_id, &BoardEvent::Status(board));
                }
                Err(e) => error!(board_id, "Failed reactivating board: {}", e),
            }
        } else if let Err(e) = self.stores.boards.touch(board_id, now).await {
            error!(board_id, "Failed refreshing last_seen: {}", e);
        }

        let delivered = self
            .broadcaster
            .broadcast(board_id, &BoardEvent::Telemetry(reading.clone()));

        Ok(IngestOutcome::Ingested {
            reading,
            breaches,
            delivered,
        })
    }

    pub async fn on_status(
        &self,
        board_id: &str,
        status: BoardStatus,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, DBError> {
        let mut board = match self.stores.boards.find_by_board_id(board_id).await? {
            Some(board) => board,
            None => {
                info!(board_id, "Dropped status of unknown board");
                return Ok(IngestOutcome::Dropped(DropReason::UnknownBoard));
            }
        };

        if board.status != status {
            info!(board_id, from = %board.status, to = %status, "Board changed status");
        }
        board.status = status;
        board.last_seen = Some(now);
        self.stores.boards.save(&board).await?;

        let delivered = self
            .broadcaster
            .broadcast(board_id, &BoardEvent::Status(board.clone()));
        Ok(IngestOutcome::StatusUpdated { board, delivered })
    }
}
