use crate::broadcast::Broadcaster;
use crate::error::DBError;
use crate::models::BoardDirectory;
use chrono::{DateTime, Duration, Utc};
use duckweed_core::{BoardEvent, BoardStatus};
use std::sync::Arc;
use tracing::{error, info};

/// Moves boards that stayed silent past the window to `inactive`
pub struct LivenessMonitor {
    boards: Arc<dyn BoardDirectory>,
    broadcaster: Broadcaster,
    window: Duration,
}

impl LivenessMonitor {
    pub fn new(boards: Arc<dyn BoardDirectory>, broadcaster: Broadcaster, window: Duration) -> Self {
        LivenessMonitor {
            boards,
            broadcaster,
            window,
        }
    }

    /// Returns the ids of the demoted boards
    ///
    /// Boards that never reported are skipped, a board already `inactive`
    /// is not broadcasted again.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<String>, DBError> {
        let mut demoted = Vec::new();
        for mut board in self.boards.find_all().await? {
            if board.status == BoardStatus::Inactive || !board.is_stale(now, self.window) {
                continue;
            }

            board.status = BoardStatus::Inactive;
            if let Err(e) = self.boards.save(&board).await {
                error!(board_id = %board.board_id, "Failed demoting board: {}", e);
                continue;
            }
            info!(board_id = %board.board_id, last_seen = ?board.last_seen, "Board went silent");
            self.broadcaster
                .broadcast(&board.board_id, &BoardEvent::Status(board.clone()));
            demoted.push(board.board_id);
        }
        Ok(demoted)
    }
}
