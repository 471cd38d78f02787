use super::{BoardDirectory, ReadingStore, RelationshipStore};
use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckweed_core::{
    Board, BoardRelationship, BoardStatus, ConnectionMethod, Reading, RelationshipStatus, Sensor,
    SensorType, TelemetryMessage, ViewerId,
};
use parking_lot::Mutex;

#[derive(Default)]
struct MockState {
    boards: Vec<Board>,
    sensors: Vec<Sensor>,
    readings: Vec<Reading>,
    relationships: Vec<BoardRelationship>,
    fail_readings: bool,
    stalled_readings: Option<String>,
}

/// In-memory stand in for [`super::PgStore`]
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockState>,
}

impl MockStore {
    pub fn new() -> Self {
        MockStore::default()
    }

    /// Seeds a board with all sensors, optionally owned by `owner`
    pub fn with_board(self, board: Board, owner: Option<ViewerId>) -> Self {
        {
            let mut state = self.state.lock();
            let mut board = board;
            board.id = state.boards.len() as i32 + 1;
            for sensor_type in SensorType::ALL {
                let mut sensor = Sensor::new(&board.board_id, sensor_type);
                sensor.id = state.sensors.len() as i32 + 1;
                state.sensors.push(sensor);
            }
            if let Some(viewer_id) = owner {
                let relationship = BoardRelationship {
                    id: state.relationships.len() as i32 + 1,
                    board_id: board.board_id.clone(),
                    viewer_id,
                    con_method: ConnectionMethod::Manual,
                    con_status: BoardStatus::Active,
                    created_at: board.created_at,
                    updated_at: board.created_at,
                };
                state.relationships.push(relationship);
            }
            state.boards.push(board);
        }
        self
    }

    pub fn set_fail_readings(&self, fail: bool) {
        self.state.lock().fail_readings = fail;
    }

    /// Reading inserts for `board_id` never complete
    pub fn stall_readings(&self, board_id: &str) {
        self.state.lock().stalled_readings = Some(board_id.to_owned());
    }

    pub fn board(&self, board_id: &str) -> Option<Board> {
        self.state
            .lock()
            .boards
            .iter()
            .find(|b| b.board_id == board_id)
            .cloned()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.state.lock().readings.clone()
    }

    pub fn sensors(&self, board_id: &str) -> Vec<Sensor> {
        self.state
            .lock()
            .sensors
            .iter()
            .filter(|s| s.board_id == board_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BoardDirectory for MockStore {
    async fn check(&self) -> Result<(), DBError> {
        Ok(())
    }

    async fn find_by_board_id(&self, board_id: &str) -> Result<Option<Board>, DBError> {
        Ok(self.board(board_id))
    }

    async fn find_all(&self) -> Result<Vec<Board>, DBError> {
        Ok(self.state.lock().boards.clone())
    }

    async fn create(&self, mut board: Board) -> Result<Board, DBError> {
        let mut state = self.state.lock();
        board.id = state.boards.len() as i32 + 1;
        state.boards.push(board.clone());
        Ok(board)
    }

    async fn save(&self, board: &Board) -> Result<(), DBError> {
        let mut state = self.state.lock();
        let stored = state
            .boards
            .iter_mut()
            .find(|b| b.board_id == board.board_id)
            .ok_or_else(|| DBError::BoardNotFound(board.board_id.clone()))?;
        *stored = board.clone();
        Ok(())
    }

    async fn touch(&self, board_id: &str, seen: DateTime<Utc>) -> Result<(), DBError> {
        let mut state = self.state.lock();
        if let Some(board) = state.boards.iter_mut().find(|b| b.board_id == board_id) {
            board.last_seen = Some(seen);
        }
        Ok(())
    }

    async fn update_frequency(&self, board_id: &str, frequency: f64) -> Result<(), DBError> {
        let mut state = self.state.lock();
        let board = state
            .boards
            .iter_mut()
            .find(|b| b.board_id == board_id)
            .ok_or_else(|| DBError::BoardNotFound(board_id.to_owned()))?;
        board.sensor_frequency = Some(frequency);
        Ok(())
    }

    async fn ensure_sensors(&self, board_id: &str) -> Result<(), DBError> {
        let mut state = self.state.lock();
        for sensor_type in SensorType::ALL {
            let exists = state
                .sensors
                .iter()
                .any(|s| s.board_id == board_id && s.sensor_type == sensor_type);
            if !exists {
                let mut sensor = Sensor::new(board_id, sensor_type);
                sensor.id = state.sensors.len() as i32 + 1;
                state.sensors.push(sensor);
            }
        }
        Ok(())
    }

    async fn find_sensors(&self, board_id: &str) -> Result<Vec<Sensor>, DBError> {
        Ok(self.sensors(board_id))
    }

    async fn update_thresholds(
        &self,
        board_id: &str,
        sensor_type: SensorType,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Sensor, DBError> {
        let mut state = self.state.lock();
        let sensor = state
            .sensors
            .iter_mut()
            .find(|s| s.board_id == board_id && s.sensor_type == sensor_type)
            .ok_or_else(|| DBError::SensorNotFound(board_id.to_owned(), sensor_type))?;
        sensor.threshold_min = min;
        sensor.threshold_max = max;
        sensor.updated_at = Utc::now();
        Ok(sensor.clone())
    }
}

#[async_trait]
impl ReadingStore for MockStore {
    async fn create_reading(
        &self,
        board_id: &str,
        msg: &TelemetryMessage,
    ) -> Result<Reading, DBError> {
        let stalled = self.state.lock().stalled_readings.as_deref() == Some(board_id);
        if stalled {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock();
        if state.fail_readings {
            return Err(DBError::SQLError(sqlx::Error::PoolClosed));
        }
        let reading = Reading {
            id: state.readings.len() as i64 + 1,
            board_id: board_id.to_owned(),
            temperature: msg.temperature,
            ec: msg.ec,
            ph: msg.ph,
            created_at: Utc::now(),
        };
        state.readings.push(reading.clone());
        Ok(reading)
    }

    async fn readings_since(
        &self,
        board_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, DBError> {
        Ok(self
            .state
            .lock()
            .readings
            .iter()
            .filter(|r| r.board_id == board_id && r.created_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RelationshipStore for MockStore {
    async fn relationship_exists(
        &self,
        viewer_id: ViewerId,
        board_id: &str,
    ) -> Result<bool, DBError> {
        Ok(self
            .state
            .lock()
            .relationships
            .iter()
            .any(|r| r.viewer_id == viewer_id && r.board_id == board_id && r.grants_view()))
    }

    async fn has_active_relationship(&self, board_id: &str) -> Result<bool, DBError> {
        Ok(self
            .state
            .lock()
            .relationships
            .iter()
            .any(|r| r.board_id == board_id && r.con_status == BoardStatus::Active))
    }

    async fn find_relationship(
        &self,
        board_id: &str,
        viewer_id: ViewerId,
    ) -> Result<Option<BoardRelationship>, DBError> {
        Ok(self
            .state
            .lock()
            .relationships
            .iter()
            .find(|r| r.board_id == board_id && r.viewer_id == viewer_id)
            .cloned())
    }

    async fn find_relationships_by_viewer(
        &self,
        viewer_id: ViewerId,
    ) -> Result<Vec<BoardRelationship>, DBError> {
        Ok(self
            .state
            .lock()
            .relationships
            .iter()
            .filter(|r| r.viewer_id == viewer_id)
            .cloned()
            .collect())
    }

    async fn create_relationship(
        &self,
        board_id: &str,
        viewer_id: ViewerId,
        con_method: ConnectionMethod,
    ) -> Result<BoardRelationship, DBError> {
        let mut state = self.state.lock();
        if state
            .relationships
            .iter()
            .any(|r| r.board_id == board_id && r.viewer_id == viewer_id)
        {
            return Err(DBError::DuplicateRelationship(board_id.to_owned(), viewer_id));
        }
        let now = Utc::now();
        let relationship = BoardRelationship {
            id: state.relationships.len() as i32 + 1,
            board_id: board_id.to_owned(),
            viewer_id,
            con_method,
            con_status: BoardStatus::Active,
            created_at: now,
            updated_at: now,
        };
        state.relationships.push(relationship.clone());
        Ok(relationship)
    }

    async fn update_relationship_status(
        &self,
        id: i32,
        status: RelationshipStatus,
    ) -> Result<BoardRelationship, DBError> {
        let mut state = self.state.lock();
        let relationship = state
            .relationships
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(DBError::RelationshipNotFound(id))?;
        relationship.con_status = status;
        relationship.updated_at = Utc::now();
        Ok(relationship.clone())
    }
}
