use super::{board, reading, relationship, sensor};
use super::{BoardDirectory, ReadingStore, RelationshipStore};
use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckweed_core::{
    Board, BoardRelationship, ConnectionMethod, Reading, RelationshipStatus, Sensor, SensorType,
    TelemetryMessage, ViewerId,
};
use sqlx::PgPool;

/// Postgres backed implementation of every store
#[derive(Clone)]
pub struct PgStore {
    conn: PgPool,
}

impl PgStore {
    pub fn new(conn: PgPool) -> Self {
        PgStore { conn }
    }
}

#[async_trait]
impl BoardDirectory for PgStore {
    async fn check(&self) -> Result<(), DBError> {
        super::check_schema(&self.conn).await
    }

    async fn find_by_board_id(&self, board_id: &str) -> Result<Option<Board>, DBError> {
        board::get(&self.conn, board_id).await
    }

    async fn find_all(&self) -> Result<Vec<Board>, DBError> {
        board::read(&self.conn).await
    }

    async fn create(&self, board: Board) -> Result<Board, DBError> {
        board::insert(&self.conn, &board).await
    }

    async fn save(&self, board: &Board) -> Result<(), DBError> {
        board::update(&self.conn, board).await
    }

    async fn touch(&self, board_id: &str, seen: DateTime<Utc>) -> Result<(), DBError> {
        board::update_last_seen(&self.conn, board_id, seen).await
    }

    async fn update_frequency(&self, board_id: &str, frequency: f64) -> Result<(), DBError> {
        board::update_frequency(&self.conn, board_id, frequency).await
    }

    async fn ensure_sensors(&self, board_id: &str) -> Result<(), DBError> {
        sensor::ensure(&self.conn, board_id).await?;
        Ok(())
    }

    async fn find_sensors(&self, board_id: &str) -> Result<Vec<Sensor>, DBError> {
        sensor::get(&self.conn, board_id).await
    }

    async fn update_thresholds(
        &self,
        board_id: &str,
        sensor_type: SensorType,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Sensor, DBError> {
        sensor::update_thresholds(&self.conn, board_id, sensor_type, min, max).await
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn create_reading(
        &self,
        board_id: &str,
        msg: &TelemetryMessage,
    ) -> Result<Reading, DBError> {
        reading::insert(&self.conn, board_id, msg).await
    }

    async fn readings_since(
        &self,
        board_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, DBError> {
        reading::get_since(&self.conn, board_id, since).await
    }
}

#[async_trait]
impl RelationshipStore for PgStore {
    async fn relationship_exists(
        &self,
        viewer_id: ViewerId,
        board_id: &str,
    ) -> Result<bool, DBError> {
        relationship::exists(&self.conn, viewer_id, board_id).await
    }

    async fn has_active_relationship(&self, board_id: &str) -> Result<bool, DBError> {
        Ok(relationship::count_active(&self.conn, board_id).await? > 0)
    }

    async fn find_relationship(
        &self,
        board_id: &str,
        viewer_id: ViewerId,
    ) -> Result<Option<BoardRelationship>, DBError> {
        relationship::get(&self.conn, board_id, viewer_id).await
    }

    async fn find_relationships_by_viewer(
        &self,
        viewer_id: ViewerId,
    ) -> Result<Vec<BoardRelationship>, DBError> {
        relationship::get_by_user(&self.conn, viewer_id).await
    }

    async fn create_relationship(
        &self,
        board_id: &str,
        viewer_id: ViewerId,
        con_method: ConnectionMethod,
    ) -> Result<BoardRelationship, DBError> {
        relationship::insert(&self.conn, board_id, viewer_id, con_method).await
    }

    async fn update_relationship_status(
        &self,
        id: i32,
        status: RelationshipStatus,
    ) -> Result<BoardRelationship, DBError> {
        relationship::update_status(&self.conn, id, status).await
    }
}
