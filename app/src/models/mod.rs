use crate::error::DBError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckweed_core::{
    Board, BoardRelationship, ConnectionMethod, Reading, RelationshipStatus, Sensor, SensorType,
    TelemetryMessage, ViewerId,
};

macro_rules! sql_stmnt {
    ($ret:ident, $stmt:expr) => {
        sqlx::query_as::<_ ,$ret>($stmt)
    };
    ($stmt:expr) => {
        sqlx::query($stmt)
    };
    ($ret:ident, $stmt:expr, $($bind:expr),*) => {
        sqlx::query_as::<_ ,$ret>($stmt)$(.bind($bind))*
    };
    ($stmt:expr, $($bind:expr),*) => {
        sqlx::query($stmt)$(.bind($bind))*
    };
}

pub async fn establish_db_connection(database_url: &str) -> Result<sqlx::PgPool, DBError> {
    Ok(sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await?)
}

pub async fn run_migrations(conn: &sqlx::PgPool) -> Result<(), DBError> {
    sqlx::migrate!("./migrations")
        .run(conn)
        .await
        .map_err(sqlx::Error::from)?;
    Ok(())
}

pub async fn check_schema(conn: &sqlx::PgPool) -> Result<(), DBError> {
    sql_stmnt!("SELECT count(*) as count FROM boards")
        .fetch_one(conn)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
pub(crate) struct CountRecord {
    pub count: Option<i64>,
}

impl CountRecord {
    pub fn count(self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// Boards and their sensor configuration
#[async_trait]
pub trait BoardDirectory: Send + Sync {
    /// Fails if the backing store is unreachable
    async fn check(&self) -> Result<(), DBError>;

    async fn find_by_board_id(&self, board_id: &str) -> Result<Option<Board>, DBError>;

    async fn find_all(&self) -> Result<Vec<Board>, DBError>;

    async fn create(&self, board: Board) -> Result<Board, DBError>;

    /// Writes status, name, secret, last_seen and frequency of an existing board
    async fn save(&self, board: &Board) -> Result<(), DBError>;

    /// Refreshes only `last_seen`
    async fn touch(&self, board_id: &str, seen: DateTime<Utc>) -> Result<(), DBError>;

    async fn update_frequency(&self, board_id: &str, frequency: f64) -> Result<(), DBError>;

    /// Creates the missing sensors of [`SensorType::ALL`], existing ones stay untouched
    async fn ensure_sensors(&self, board_id: &str) -> Result<(), DBError>;

    async fn find_sensors(&self, board_id: &str) -> Result<Vec<Sensor>, DBError>;

    async fn update_thresholds(
        &self,
        board_id: &str,
        sensor_type: SensorType,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Sensor, DBError>;
}

/// Append-only telemetry storage
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn create_reading(
        &self,
        board_id: &str,
        msg: &TelemetryMessage,
    ) -> Result<Reading, DBError>;

    async fn readings_since(
        &self,
        board_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, DBError>;
}

/// Links between viewers and boards
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// True if the viewer holds a relationship to the board which is not disabled
    async fn relationship_exists(
        &self,
        viewer_id: ViewerId,
        board_id: &str,
    ) -> Result<bool, DBError>;

    /// True if any viewer holds an active relationship to the board
    async fn has_active_relationship(&self, board_id: &str) -> Result<bool, DBError>;

    async fn find_relationship(
        &self,
        board_id: &str,
        viewer_id: ViewerId,
    ) -> Result<Option<BoardRelationship>, DBError>;

    async fn find_relationships_by_viewer(
        &self,
        viewer_id: ViewerId,
    ) -> Result<Vec<BoardRelationship>, DBError>;

    async fn create_relationship(
        &self,
        board_id: &str,
        viewer_id: ViewerId,
        con_method: ConnectionMethod,
    ) -> Result<BoardRelationship, DBError>;

    async fn update_relationship_status(
        &self,
        id: i32,
        status: RelationshipStatus,
    ) -> Result<BoardRelationship, DBError>;
}

pub mod board;
pub mod reading;
pub mod relationship;
pub mod sensor;
mod store;

pub use store::PgStore;

#[cfg(test)]
pub mod mock;
#[cfg(test)]
mod test;
