use super::Stores;
use crate::broadcast::Broadcaster;
use crate::error::{ApiError, DBError, ObserverError};
use crate::mqtt::CommandPublisher;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use duckweed_core::{
    Board, BoardRelationship, ConnectionMethod, Reading, RelationshipStatus, Sensor, SensorType,
    ViewerId,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_DAYS: i64 = 1;
pub const MAX_DAYS: i64 = 365;

/// A relationship together with the board fields a dashboard lists
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipView {
    #[serde(flatten)]
    pub relationship: BoardRelationship,
    pub board_name: Option<String>,
    pub sensor_frequency: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub healthy: bool,
    pub database_state: String,
    pub mqtt_connected: bool,
    pub viewer_count: usize,
}

/// Board management use-cases behind the HTTP surface
pub struct BoardObserver {
    stores: Stores,
    publisher: Arc<dyn CommandPublisher>,
    broadcaster: Broadcaster,
}

impl BoardObserver {
    pub fn new(stores: Stores, publisher: Arc<dyn CommandPublisher>, broadcaster: Broadcaster) -> Self {
        BoardObserver {
            stores,
            publisher,
            broadcaster,
        }
    }

    /// Links a viewer to a board, creating the board on first contact
    #[tracing::instrument(skip(self, con_password))]
    pub async fn pair(
        &self,
        viewer_id: ViewerId,
        board_id: &str,
        board_name: Option<String>,
        con_method: ConnectionMethod,
        con_password: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<BoardRelationship, ObserverError> {
        let board_id = board_id.trim();
        if board_id.is_empty() || board_id.contains('/') {
            return Err(ApiError::ArgumentError(format!("Invalid board_id: {:?}", board_id)).into());
        }

        if self
            .stores
            .relationships
            .find_relationship(board_id, viewer_id)
            .await?
            .is_some()
        {
            return Err(DBError::DuplicateRelationship(board_id.to_owned(), viewer_id).into());
        }

        match self.stores.boards.find_by_board_id(board_id).await? {
            Some(board) => {
                if let Some(hash) = board.con_password.as_deref().filter(|h| !h.is_empty()) {
                    let password = con_password.ok_or(ApiError::MissingPassword)?;
                    if !verify_secret(&password, hash)? {
                        return Err(ApiError::InvalidPassword.into());
                    }
                }
            }
            None => {
                let mut board = Board::new(board_id, board_name, now);
                board.con_password = match con_password.filter(|p| !p.is_empty()) {
                    Some(password) => Some(hash_secret(&password)?),
                    None => None,
                };
                self.stores.boards.create(board).await?;
                info!(board_id, "Created board");
            }
        }

        if let Err(e) = self.stores.boards.ensure_sensors(board_id).await {
            warn!(board_id, "Failed ensuring sensors: {}", e);
        }

        let relationship = self
            .stores
            .relationships
            .create_relationship(board_id, viewer_id, con_method)
            .await?;
        info!(board_id, viewer_id, "Paired board");
        Ok(relationship)
    }

    pub async fn relationships(
        &self,
        viewer_id: ViewerId,
    ) -> Result<Vec<RelationshipView>, ObserverError> {
        let relationships = self
            .stores
            .relationships
            .find_relationships_by_viewer(viewer_id)
            .await?;

        let mut views = Vec::with_capacity(relationships.len());
        for relationship in relationships {
            let board = self
                .stores
                .boards
                .find_by_board_id(&relationship.board_id)
                .await?;
            views.push(RelationshipView {
                board_name: board.as_ref().and_then(|b| b.board_name.clone()),
                sensor_frequency: board.and_then(|b| b.sensor_frequency),
                relationship,
            });
        }
        Ok(views)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_relationship_status(
        &self,
        id: i32,
        status: RelationshipStatus,
    ) -> Result<BoardRelationship, ObserverError> {
        Ok(self
            .stores
            .relationships
            .update_relationship_status(id, status)
            .await?)
    }

    pub async fn board(&self, board_id: &str) -> Result<Board, ObserverError> {
        self.stores
            .boards
            .find_by_board_id(board_id)
            .await?
            .ok_or_else(|| DBError::BoardNotFound(board_id.to_owned()).into())
    }

    pub async fn sensors(&self, board_id: &str) -> Result<Vec<Sensor>, ObserverError> {
        self.board(board_id).await?;
        Ok(self.stores.boards.find_sensors(board_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_thresholds(
        &self,
        board_id: &str,
        sensor_type: SensorType,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Sensor, ObserverError> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ApiError::ArgumentError(format!(
                    "Minimum {} is larger than maximum {}",
                    min, max
                ))
                .into());
            }
        }
        if min.map_or(false, |v| !v.is_finite()) || max.map_or(false, |v| !v.is_finite()) {
            return Err(ApiError::ArgumentError("Thresholds must be finite".to_owned()).into());
        }

        Ok(self
            .stores
            .boards
            .update_thresholds(board_id, sensor_type, min, max)
            .await?)
    }

    /// Readings of the last `days` days, oldest first
    pub async fn readings(
        &self,
        board_id: &str,
        days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reading>, ObserverError> {
        let days = days.unwrap_or(DEFAULT_DAYS);
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(ApiError::ArgumentError(format!(
                "days must be between 1 and {}",
                MAX_DAYS
            ))
            .into());
        }

        self.board(board_id).await?;
        Ok(self
            .stores
            .readings
            .readings_since(board_id, now - Duration::days(days))
            .await?)
    }

    /// Persists the reporting interval and forwards it to the board
    #[tracing::instrument(skip(self))]
    pub async fn update_frequency(
        &self,
        board_id: &str,
        frequency: f64,
    ) -> Result<Board, ObserverError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(
                ApiError::ArgumentError(format!("Invalid frequency: {}", frequency)).into(),
            );
        }

        self.stores
            .boards
            .update_frequency(board_id, frequency)
            .await?;
        self.publisher.publish_frequency(board_id, frequency).await?;
        self.board(board_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn measure(&self, board_id: &str) -> Result<(), ObserverError> {
        self.board(board_id).await?;
        self.publisher.publish_measure(board_id).await?;
        Ok(())
    }

    pub async fn health(&self) -> HealthView {
        let database_state = match self.stores.boards.check().await {
            Ok(()) => "healthy".to_owned(),
            Err(e) => format!("{}", e),
        };
        let mqtt_connected = self.publisher.is_connected();

        HealthView {
            healthy: database_state == "healthy" && mqtt_connected,
            database_state,
            mqtt_connected,
            viewer_count: self.broadcaster.len(),
        }
    }
}

fn hash_secret(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Hashing(e.to_string()))
}

fn verify_secret(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ApiError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Hashing(e.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hash_and_verify_secret() {
        let hash = hash_secret("pond-secret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("pond-secret", &hash).unwrap());
        assert!(!verify_secret("wrong", &hash).unwrap());
    }
}
