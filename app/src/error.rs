use duckweed_core::error::ParseError;
use duckweed_core::SensorType;
use std::error;
use thiserror::Error;

type BoxedError = Box<dyn error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
    #[error("Did not find board: {0}")]
    BoardNotFound(String),
    #[error("Board {0} has no {1} sensor")]
    SensorNotFound(String, SensorType),
    #[error("Did not find relationship: {0}")]
    RelationshipNotFound(i32),
    #[error("A relationship for board {0} and user {1} already exists")]
    DuplicateRelationship(String, i32),
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum MQTTError {
    #[error("Invalid Path: {0}")]
    Path(std::string::String),
    #[error("Invalid Payload: {0}")]
    Payload(std::string::String),
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::error::Error),
    #[error("Invalid status: {0}")]
    Status(std::string::String),
    #[error("Send Failed: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("Invalid broker address: {0}")]
    Broker(std::string::String),
    #[error("Not connected to a broker")]
    NotConnected,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} has an invalid value: {1:?}")]
    Invalid(&'static str, std::string::String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid arguments: {0}")]
    ArgumentError(std::string::String),
    #[error("User {0} may not view board {1}")]
    Forbidden(i32, std::string::String),
    #[error("Password is required for this board")]
    MissingPassword,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Failed hashing password: {0}")]
    Hashing(std::string::String),
}

#[derive(Debug, Error)]
#[error(transparent)]
pub enum ObserverError {
    User(BoxedError),
    NotFound(BoxedError),
    Internal(BoxedError),
}

impl From<DBError> for ObserverError {
    fn from(err: DBError) -> Self {
        match err {
            DBError::BoardNotFound(_)
            | DBError::SensorNotFound(_, _)
            | DBError::RelationshipNotFound(_) => ObserverError::NotFound(Box::from(err)),
            DBError::DuplicateRelationship(_, _) => ObserverError::User(Box::from(err)),
            DBError::SQLError(_) | DBError::Corrupt(_) => ObserverError::Internal(Box::from(err)),
        }
    }
}

impl From<MQTTError> for ObserverError {
    fn from(err: MQTTError) -> Self {
        ObserverError::Internal(Box::from(err))
    }
}

impl From<ApiError> for ObserverError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Hashing(_) => ObserverError::Internal(Box::from(err)),
            _ => ObserverError::User(Box::from(err)),
        }
    }
}

impl From<ParseError> for ObserverError {
    fn from(err: ParseError) -> Self {
        ObserverError::User(Box::from(err))
    }
}
