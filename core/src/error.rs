use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Invalid board status: {0}")]
    Status(std::string::String),
    #[error("Invalid sensor type: {0}")]
    SensorType(std::string::String),
    #[error("Invalid connection method: {0}")]
    ConnectionMethod(std::string::String),
}
