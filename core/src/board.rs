use crate::error::ParseError;
use crate::ViewerId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a board, also used for relationships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardStatus {
    Active,
    Inactive,
    Disabled,
}

impl BoardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardStatus::Active => "active",
            BoardStatus::Inactive => "inactive",
            BoardStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BoardStatus::Active),
            "inactive" => Ok(BoardStatus::Inactive),
            "disabled" => Ok(BoardStatus::Disabled),
            _ => Err(ParseError::Status(s.to_owned())),
        }
    }
}

/// A relationship shares the token set of a board
pub type RelationshipStatus = BoardStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: i32,
    pub board_id: String,
    pub board_name: Option<String>,
    #[serde(rename = "board_status")]
    pub status: BoardStatus,
    /// Argon2 PHC string of the pairing secret, never leaves the process
    #[serde(skip)]
    pub con_password: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub sensor_frequency: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Board {
    pub fn new(board_id: &str, board_name: Option<String>, now: DateTime<Utc>) -> Self {
        Board {
            id: 0,
            board_id: board_id.to_owned(),
            board_name,
            status: BoardStatus::Active,
            con_password: None,
            last_seen: Some(now),
            sensor_frequency: None,
            created_at: now,
        }
    }

    /// True if the board reported before, but not within `window`
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.last_seen {
            Some(last_seen) => now - last_seen > window,
            None => false,
        }
    }

    pub fn has_secret(&self) -> bool {
        matches!(&self.con_password, Some(hash) if !hash.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMethod {
    Manual,
    Bluetooth,
}

impl ConnectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMethod::Manual => "manual",
            ConnectionMethod::Bluetooth => "bluetooth",
        }
    }
}

impl FromStr for ConnectionMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ConnectionMethod::Manual),
            "bluetooth" => Ok(ConnectionMethod::Bluetooth),
            _ => Err(ParseError::ConnectionMethod(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRelationship {
    pub id: i32,
    pub board_id: String,
    #[serde(rename = "user_id")]
    pub viewer_id: ViewerId,
    pub con_method: ConnectionMethod,
    pub con_status: RelationshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoardRelationship {
    /// Live viewing is granted to every relationship that is not disabled
    pub fn grants_view(&self) -> bool {
        self.con_status != BoardStatus::Disabled
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_tokens() {
        for status in [
            BoardStatus::Active,
            BoardStatus::Inactive,
            BoardStatus::Disabled,
        ] {
            assert_eq!(Ok(status), status.as_str().parse());
        }
        assert!("offline".parse::<BoardStatus>().is_err());
        assert!("Active".parse::<BoardStatus>().is_err());
    }

    #[test]
    fn test_stale_board() {
        let now = Utc::now();
        let mut board = Board::new("B1", None, now - Duration::seconds(61));
        assert!(board.is_stale(now, Duration::seconds(60)));
        assert!(!board.is_stale(now, Duration::seconds(120)));

        board.last_seen = None;
        assert!(!board.is_stale(now, Duration::seconds(0)));
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let mut board = Board::new("B1", Some("Pond".to_owned()), Utc::now());
        board.con_password = Some("$argon2id$hash".to_owned());

        let json = serde_json::to_value(&board).unwrap();
        assert!(json.get("con_password").is_none());
        assert_eq!("active", json["board_status"]);
        assert_eq!("B1", json["board_id"]);
    }
}
