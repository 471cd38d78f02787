use crate::error::DBError;
use chrono::{DateTime, Utc};
use duckweed_core::{Reading, TelemetryMessage};

#[derive(sqlx::FromRow)]
pub struct ReadingDao {
    pub(crate) id: i64,
    pub(crate) board_id: String,
    pub(crate) temperature: f64,
    pub(crate) ec: f64,
    pub(crate) ph: f64,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<ReadingDao> for Reading {
    fn from(val: ReadingDao) -> Self {
        Reading {
            id: val.id,
            board_id: val.board_id,
            temperature: val.temperature,
            ec: val.ec,
            ph: val.ph,
            created_at: val.created_at,
        }
    }
}

/// Appends a reading, the timestamp is assigned by the database
pub async fn insert(
    conn: &sqlx::PgPool,
    board_id: &str,
    msg: &TelemetryMessage,
) -> Result<Reading, DBError> {
    Ok(sql_stmnt!(
        ReadingDao,
        r#"INSERT INTO sensor_logs (board_id, temperature, ec, ph)
            VALUES ($1, $2, $3, $4) RETURNING *"#,
        board_id,
        msg.temperature,
        msg.ec,
        msg.ph
    )
    .fetch_one(conn)
    .await?
    .into())
}

pub async fn get_since(
    conn: &sqlx::PgPool,
    board_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<Reading>, DBError> {
    Ok(sql_stmnt!(
        ReadingDao,
        r#"SELECT * FROM sensor_logs
            WHERE board_id = $1 AND created_at >= $2
            ORDER BY created_at ASC"#,
        board_id,
        since
    )
    .fetch_all(conn)
    .await?
    .into_iter()
    .map(Reading::from)
    .collect())
}
