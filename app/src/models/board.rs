use crate::error::DBError;
use chrono::{DateTime, Utc};
use duckweed_core::{Board, BoardStatus};

#[derive(sqlx::FromRow, Debug)]
pub struct BoardDao {
    pub(crate) id: i32,
    pub(crate) board_id: String,
    pub(crate) board_name: Option<String>,
    pub(crate) board_status: String,
    pub(crate) con_password: Option<String>,
    pub(crate) last_seen: Option<DateTime<Utc>>,
    pub(crate) sensor_frequency: Option<f64>,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<BoardDao> for Board {
    type Error = DBError;

    fn try_from(dao: BoardDao) -> Result<Self, Self::Error> {
        Ok(Board {
            id: dao.id,
            board_id: dao.board_id,
            board_name: dao.board_name,
            status: dao.board_status.parse::<BoardStatus>()?,
            con_password: dao.con_password,
            last_seen: dao.last_seen,
            sensor_frequency: dao.sensor_frequency,
            created_at: dao.created_at,
        })
    }
}

pub async fn insert(conn: &sqlx::PgPool, board: &Board) -> Result<Board, DBError> {
    sql_stmnt!(
        BoardDao,
        r#"INSERT INTO boards (board_id, board_name, board_status, con_password, last_seen, sensor_frequency)
            VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"#,
        &board.board_id,
        &board.board_name,
        board.status.as_str(),
        &board.con_password,
        board.last_seen,
        board.sensor_frequency
    )
    .fetch_one(conn)
    .await?
    .try_into()
}

pub async fn get(conn: &sqlx::PgPool, board_id: &str) -> Result<Option<Board>, DBError> {
    sql_stmnt!(
        BoardDao,
        "SELECT * FROM boards WHERE board_id = $1",
        board_id
    )
    .fetch_optional(conn)
    .await?
    .map(Board::try_from)
    .transpose()
}

/// READ boards
pub async fn read(conn: &sqlx::PgPool) -> Result<Vec<Board>, DBError> {
    sql_stmnt!(BoardDao, "SELECT * FROM boards ORDER BY id ASC")
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Board::try_from)
        .collect()
}

pub async fn update(conn: &sqlx::PgPool, board: &Board) -> Result<(), DBError> {
    let result = sql_stmnt!(
        r#"UPDATE boards
            SET board_name = $2, board_status = $3, con_password = $4, last_seen = $5, sensor_frequency = $6
            WHERE board_id = $1"#,
        &board.board_id,
        &board.board_name,
        board.status.as_str(),
        &board.con_password,
        board.last_seen,
        board.sensor_frequency
    )
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DBError::BoardNotFound(board.board_id.clone()));
    }
    Ok(())
}

pub async fn update_last_seen(
    conn: &sqlx::PgPool,
    board_id: &str,
    seen: DateTime<Utc>,
) -> Result<(), DBError> {
    sql_stmnt!(
        "UPDATE boards SET last_seen = $2 WHERE board_id = $1",
        board_id,
        seen
    )
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_frequency(
    conn: &sqlx::PgPool,
    board_id: &str,
    frequency: f64,
) -> Result<(), DBError> {
    let result = sql_stmnt!(
        "UPDATE boards SET sensor_frequency = $2 WHERE board_id = $1",
        board_id,
        frequency
    )
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DBError::BoardNotFound(board_id.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
pub async fn delete(conn: &sqlx::PgPool, board_id: &str) -> Result<(), DBError> {
    sql_stmnt!("DELETE FROM board_relationships WHERE board_id = $1", board_id)
        .execute(conn)
        .await?;
    sql_stmnt!("DELETE FROM sensor_logs WHERE board_id = $1", board_id)
        .execute(conn)
        .await?;
    sql_stmnt!("DELETE FROM sensors WHERE board_id = $1", board_id)
        .execute(conn)
        .await?;
    sql_stmnt!("DELETE FROM boards WHERE board_id = $1", board_id)
        .execute(conn)
        .await?;
    Ok(())
}
