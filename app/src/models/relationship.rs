use super::CountRecord;
use crate::error::DBError;
use chrono::{DateTime, Utc};
use duckweed_core::{BoardRelationship, ConnectionMethod, RelationshipStatus, ViewerId};

#[derive(sqlx::FromRow, Debug)]
pub struct RelationshipDao {
    pub(crate) id: i32,
    pub(crate) board_id: String,
    pub(crate) user_id: i32,
    pub(crate) con_method: String,
    pub(crate) con_status: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl TryFrom<RelationshipDao> for BoardRelationship {
    type Error = DBError;

    fn try_from(dao: RelationshipDao) -> Result<Self, Self::Error> {
        Ok(BoardRelationship {
            id: dao.id,
            board_id: dao.board_id,
            viewer_id: dao.user_id,
            con_method: dao.con_method.parse::<ConnectionMethod>()?,
            con_status: dao.con_status.parse::<RelationshipStatus>()?,
            created_at: dao.created_at,
            updated_at: dao.updated_at,
        })
    }
}

pub async fn exists(
    conn: &sqlx::PgPool,
    viewer_id: ViewerId,
    board_id: &str,
) -> Result<bool, DBError> {
    let record = sql_stmnt!(
        CountRecord,
        r#"SELECT count(*) as count FROM board_relationships
            WHERE user_id = $1 AND board_id = $2 AND con_status <> 'disabled'"#,
        viewer_id,
        board_id
    )
    .fetch_one(conn)
    .await?;
    Ok(record.count() > 0)
}

pub async fn count_active(conn: &sqlx::PgPool, board_id: &str) -> Result<i64, DBError> {
    Ok(sql_stmnt!(
        CountRecord,
        r#"SELECT count(*) as count FROM board_relationships
            WHERE board_id = $1 AND con_status = 'active'"#,
        board_id
    )
    .fetch_one(conn)
    .await?
    .count())
}

pub async fn get(
    conn: &sqlx::PgPool,
    board_id: &str,
    viewer_id: ViewerId,
) -> Result<Option<BoardRelationship>, DBError> {
    sql_stmnt!(
        RelationshipDao,
        "SELECT * FROM board_relationships WHERE board_id = $1 AND user_id = $2",
        board_id,
        viewer_id
    )
    .fetch_optional(conn)
    .await?
    .map(BoardRelationship::try_from)
    .transpose()
}

pub async fn get_by_user(
    conn: &sqlx::PgPool,
    viewer_id: ViewerId,
) -> Result<Vec<BoardRelationship>, DBError> {
    sql_stmnt!(
        RelationshipDao,
        "SELECT * FROM board_relationships WHERE user_id = $1 ORDER BY id ASC",
        viewer_id
    )
    .fetch_all(conn)
    .await?
    .into_iter()
    .map(BoardRelationship::try_from)
    .collect()
}

pub async fn insert(
    conn: &sqlx::PgPool,
    board_id: &str,
    viewer_id: ViewerId,
    con_method: ConnectionMethod,
) -> Result<BoardRelationship, DBError> {
    let result = sql_stmnt!(
        RelationshipDao,
        r#"INSERT INTO board_relationships (board_id, user_id, con_method, con_status)
            VALUES ($1, $2, $3, 'active') RETURNING *"#,
        board_id,
        viewer_id,
        con_method.as_str()
    )
    .fetch_one(conn)
    .await;

    match result {
        Ok(dao) => dao.try_into(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
            DBError::DuplicateRelationship(board_id.to_owned(), viewer_id),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_status(
    conn: &sqlx::PgPool,
    id: i32,
    status: RelationshipStatus,
) -> Result<BoardRelationship, DBError> {
    sql_stmnt!(
        RelationshipDao,
        r#"UPDATE board_relationships SET con_status = $2, updated_at = NOW()
            WHERE id = $1 RETURNING *"#,
        id,
        status.as_str()
    )
    .fetch_optional(conn)
    .await?
    .ok_or(DBError::RelationshipNotFound(id))?
    .try_into()
}
