use crate::error::DBError;
use chrono::{DateTime, Utc};
use duckweed_core::{Sensor, SensorType};

#[derive(sqlx::FromRow, Debug)]
pub struct SensorDao {
    pub(crate) id: i32,
    pub(crate) board_id: String,
    pub(crate) sensor_type: String,
    pub(crate) sensor_threshold_min: Option<f64>,
    pub(crate) sensor_threshold_max: Option<f64>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl TryFrom<SensorDao> for Sensor {
    type Error = DBError;

    fn try_from(dao: SensorDao) -> Result<Self, Self::Error> {
        Ok(Sensor {
            id: dao.id,
            board_id: dao.board_id,
            sensor_type: dao.sensor_type.parse::<SensorType>()?,
            threshold_min: dao.sensor_threshold_min,
            threshold_max: dao.sensor_threshold_max,
            updated_at: dao.updated_at,
        })
    }
}

/// Inserts every missing sensor type, returns how many were created
pub async fn ensure(conn: &sqlx::PgPool, board_id: &str) -> Result<u64, DBError> {
    let mut created = 0;
    for sensor_type in SensorType::ALL {
        created += sql_stmnt!(
            r#"INSERT INTO sensors (board_id, sensor_type) VALUES ($1, $2)
                ON CONFLICT (board_id, sensor_type) DO NOTHING"#,
            board_id,
            sensor_type.as_str()
        )
        .execute(conn)
        .await?
        .rows_affected();
    }
    Ok(created)
}

// READ sensors
pub async fn get(conn: &sqlx::PgPool, board_id: &str) -> Result<Vec<Sensor>, DBError> {
    sql_stmnt!(
        SensorDao,
        "SELECT * FROM sensors WHERE board_id = $1 ORDER BY id ASC",
        board_id
    )
    .fetch_all(conn)
    .await?
    .into_iter()
    .map(Sensor::try_from)
    .collect()
}

pub async fn update_thresholds(
    conn: &sqlx::PgPool,
    board_id: &str,
    sensor_type: SensorType,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Sensor, DBError> {
    sql_stmnt!(
        SensorDao,
        r#"UPDATE sensors
            SET sensor_threshold_min = $3, sensor_threshold_max = $4, updated_at = NOW()
            WHERE board_id = $1 AND sensor_type = $2
            RETURNING *"#,
        board_id,
        sensor_type.as_str(),
        min,
        max
    )
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DBError::SensorNotFound(board_id.to_owned(), sensor_type))?
    .try_into()
}
