use super::*;
use chrono::Utc;
use duckweed_core::BoardStatus;

async fn connect() -> sqlx::PgPool {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").unwrap();
    let conn = establish_db_connection(&url).await.unwrap();
    run_migrations(&conn).await.unwrap();
    conn
}

#[tokio::test]
#[ignore = "needs a postgres database"]
async fn test_db_connection() {
    let conn = connect().await;
    check_schema(&conn).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a postgres database"]
async fn crud_boards() {
    let conn = connect().await;
    let board_id = "crud-board";
    board::delete(&conn, board_id).await.unwrap();

    // create
    let mut created = board::insert(&conn, &Board::new(board_id, None, Utc::now()))
        .await
        .unwrap();
    assert_eq!(BoardStatus::Active, created.status);

    // read
    assert!(board::get(&conn, board_id).await.unwrap().is_some());
    assert!(!board::read(&conn).await.unwrap().is_empty());

    // update
    created.status = BoardStatus::Inactive;
    board::update(&conn, &created).await.unwrap();
    board::update_frequency(&conn, board_id, 10.0).await.unwrap();
    let actual = board::get(&conn, board_id).await.unwrap().unwrap();
    assert_eq!(BoardStatus::Inactive, actual.status);
    assert_eq!(Some(10.0), actual.sensor_frequency);

    // delete
    board::delete(&conn, board_id).await.unwrap();
    assert!(board::get(&conn, board_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "needs a postgres database"]
async fn crud_sensors_and_readings() {
    let conn = connect().await;
    let board_id = "crud-sensors";
    board::delete(&conn, board_id).await.unwrap();
    board::insert(&conn, &Board::new(board_id, None, Utc::now()))
        .await
        .unwrap();

    // sensors are only created once
    assert_eq!(3, sensor::ensure(&conn, board_id).await.unwrap());
    assert_eq!(0, sensor::ensure(&conn, board_id).await.unwrap());

    let updated = sensor::update_thresholds(&conn, board_id, SensorType::Temperature, None, Some(30.0))
        .await
        .unwrap();
    assert_eq!(Some(30.0), updated.threshold_max);
    assert_eq!(3, sensor::get(&conn, board_id).await.unwrap().len());

    let msg = TelemetryMessage {
        temperature: 25.0,
        ec: 1.2,
        ph: 7.0,
    };
    let since = Utc::now() - chrono::Duration::minutes(1);
    reading::insert(&conn, board_id, &msg).await.unwrap();
    let readings = reading::get_since(&conn, board_id, since).await.unwrap();
    assert_eq!(1, readings.len());
    assert_eq!(25.0, readings[0].temperature);

    board::delete(&conn, board_id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a postgres database"]
async fn crud_relationships() {
    let conn = connect().await;
    let board_id = "crud-relationships";
    board::delete(&conn, board_id).await.unwrap();
    board::insert(&conn, &Board::new(board_id, None, Utc::now()))
        .await
        .unwrap();

    let created = relationship::insert(&conn, board_id, 42, ConnectionMethod::Manual)
        .await
        .unwrap();
    assert!(relationship::exists(&conn, 42, board_id).await.unwrap());
    assert_eq!(1, relationship::count_active(&conn, board_id).await.unwrap());

    let duplicate = relationship::insert(&conn, board_id, 42, ConnectionMethod::Manual).await;
    assert!(matches!(
        duplicate,
        Err(DBError::DuplicateRelationship(_, 42))
    ));

    relationship::update_status(&conn, created.id, BoardStatus::Disabled)
        .await
        .unwrap();
    assert!(!relationship::exists(&conn, 42, board_id).await.unwrap());
    assert_eq!(1, relationship::get_by_user(&conn, 42).await.unwrap().len());

    board::delete(&conn, board_id).await.unwrap();
}
