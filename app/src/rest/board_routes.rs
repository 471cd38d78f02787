use super::build_response;
use super::query::DaysQuery;
use crate::observer::ConcurrentObserver;
use chrono::Utc;
use duckweed_core::ConnectionMethod;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    pair_board(observer.clone())
        .or(board_details(observer.clone()))
        .or(board_sensors(observer.clone()))
        .or(update_thresholds(observer.clone()))
        .or(board_readings(observer.clone()))
        .or(update_frequency(observer.clone()))
        .or(trigger_measurement(observer.clone()))
}

/// POST api/board/pair
///
/// Links a user to a board, the board is created on first pairing.
/// A board carrying a pairing secret requires the matching `con_password`
///
/// Returns the created relationship
fn pair_board(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::post())
        .and(warp::path!("api" / "board" / "pair"))
        .and(warp::body::json())
        .and_then(
            |observer: Arc<ConcurrentObserver>, body: dto::PairRequestDto| async move {
                let resp = observer
                    .boards
                    .pair(
                        body.user_id,
                        &body.board_id,
                        body.board_name,
                        body.con_method.unwrap_or(ConnectionMethod::Manual),
                        body.con_password,
                        Utc::now(),
                    )
                    .await;
                build_response(resp)
            },
        )
        .boxed()
}

/// GET api/board/:board_id
fn board_details(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::get())
        .and(warp::path!("api" / "board" / String))
        .and_then(
            |observer: Arc<ConcurrentObserver>, board_id: String| async move {
                let resp = observer.boards.board(&board_id).await;
                build_response(resp)
            },
        )
        .boxed()
}

/// GET api/board/:board_id/sensors
fn board_sensors(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::get())
        .and(warp::path!("api" / "board" / String / "sensors"))
        .and_then(
            |observer: Arc<ConcurrentObserver>, board_id: String| async move {
                let resp = observer.boards.sensors(&board_id).await;
                build_response(resp)
            },
        )
        .boxed()
}

/// PUT api/board/:board_id/sensors
///
/// Replaces both thresholds of one sensor, a missing bound is not checked
fn update_thresholds(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::put())
        .and(warp::path!("api" / "board" / String / "sensors"))
        .and(warp::body::json())
        .and_then(
            |observer: Arc<ConcurrentObserver>,
             board_id: String,
             body: dto::ThresholdRequestDto| async move {
                let resp = observer
                    .boards
                    .update_thresholds(
                        &board_id,
                        body.sensor_type,
                        body.sensor_threshold_min,
                        body.sensor_threshold_max,
                    )
                    .await;
                build_response(resp)
            },
        )
        .boxed()
}

/// GET api/board/:board_id/readings?days=N
///
/// Returns the readings of the last N days (default 1, at most 365), oldest first
fn board_readings(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::get())
        .and(warp::path!("api" / "board" / String / "readings"))
        .and(warp::query::<DaysQuery>())
        .and_then(
            |observer: Arc<ConcurrentObserver>, board_id: String, query: DaysQuery| async move {
                let resp = observer
                    .boards
                    .readings(&board_id, query.days(), Utc::now())
                    .await;
                build_response(resp)
            },
        )
        .boxed()
}

/// PUT api/board/:board_id/frequency
///
/// Stores the reporting interval and sends it to the board
fn update_frequency(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::put())
        .and(warp::path!("api" / "board" / String / "frequency"))
        .and(warp::body::json())
        .and_then(
            |observer: Arc<ConcurrentObserver>,
             board_id: String,
             body: dto::FrequencyRequestDto| async move {
                let resp = observer
                    .boards
                    .update_frequency(&board_id, body.frequency)
                    .await;
                build_response(resp)
            },
        )
        .boxed()
}

/// POST api/board/:board_id/measure
///
/// Asks the board for an immediate reading
fn trigger_measurement(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::post())
        .and(warp::path!("api" / "board" / String / "measure"))
        .and_then(
            |observer: Arc<ConcurrentObserver>, board_id: String| async move {
                let resp = observer.boards.measure(&board_id).await;
                build_response(resp)
            },
        )
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use duckweed_core::{ConnectionMethod, SensorType};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PairRequestDto {
        pub user_id: i32,
        pub board_id: String,
        pub board_name: Option<String>,
        pub con_method: Option<ConnectionMethod>,
        pub con_password: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ThresholdRequestDto {
        pub sensor_type: SensorType,
        pub sensor_threshold_min: Option<f64>,
        pub sensor_threshold_max: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FrequencyRequestDto {
        pub frequency: f64,
    }
}
