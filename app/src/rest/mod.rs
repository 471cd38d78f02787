use crate::error::ObserverError;
use crate::observer::ConcurrentObserver;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Reply};

mod board_routes;
mod metric_routes;
mod query;
mod relationship_routes;
mod ws_routes;


#[derive(Debug, Serialize)]
struct ErrorResponseDto {
    error: String,
}

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    metric_routes::routes(observer)
        .or(board_routes::routes(observer))
        .or(relationship_routes::routes(observer))
        .or(ws_routes::routes(observer))
        .with(warp::trace::request())
}

pub async fn dispatch_server_daemon(observer: Arc<ConcurrentObserver>, port: u16) {
    let routes = routes(&observer);

    info!(port, "Starting webserver");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}

fn build_response<T: Serialize>(
    resp: Result<T, ObserverError>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match resp {
        Ok(data) => Ok(warp::reply::json(&data).into_response()),
        Err(ObserverError::User(err)) => {
            warn!("{}", err);
            Ok(error_response(StatusCode::BAD_REQUEST, err.to_string()))
        }
        Err(ObserverError::NotFound(err)) => {
            info!("{}", err);
            Ok(error_response(StatusCode::NOT_FOUND, err.to_string()))
        }
        Err(ObserverError::Internal(err)) => {
            error!("{}", err);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ))
        }
    }
}

fn error_response(status: StatusCode, error: String) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorResponseDto { error }), status)
        .into_response()
}
