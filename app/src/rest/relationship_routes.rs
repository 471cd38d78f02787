use super::build_response;
use crate::observer::ConcurrentObserver;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    viewer_relationships(observer.clone()).or(update_relationship_status(observer.clone()))
}

/// GET api/viewer/:viewer_id/relationships
///
/// Returns every relationship of the viewer, with board name and frequency
fn viewer_relationships(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::get())
        .and(warp::path!("api" / "viewer" / i32 / "relationships"))
        .and_then(|observer: Arc<ConcurrentObserver>, viewer_id: i32| async move {
            let resp = observer.boards.relationships(viewer_id).await;
            build_response(resp)
        })
        .boxed()
}

/// PUT api/relationship/:id/status
///
/// A disabled relationship no longer grants live viewing
fn update_relationship_status(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::put())
        .and(warp::path!("api" / "relationship" / i32 / "status"))
        .and(warp::body::json())
        .and_then(
            |observer: Arc<ConcurrentObserver>, id: i32, body: dto::StatusRequestDto| async move {
                let resp = observer
                    .boards
                    .update_relationship_status(id, body.con_status)
                    .await;
                build_response(resp)
            },
        )
        .boxed()
}

pub mod dto {
    use duckweed_core::RelationshipStatus;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusRequestDto {
        pub con_status: RelationshipStatus,
    }
}
