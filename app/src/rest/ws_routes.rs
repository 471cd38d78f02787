use crate::broadcast::{ConnectionId, FrameReceiver};
use crate::error::ObserverError;
use crate::observer::ConcurrentObserver;
use duckweed_core::{ControlFrame, ViewerId};
use futures::{Sink, SinkExt, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warp::ws::{Message, WebSocket, Ws};
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    viewer_socket(observer.clone())
}

/// GET ws/:viewer_id/:board_id
///
/// Upgrades to a websocket which receives the live events of one board.
/// The first frame is either `subscribed` or a single `error` frame before
/// the socket is closed
fn viewer_socket(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::path!("ws" / ViewerId / String))
        .and(warp::ws())
        .map(
            |observer: Arc<ConcurrentObserver>, viewer_id: ViewerId, board_id: String, ws: Ws| {
                ws.on_upgrade(move |socket| on_viewer_connected(observer, viewer_id, board_id, socket))
            },
        )
        .boxed()
}

async fn on_viewer_connected(
    observer: Arc<ConcurrentObserver>,
    viewer_id: ViewerId,
    board_id: String,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let session = match observer.admission.admit(viewer_id, &board_id).await {
        Ok(session) => session,
        Err(err) => {
            let message = match &err {
                ObserverError::Internal(_) => "Internal server error".to_owned(),
                _ => err.to_string(),
            };
            if let Ok(json) = serde_json::to_string(&ControlFrame::Error { message }) {
                if let Err(e) = ws_tx.send(Message::text(json)).await {
                    debug!("Failed sending error frame: {}", e);
                }
            }
            let _ = ws_tx.close().await;
            return;
        }
    };

    let conn_id = session.conn_id;
    tokio::spawn(forward_frames(
        observer.clone(),
        conn_id,
        session.receiver,
        ws_tx,
    ));

    // client frames are only read to notice the disconnect
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) if msg.is_close() => break,
            Ok(_) => {}
            Err(e) => {
                debug!(conn_id = %conn_id, "Websocket read failed: {}", e);
                break;
            }
        }
    }

    observer.admission.release(conn_id);
    info!(conn_id = %conn_id, viewer_id, board_id = %board_id, "Viewer disconnected");
}

/// Writes queued frames to the socket until the queue closes or a write fails
///
/// Every write, the final close included, is bounded by the websocket write
/// timeout. The connection is released before the socket is closed.
pub(super) async fn forward_frames<S>(
    observer: Arc<ConcurrentObserver>,
    conn_id: ConnectionId,
    mut receiver: FrameReceiver,
    mut sink: S,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let write_timeout = observer.ws_write_timeout();
    while let Some(frame) = receiver.recv().await {
        match tokio::time::timeout(write_timeout, sink.send(Message::text(&*frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(conn_id = %conn_id, "Websocket write failed: {}", e);
                break;
            }
            Err(_) => {
                warn!(conn_id = %conn_id, "Websocket write timed out");
                break;
            }
        }
    }

    observer.admission.release(conn_id);
    let _ = tokio::time::timeout(write_timeout, sink.close()).await;
}
