use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::models::{BoardDirectory, ReadingStore, RelationshipStore};
use crate::mqtt::{BoardMessage, CommandPublisher};
use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub mod admission;
pub mod board;
pub mod ingest;
pub mod liveness;


pub use admission::{ConnectionAdmission, Session};
pub use board::BoardObserver;
pub use ingest::{DropReason, IngestOutcome, IngestionGateway};
pub use liveness::LivenessMonitor;

/// Number of sequential ingest workers, boards are spread across them
const INGEST_LANES: usize = 8;

fn ingest_lane(board_id: &str, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    board_id.hash(&mut hasher);
    (hasher.finish() % lanes as u64) as usize
}

/// Handles to every store interface
#[derive(Clone)]
pub struct Stores {
    pub boards: Arc<dyn BoardDirectory>,
    pub readings: Arc<dyn ReadingStore>,
    pub relationships: Arc<dyn RelationshipStore>,
}

impl Stores {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: BoardDirectory + ReadingStore + RelationshipStore + 'static,
    {
        Stores {
            boards: store.clone(),
            readings: store.clone(),
            relationships: store,
        }
    }
}

pub struct ConcurrentObserver {
    pub(crate) ingest: IngestionGateway,
    pub(crate) liveness: LivenessMonitor,
    pub(crate) admission: ConnectionAdmission,
    pub(crate) boards: BoardObserver,
    pub(crate) broadcaster: Broadcaster,
    ws_write_timeout: Duration,
    message_receiver: Mutex<UnboundedReceiver<BoardMessage>>,
}

impl Debug for ConcurrentObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentObserver").finish()
    }
}

impl ConcurrentObserver {
    pub fn new(
        stores: Stores,
        publisher: Arc<dyn CommandPublisher>,
        message_receiver: UnboundedReceiver<BoardMessage>,
        config: &Config,
    ) -> Arc<Self> {
        let broadcaster = Broadcaster::new(config.ws_buffer());
        let observer = ConcurrentObserver {
            ingest: IngestionGateway::new(
                stores.clone(),
                broadcaster.clone(),
                config.require_owner(),
            ),
            liveness: LivenessMonitor::new(
                stores.boards.clone(),
                broadcaster.clone(),
                config.liveness_window(),
            ),
            admission: ConnectionAdmission::new(
                stores.relationships.clone(),
                broadcaster.clone(),
            ),
            boards: BoardObserver::new(stores, publisher, broadcaster.clone()),
            broadcaster,
            ws_write_timeout: config.ws_write_timeout(),
            message_receiver: Mutex::new(message_receiver),
        };
        Arc::new(observer)
    }

    pub fn ws_write_timeout(&self) -> Duration {
        self.ws_write_timeout
    }

    /// Feeds every decoded transport message through the ingestion gateway
    ///
    /// Messages are spread over a fixed set of lanes by board id. A lane
    /// handles its messages one after another, so persistence and broadcast
    /// of a single board follow the delivery order, while a slow store round
    /// trip only holds back the boards sharing that lane.
    /// Blocks caller task until the message channel closes
    pub async fn dispatch_ingest_loop(self: Arc<ConcurrentObserver>) {
        let receiver_res = self.message_receiver.try_lock();
        let mut receiver = match receiver_res {
            Ok(receiver) => receiver,
            Err(_) => {
                error!("dispatch_ingest_loop() already called!");
                return;
            }
        };

        let mut lanes = Vec::with_capacity(INGEST_LANES);
        let mut workers = Vec::with_capacity(INGEST_LANES);
        for lane in 0..INGEST_LANES {
            let (lane_tx, lane_rx) = mpsc::unbounded_channel();
            lanes.push(lane_tx);
            workers.push(tokio::spawn(
                self.clone().dispatch_ingest_lane(lane, lane_rx),
            ));
        }

        info!(lanes = INGEST_LANES, "Start capturing board messages");
        while let Some(msg) = receiver.recv().await {
            let lane = ingest_lane(msg.board_id(), lanes.len());
            if lanes[lane].send(msg).is_err() {
                error!(lane, "Ingest lane stopped, message dropped");
            }
        }

        drop(lanes);
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Ingest lane failed: {}", e);
            }
        }
        warn!("Board message channel closed");
    }

    async fn dispatch_ingest_lane(
        self: Arc<ConcurrentObserver>,
        lane: usize,
        mut receiver: UnboundedReceiver<BoardMessage>,
    ) {
        while let Some(msg) = receiver.recv().await {
            let span = info_span!("ingest", lane, board_id = %msg.board_id());
            match self.ingest.handle(msg, Utc::now()).instrument(span).await {
                Ok(outcome) => debug!("{:?}", outcome),
                Err(e) => error!("Failed ingesting message: {}", e),
            }
        }
    }

    /// Demotes silent boards on every tick
    /// Blocks caller task in infinite loop
    pub async fn dispatch_liveness_loop(self: Arc<ConcurrentObserver>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(period_secs = period.as_secs(), "Start liveness monitor");
        loop {
            interval.tick().await;
            let span = info_span!("liveness");
            if let Err(e) = self.liveness.tick(Utc::now()).instrument(span).await {
                error!("Liveness sweep failed: {}", e);
            }
        }
    }
}
