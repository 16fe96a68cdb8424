//! Wires engine, feed supervisor and timers into one cancellable unit

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aircraft::{AircraftEngine, EngineSettings, SharedEngine};
use crate::broadcast::{run_broadcast_loop, run_sweep_loop, SUBSCRIBER_BUFFER};
use crate::config::Config;
use crate::feed::{ConnectionState, FallbackSettings, FeedSupervisor, SupervisorSettings};
use crate::web::AppState;

/// Running background tasks and the handles web handlers need
pub struct Runtime {
    engine: SharedEngine,
    broadcast_tx: broadcast::Sender<String>,
    feed_state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Runtime {
    /// Spawn the feed supervisor, broadcast loop and sweep timer
    pub fn start(config: &Config) -> Self {
        let cancel = CancellationToken::new();
        let engine = SharedEngine::new(AircraftEngine::new(EngineSettings::from(config)));
        let (broadcast_tx, _) = broadcast::channel::<String>(SUBSCRIBER_BUFFER);

        let supervisor = FeedSupervisor::new(
            SupervisorSettings::from(config),
            FallbackSettings::from(config),
            engine.clone(),
            cancel.child_token(),
        );
        let feed_state = supervisor.subscribe();

        let tasks = vec![
            ("feed", tokio::spawn(supervisor.run())),
            (
                "broadcast",
                tokio::spawn(run_broadcast_loop(
                    engine.clone(),
                    broadcast_tx.clone(),
                    config.broadcast_interval,
                    cancel.child_token(),
                )),
            ),
            (
                "sweep",
                tokio::spawn(run_sweep_loop(
                    engine.clone(),
                    config.sweep_interval,
                    cancel.child_token(),
                )),
            ),
        ];

        Self {
            engine,
            broadcast_tx,
            feed_state,
            cancel,
            tasks,
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// State for the web router
    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            engine: self.engine.clone(),
            broadcast_tx: self.broadcast_tx.clone(),
            feed_state: self.feed_state.clone(),
        })
    }

    /// Token cancelled on shutdown, for tying other tasks to the runtime
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every task and wait for them to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                warn!("{} task ended abnormally: {}", name, e);
            }
        }
        info!("Runtime stopped");
    }
}
