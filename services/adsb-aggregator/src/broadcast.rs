//! Periodic snapshot publishing and stale-entry sweeping

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::aircraft::SharedEngine;

/// Snapshots buffered per subscriber before it starts lagging
pub const SUBSCRIBER_BUFFER: usize = 16;

/// Build one snapshot and push it to every subscriber.
///
/// Returns how many subscribers received it. Having none is not an error.
pub async fn publish_snapshot(engine: &SharedEngine, tx: &broadcast::Sender<String>) -> usize {
    // Lock is released before serialization
    let snapshot = engine.snapshot().await;

    match snapshot.to_json() {
        Ok(json) => tx.send(json).unwrap_or(0),
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            0
        }
    }
}

/// Publish a snapshot every `interval` until cancelled
pub async fn run_broadcast_loop(
    engine: SharedEngine,
    tx: broadcast::Sender<String>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("[Broadcast] Publishing snapshots every {:?}", interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let receivers = publish_snapshot(&engine, &tx).await;
                debug!("[Broadcast] Snapshot sent to {} subscribers", receivers);
            }
        }
    }

    debug!("[Broadcast] Loop stopped");
}

/// Sweep stale aircraft and side store entries every `interval` until cancelled
pub async fn run_sweep_loop(engine: SharedEngine, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; nothing is stale yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                engine.sweep().await;
            }
        }
    }

    debug!("[Sweep] Loop stopped");
}
