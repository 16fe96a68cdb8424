//! Synthetic fleet task, armed while the receiver is unreachable

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aircraft::SharedEngine;
use crate::config::{Config, Location};
use crate::synthetic::SyntheticFleet;

#[derive(Debug, Clone)]
pub struct FallbackSettings {
    pub center: Location,
    pub aircraft: usize,
    pub tick: Duration,
}

impl From<&Config> for FallbackSettings {
    fn from(config: &Config) -> Self {
        Self {
            center: config.synthetic_center,
            aircraft: config.synthetic_aircraft,
            tick: config.synthetic_tick,
        }
    }
}

struct RunningFleet {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns at most one running synthetic fleet
pub struct SyntheticFallback {
    settings: FallbackSettings,
    engine: SharedEngine,
    parent: CancellationToken,
    running: Option<RunningFleet>,
}

impl SyntheticFallback {
    pub fn new(settings: FallbackSettings, engine: SharedEngine, parent: CancellationToken) -> Self {
        Self {
            settings,
            engine,
            parent,
            running: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.running.is_some()
    }

    /// Start the fleet. A no-op returning false when already armed.
    pub fn arm(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }

        info!(
            "[Fallback] Receiver unavailable, starting {} synthetic aircraft around ({:.4}, {:.4})",
            self.settings.aircraft, self.settings.center.lat, self.settings.center.lon
        );

        let cancel = self.parent.child_token();
        let fleet = SyntheticFleet::new(self.settings.center, self.settings.aircraft, rand::random());
        let task = tokio::spawn(run_fleet(fleet, self.settings.tick, self.engine.clone(), cancel.clone()));
        self.running = Some(RunningFleet { cancel, task });
        true
    }

    /// Stop the fleet and remove its aircraft. Returns false when not armed.
    pub async fn disarm(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };

        running.cancel.cancel();
        // Wait out any in-flight update so nothing lands after the purge
        if let Err(e) = running.task.await {
            warn!("[Fallback] Synthetic fleet task ended abnormally: {}", e);
        }

        let purged = self.engine.purge_synthetic().await;
        info!("[Fallback] Synthetic feed stopped, removed {} synthetic aircraft", purged);
        true
    }
}

async fn run_fleet(mut fleet: SyntheticFleet, tick: Duration, engine: SharedEngine, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = last_tick.map_or(Duration::ZERO, |t| now - t);
                last_tick = Some(now);

                let messages = fleet.tick(dt);
                engine.apply_all(&messages).await;
            }
        }
    }

    debug!("[Fallback] Fleet task exited");
}
