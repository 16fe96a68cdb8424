//! Aircraft state engine: registry, side store, trails and statistics behind
//! one writer

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Timelike, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::registry::{AircraftRegistry, TrackerStats};
use super::side_store::{ExtraFieldStore, ExtraFields};
use super::snapshot::{merge, Snapshot};
use super::trail::TrailManager;
use crate::config::{Config, Location};
use crate::stats::{ReceiverStats, StatsReport};
use crate::types::DecodedMessage;

/// Engine tunables, lifted from [`Config`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub stale_timeout: Duration,
    pub trail_max_points: usize,
    pub trail_min_displacement_deg: f64,
    pub receiver_location: Option<Location>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            stale_timeout: config.stale_timeout,
            trail_max_points: config.trail_max_points,
            trail_min_displacement_deg: config.trail_min_displacement_deg,
            receiver_location: config.receiver_location,
        }
    }
}

/// Entries removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub extra_fields: usize,
    pub aircraft: usize,
}

pub struct AircraftEngine {
    registry: AircraftRegistry,
    side_store: ExtraFieldStore,
    trails: TrailManager,
    stats: ReceiverStats,
    settings: EngineSettings,
}

impl AircraftEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            registry: AircraftRegistry::new(),
            side_store: ExtraFieldStore::new(settings.stale_timeout),
            trails: TrailManager::new(settings.trail_max_points, settings.trail_min_displacement_deg),
            stats: ReceiverStats::new(settings.receiver_location, Instant::now()),
            settings,
        }
    }

    /// Feed one decoded message through registry, side store, trail and stats
    pub fn apply(&mut self, msg: &DecodedMessage, now: Instant) {
        self.registry.apply(msg, now);

        if msg.has_extra_fields() {
            self.side_store.upsert(msg.address, ExtraFields::from(msg), now);
        }

        if let Some((lat, lon)) = msg.position() {
            self.trails.record_position(msg.address, lat, lon);
        }

        self.stats.record_message(msg, Local::now().hour() as usize);
    }

    pub fn apply_all<'a, I>(&mut self, messages: I, now: Instant)
    where
        I: IntoIterator<Item = &'a DecodedMessage>,
    {
        for msg in messages {
            self.apply(msg, now);
        }
    }

    /// Snapshot of all live aircraft, stamped with the current wall clock
    pub fn snapshot(&self, now: Instant) -> Snapshot {
        self.snapshot_at(now, Utc::now().timestamp_millis())
    }

    /// Snapshot of all live aircraft, stamped with `now_ms`
    pub fn snapshot_at(&self, now: Instant, now_ms: i64) -> Snapshot {
        let timeout = self.settings.stale_timeout;
        let views = self
            .registry
            .all()
            .filter(|state| !state.is_stale(now, timeout))
            .map(|state| {
                merge(
                    state,
                    self.side_store.get(state.address),
                    self.trails.trail_of(state.address),
                    now,
                    now_ms,
                )
            })
            .collect();

        Snapshot::new(now_ms, views)
    }

    /// Drop expired side store entries and stale aircraft with their trails
    pub fn sweep(&mut self, now: Instant) -> SweepReport {
        let extra_fields = self.side_store.sweep(now);
        let pruned = self.registry.prune_stale(now, self.settings.stale_timeout);
        for address in &pruned {
            self.trails.remove(*address);
        }

        let report = SweepReport {
            extra_fields,
            aircraft: pruned.len(),
        };
        if report != SweepReport::default() {
            debug!(
                "Swept {} stale aircraft and {} side store entries, {} remaining",
                report.aircraft,
                report.extra_fields,
                self.registry.len()
            );
        }
        report
    }

    /// Remove every synthetic aircraft. Returns how many were removed.
    pub fn purge_synthetic(&mut self) -> usize {
        let removed = self.registry.remove_where(|state| state.address.is_synthetic());
        for address in &removed {
            self.side_store.remove(*address);
            self.trails.remove(*address);
        }
        removed.len()
    }

    pub fn summary(&self, now: Instant) -> TrackerStats {
        self.registry.stats_summary(now, self.settings.stale_timeout)
    }

    pub fn stats_report(&self, now: Instant) -> StatsReport {
        self.stats.report(now)
    }

    pub fn registry(&self) -> &AircraftRegistry {
        &self.registry
    }

    pub fn side_store(&self) -> &ExtraFieldStore {
        &self.side_store
    }

    pub fn trails(&self) -> &TrailManager {
        &self.trails
    }
}

/// Engine handle shared between the feed, timers and web handlers.
///
/// All mutation goes through the one mutex. Snapshots are built under the
/// lock and serialized after it is released.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<AircraftEngine>>,
}

impl SharedEngine {
    pub fn new(engine: AircraftEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn apply_all(&self, messages: &[DecodedMessage]) {
        if messages.is_empty() {
            return;
        }
        let now = Instant::now();
        self.inner.lock().await.apply_all(messages, now);
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.snapshot(Instant::now())
    }

    pub async fn sweep(&self) -> SweepReport {
        self.inner.lock().await.sweep(Instant::now())
    }

    pub async fn purge_synthetic(&self) -> usize {
        self.inner.lock().await.purge_synthetic()
    }

    pub async fn summary(&self) -> TrackerStats {
        self.inner.lock().await.summary(Instant::now())
    }

    pub async fn stats_report(&self) -> StatsReport {
        self.inner.lock().await.stats_report(Instant::now())
    }
}
