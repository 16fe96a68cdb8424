//! Outward-facing aircraft views and the snapshots that carry them

use std::time::{Duration, Instant};

use serde::Serialize;

use super::registry::AircraftState;
use super::side_store::ExtraFields;
use super::trail::HistoryPoint;
use crate::types::TransponderAddress;

/// Message type tag on every published snapshot
pub const UPDATE_MESSAGE_TYPE: &str = "aircraft-update";

/// Fully resolved record for one aircraft as subscribers see it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftView {
    pub hex: TransponderAddress,
    pub callsign: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<i32>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub vert_rate: Option<i32>,
    pub squawk: Option<String>,
    pub category: Option<String>,
    pub messages: u64,
    /// Unix milliseconds of the last message
    pub last_seen: i64,
    /// Seconds since the last message
    pub seen: f64,
    pub trace: Vec<HistoryPoint>,
    pub synthetic: bool,
}

/// Build the view for one aircraft.
///
/// Precedence: side store overlay first, registry-native value second. The
/// overlay holds the most recent per-message extraction of those fields.
pub fn merge(
    state: &AircraftState,
    overlay: ExtraFields,
    trace: Vec<HistoryPoint>,
    now: Instant,
    now_ms: i64,
) -> AircraftView {
    let age = now.saturating_duration_since(state.last_seen);

    AircraftView {
        hex: state.address,
        callsign: state.callsign.clone(),
        lat: state.latitude,
        lon: state.longitude,
        altitude: state.altitude_ft,
        speed: state.ground_speed_kts,
        heading: state.track_deg,
        vert_rate: overlay.vertical_rate_fpm.or(state.vertical_rate_fpm),
        squawk: overlay.squawk.or_else(|| state.squawk.clone()),
        category: overlay.category.or_else(|| state.category.clone()),
        messages: state.messages,
        last_seen: now_ms - millis(age),
        seen: age.as_secs_f64(),
        trace,
        synthetic: state.address.is_synthetic(),
    }
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Immutable point-in-time set of aircraft views, ordered by address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp_ms: i64,
    aircraft: Vec<AircraftView>,
}

impl Snapshot {
    pub fn new(timestamp_ms: i64, mut aircraft: Vec<AircraftView>) -> Self {
        aircraft.sort_by_key(|view| view.hex);
        Self {
            kind: UPDATE_MESSAGE_TYPE,
            timestamp_ms,
            aircraft,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn aircraft(&self) -> &[AircraftView] {
        &self.aircraft
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn find(&self, address: TransponderAddress) -> Option<&AircraftView> {
        self.aircraft
            .binary_search_by_key(&address, |view| view.hex)
            .ok()
            .map(|i| &self.aircraft[i])
    }

    /// Wire form pushed to subscribers
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
