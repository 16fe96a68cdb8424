//! Receiver statistics: message rates, coverage and reach

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use serde::Serialize;
use tracing::warn;

use crate::config::Location;
use crate::geo::{bearing_deg, haversine_km};
use crate::types::{DecodedMessage, TransponderAddress};

/// Width of one coverage sector in degrees
const SECTOR_DEG: f64 = 10.0;
const SECTORS: usize = 36;

/// Distinct addresses remembered for the aircraft total. The set is never
/// swept, so this bounds it for long-running processes fed noisy frames.
pub const MAX_TRACKED_ADDRESSES: usize = 65_536;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HourBucket {
    pub hour: usize,
    pub total: u64,
    pub adsb: u64,
    #[serde(rename = "modeS")]
    pub mode_s: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageBucket {
    pub angle: u32,
    pub max_distance: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_aircraft: usize,
    pub total_messages: u64,
    pub max_distance: f64,
    pub uptime: u64,
}

/// Point-in-time copy of the statistics, shaped for the stats endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub messages_per_hour: Vec<HourBucket>,
    pub coverage: Vec<CoverageBucket>,
    pub message_types: BTreeMap<String, u64>,
    pub summary: StatsSummary,
}

/// Running statistics for real (non-synthetic) traffic
#[derive(Debug, Clone)]
pub struct ReceiverStats {
    started: Instant,
    receiver: Option<Location>,
    total_messages: u64,
    /// Distinct addresses since start, capped at `address_cap`
    seen: HashSet<TransponderAddress>,
    address_cap: usize,
    hourly: Vec<HourBucket>,
    coverage: Vec<CoverageBucket>,
    message_types: BTreeMap<String, u64>,
    max_distance_km: f64,
}

impl ReceiverStats {
    pub fn new(receiver: Option<Location>, started: Instant) -> Self {
        Self {
            started,
            receiver,
            total_messages: 0,
            seen: HashSet::new(),
            address_cap: MAX_TRACKED_ADDRESSES,
            hourly: (0..24).map(|hour| HourBucket { hour, ..Default::default() }).collect(),
            coverage: (0..SECTORS)
                .map(|i| CoverageBucket {
                    angle: (i as f64 * SECTOR_DEG) as u32,
                    ..Default::default()
                })
                .collect(),
            message_types: BTreeMap::new(),
            max_distance_km: 0.0,
        }
    }

    /// Count one decoded message received during local hour `hour`
    pub fn record_message(&mut self, msg: &DecodedMessage, hour: usize) {
        if msg.address.is_synthetic() {
            return;
        }

        self.total_messages += 1;
        self.remember_address(msg.address);

        let bucket = &mut self.hourly[hour % 24];
        bucket.total += 1;
        match msg.downlink_format {
            Some(17) | Some(18) => bucket.adsb += 1,
            _ => bucket.mode_s += 1,
        }

        if let Some(df) = msg.downlink_format {
            *self.message_types.entry(format!("DF{}", df)).or_insert(0) += 1;
        }

        if let Some((lat, lon)) = msg.position() {
            self.record_position(lat, lon);
        }
    }

    fn remember_address(&mut self, address: TransponderAddress) {
        if self.seen.len() < self.address_cap {
            self.seen.insert(address);
            if self.seen.len() == self.address_cap {
                warn!(
                    "[Stats] Tracked {} distinct addresses, aircraft total is now saturated",
                    self.address_cap
                );
            }
        }
    }

    fn record_position(&mut self, lat: f64, lon: f64) {
        let Some(receiver) = self.receiver else {
            return;
        };

        let distance = haversine_km(receiver.lat, receiver.lon, lat, lon);
        let bearing = bearing_deg(receiver.lat, receiver.lon, lat, lon);
        let sector = &mut self.coverage[(bearing / SECTOR_DEG) as usize % SECTORS];

        sector.count += 1;
        sector.max_distance = sector.max_distance.max(distance);
        self.max_distance_km = self.max_distance_km.max(distance);
    }

    pub fn report(&self, now: Instant) -> StatsReport {
        StatsReport {
            messages_per_hour: self.hourly.clone(),
            coverage: self.coverage.clone(),
            message_types: self.message_types.clone(),
            summary: StatsSummary {
                total_aircraft: self.seen.len(),
                total_messages: self.total_messages,
                max_distance: self.max_distance_km,
                uptime: now.saturating_duration_since(self.started).as_secs(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn message(address: u32, df: u8) -> DecodedMessage {
        let mut msg = DecodedMessage::new(TransponderAddress::new(address));
        msg.downlink_format = Some(df);
        msg
    }

    #[test]
    fn test_counts_messages_and_aircraft() {
        let mut stats = ReceiverStats::new(None, Instant::now());
        stats.record_message(&message(0x4840D6, 17), 10);
        stats.record_message(&message(0x4840D6, 5), 10);
        stats.record_message(&message(0x3C6586, 11), 11);

        let report = stats.report(Instant::now());
        assert_eq!(report.summary.total_messages, 3);
        assert_eq!(report.summary.total_aircraft, 2);
        assert_eq!(report.messages_per_hour[10].total, 2);
        assert_eq!(report.messages_per_hour[10].adsb, 1);
        assert_eq!(report.messages_per_hour[10].mode_s, 1);
        assert_eq!(report.messages_per_hour[11].total, 1);
        assert_eq!(report.message_types.get("DF17"), Some(&1));
        assert_eq!(report.message_types.get("DF5"), Some(&1));
    }

    #[test]
    fn test_distinct_address_set_is_bounded() {
        let mut stats = ReceiverStats::new(None, Instant::now());
        stats.address_cap = 3;

        for hour in 0..24 {
            stats.record_message(&message(0x4840D6, 17), hour);
        }
        assert_eq!(stats.report(Instant::now()).summary.total_aircraft, 1);

        for address in 0x100000..0x100010 {
            stats.record_message(&message(address, 17), 0);
        }
        let report = stats.report(Instant::now());
        assert_eq!(report.summary.total_aircraft, 3);
        assert_eq!(report.summary.total_messages, 24 + 16);
        assert_eq!(stats.seen.len(), 3);

        // Already-known addresses still count once at the cap
        stats.record_message(&message(0x4840D6, 17), 0);
        assert_eq!(stats.report(Instant::now()).summary.total_aircraft, 3);
    }

    #[test]
    fn test_synthetic_traffic_is_ignored() {
        let mut stats = ReceiverStats::new(None, Instant::now());
        stats.record_message(&message(0xFFFF01, 17), 0);
        assert_eq!(stats.report(Instant::now()).summary.total_messages, 0);
    }

    #[test]
    fn test_coverage_needs_receiver_location() {
        let mut msg = message(0x4840D6, 17);
        msg.latitude = Some(53.0);
        msg.longitude = Some(4.0);

        let mut without = ReceiverStats::new(None, Instant::now());
        without.record_message(&msg, 0);
        assert_eq!(without.report(Instant::now()).summary.max_distance, 0.0);

        let receiver = Location { lat: 52.0, lon: 4.0 };
        let mut with = ReceiverStats::new(Some(receiver), Instant::now());
        with.record_message(&msg, 0);
        let report = with.report(Instant::now());
        // Due north, roughly 111 km
        assert_eq!(report.coverage[0].count, 1);
        assert!((report.coverage[0].max_distance - 111.2).abs() < 0.5);
        assert!((report.summary.max_distance - 111.2).abs() < 0.5);
    }

    #[test]
    fn test_uptime() {
        let start = Instant::now();
        let stats = ReceiverStats::new(None, start);
        assert_eq!(stats.report(start + Duration::from_secs(90)).summary.uptime, 90);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let stats = ReceiverStats::new(None, Instant::now());
        let json = serde_json::to_value(stats.report(Instant::now())).unwrap();
        assert_eq!(json["messagesPerHour"].as_array().unwrap().len(), 24);
        assert_eq!(json["coverage"].as_array().unwrap().len(), 36);
        assert_eq!(json["coverage"][1]["angle"], 10);
        assert!(json["messagesPerHour"][0].get("modeS").is_some());
        assert!(json["summary"].get("totalAircraft").is_some());
    }
}
