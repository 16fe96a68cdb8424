//! Aircraft state tracking and aggregation
//!
//! Aggregates partial updates from many messages into one record per
//! transponder address. A field absent from a message keeps its previous value.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::types::{DecodedMessage, MessageCount, TransponderAddress};

/// Position update threshold for logging
const POSITION_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Aggregated aircraft state
#[derive(Debug, Clone)]
pub struct AircraftState {
    /// ICAO 24-bit address
    pub address: TransponderAddress,
    /// Flight callsign
    pub callsign: Option<String>,
    /// Last known latitude
    pub latitude: Option<f64>,
    /// Last known longitude
    pub longitude: Option<f64>,
    /// Barometric altitude in feet
    pub altitude_ft: Option<i32>,
    /// Ground speed in knots
    pub ground_speed_kts: Option<f64>,
    /// Track over ground in degrees
    pub track_deg: Option<f64>,
    /// Vertical rate in feet per minute
    pub vertical_rate_fpm: Option<i32>,
    pub squawk: Option<String>,
    pub category: Option<String>,
    /// Message count
    pub messages: u64,
    /// Position message count
    pub position_messages: u64,
    /// Last update time
    pub last_seen: Instant,
    /// Last position log time (for rate limiting logs)
    last_position_log: Option<Instant>,
}

impl AircraftState {
    pub fn new(address: TransponderAddress, now: Instant) -> Self {
        Self {
            address,
            callsign: None,
            latitude: None,
            longitude: None,
            altitude_ft: None,
            ground_speed_kts: None,
            track_deg: None,
            vertical_rate_fpm: None,
            squawk: None,
            category: None,
            messages: 0,
            position_messages: 0,
            last_seen: now,
            last_position_log: None,
        }
    }

    /// Merge one message into this record
    pub fn update(&mut self, msg: &DecodedMessage, now: Instant) {
        self.last_seen = now;

        match msg.messages {
            MessageCount::Increment(n) => self.messages = self.messages.saturating_add(n),
            MessageCount::Total(n) => self.messages = n,
        }

        if let Some(cs) = msg.callsign.as_deref().map(str::trim) {
            if !cs.is_empty() && cs != "#######" {
                self.callsign = Some(cs.to_string());
            }
        }

        if let Some((lat, lon)) = msg.position() {
            self.latitude = Some(lat);
            self.longitude = Some(lon);
            self.position_messages += 1;
        }

        if msg.altitude_ft.is_some() {
            self.altitude_ft = msg.altitude_ft;
        }
        if msg.ground_speed_kts.is_some() {
            self.ground_speed_kts = msg.ground_speed_kts;
        }
        if msg.track_deg.is_some() {
            self.track_deg = msg.track_deg;
        }
        if msg.vertical_rate_fpm.is_some() {
            self.vertical_rate_fpm = msg.vertical_rate_fpm;
        }
        if msg.squawk.is_some() {
            self.squawk.clone_from(&msg.squawk);
        }
        if msg.category.is_some() {
            self.category.clone_from(&msg.category);
        }
    }

    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Check if aircraft state is stale
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }

    fn should_log_position(&self, now: Instant) -> bool {
        self.last_position_log
            .map_or(true, |t| now.saturating_duration_since(t) >= POSITION_LOG_INTERVAL)
    }
}

/// Registry of all tracked aircraft, keyed by address
#[derive(Debug, Default)]
pub struct AircraftRegistry {
    aircraft: HashMap<TransponderAddress, AircraftState>,
}

impl AircraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a message into the record for its address, creating it on first sight
    pub fn apply(&mut self, msg: &DecodedMessage, now: Instant) -> &AircraftState {
        let address = msg.address;
        let state = self.aircraft.entry(address).or_insert_with(|| {
            debug!("New aircraft tracked: {}", address);
            AircraftState::new(address, now)
        });

        let had_position = state.has_position();
        state.update(msg, now);

        // Log if we got a new position or it's time for an update
        if msg.position().is_some() && (!had_position || state.should_log_position(now)) {
            state.last_position_log = Some(now);
            info!(
                "Aircraft {} {} at ({:.4}, {:.4}) alt={} spd={:.0} hdg={:.0} | msgs={}",
                address,
                state.callsign.as_deref().unwrap_or("-"),
                state.latitude.unwrap_or(0.0),
                state.longitude.unwrap_or(0.0),
                state.altitude_ft.unwrap_or(0),
                state.ground_speed_kts.unwrap_or(0.0),
                state.track_deg.unwrap_or(0.0),
                state.messages
            );
        }

        state
    }

    /// Get aircraft state by address
    pub fn get(&self, address: TransponderAddress) -> Option<&AircraftState> {
        self.aircraft.get(&address)
    }

    /// Every entry, stale ones included
    pub fn all(&self) -> impl Iterator<Item = &AircraftState> {
        self.aircraft.values()
    }

    /// True when the address has not been refreshed within `timeout`.
    /// Addresses never seen are stale.
    pub fn is_stale(&self, address: TransponderAddress, now: Instant, timeout: Duration) -> bool {
        self.aircraft
            .get(&address)
            .map_or(true, |state| state.is_stale(now, timeout))
    }

    /// Remove stale aircraft, returning their addresses
    pub fn prune_stale(&mut self, now: Instant, timeout: Duration) -> Vec<TransponderAddress> {
        let stale: Vec<_> = self
            .aircraft
            .values()
            .filter(|state| state.is_stale(now, timeout))
            .map(|state| state.address)
            .collect();
        for address in &stale {
            self.aircraft.remove(address);
        }
        stale
    }

    /// Drop every entry matching `pred`, returning their addresses
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<TransponderAddress>
    where
        F: FnMut(&AircraftState) -> bool,
    {
        let doomed: Vec<_> = self
            .aircraft
            .values()
            .filter(|state| pred(state))
            .map(|state| state.address)
            .collect();
        for address in &doomed {
            self.aircraft.remove(address);
        }
        doomed
    }

    /// Get count of tracked aircraft
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    /// Get summary statistics over the live entries
    pub fn stats_summary(&self, now: Instant, timeout: Duration) -> TrackerStats {
        let live: Vec<_> = self.aircraft.values().filter(|a| !a.is_stale(now, timeout)).collect();

        TrackerStats {
            total_aircraft: live.len(),
            with_position: live.iter().filter(|a| a.has_position()).count(),
            with_callsign: live.iter().filter(|a| a.callsign.is_some()).count(),
            synthetic: live.iter().filter(|a| a.address.is_synthetic()).count(),
            total_messages: live.iter().map(|a| a.messages).sum(),
        }
    }
}

/// Tracker statistics
#[derive(Debug, Clone, Default)]
pub struct TrackerStats {
    pub total_aircraft: usize,
    pub with_position: usize,
    pub with_callsign: usize,
    pub synthetic: usize,
    pub total_messages: u64,
}

impl std::fmt::Display for TrackerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Aircraft: {} total, {} with position, {} with callsign, {} synthetic, {} msgs",
            self.total_aircraft,
            self.with_position,
            self.with_callsign,
            self.synthetic,
            self.total_messages
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn msg(address: u32) -> DecodedMessage {
        DecodedMessage::new(TransponderAddress::new(address))
    }

    #[test]
    fn test_absent_fields_keep_previous_values() {
        let now = Instant::now();
        let mut registry = AircraftRegistry::new();

        let mut first = msg(0x4840D6);
        first.callsign = Some("KLM1023".into());
        first.altitude_ft = Some(38000);
        registry.apply(&first, now);

        let mut second = msg(0x4840D6);
        second.ground_speed_kts = Some(420.0);
        let state = registry.apply(&second, now + Duration::from_secs(1));

        assert_eq!(state.callsign.as_deref(), Some("KLM1023"));
        assert_eq!(state.altitude_ft, Some(38000));
        assert_eq!(state.ground_speed_kts, Some(420.0));
        assert_eq!(state.messages, 2);
    }

    #[test]
    fn test_placeholder_callsigns_are_ignored() {
        let now = Instant::now();
        let mut registry = AircraftRegistry::new();

        let mut first = msg(1);
        first.callsign = Some("EZY12  ".into());
        registry.apply(&first, now);

        for junk in ["   ", "#######", ""] {
            let mut m = msg(1);
            m.callsign = Some(junk.into());
            registry.apply(&m, now);
        }

        assert_eq!(
            registry.get(TransponderAddress::new(1)).unwrap().callsign.as_deref(),
            Some("EZY12")
        );
    }

    #[test]
    fn test_message_count_increment_and_total() {
        let now = Instant::now();
        let mut registry = AircraftRegistry::new();

        let mut m = msg(7);
        m.messages = MessageCount::Increment(3);
        registry.apply(&m, now);
        registry.apply(&msg(7), now);
        assert_eq!(registry.get(TransponderAddress::new(7)).unwrap().messages, 4);

        m.messages = MessageCount::Total(120);
        registry.apply(&m, now);
        assert_eq!(registry.get(TransponderAddress::new(7)).unwrap().messages, 120);
    }

    #[test]
    fn test_out_of_range_position_is_ignored() {
        let now = Instant::now();
        let mut registry = AircraftRegistry::new();

        let mut good = msg(9);
        good.latitude = Some(52.0);
        good.longitude = Some(4.0);
        registry.apply(&good, now);

        let mut bad = msg(9);
        bad.latitude = Some(120.0);
        bad.longitude = Some(4.0);
        let state = registry.apply(&bad, now);
        assert_eq!(state.latitude, Some(52.0));
        assert_eq!(state.position_messages, 1);
    }

    #[test]
    fn test_is_stale() {
        let now = Instant::now();
        let mut registry = AircraftRegistry::new();
        registry.apply(&msg(1), now);
        let addr = TransponderAddress::new(1);

        assert!(!registry.is_stale(addr, now + TIMEOUT, TIMEOUT));
        assert!(registry.is_stale(addr, now + TIMEOUT + Duration::from_millis(1), TIMEOUT));
        assert!(registry.is_stale(TransponderAddress::new(2), now, TIMEOUT));
    }

    #[test]
    fn test_prune_and_remove_where() {
        let now = Instant::now();
        let mut registry = AircraftRegistry::new();
        registry.apply(&msg(1), now);
        registry.apply(&msg(0xFFFF00), now + Duration::from_secs(61));
        registry.apply(&msg(2), now + Duration::from_secs(61));

        let pruned = registry.prune_stale(now + Duration::from_secs(62), TIMEOUT);
        assert_eq!(pruned, vec![TransponderAddress::new(1)]);

        let removed = registry.remove_where(|a| a.address.is_synthetic());
        assert_eq!(removed, vec![TransponderAddress::new(0xFFFF00)]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stats_summary() {
        let now = Instant::now();
        let mut registry = AircraftRegistry::new();
        let mut m = msg(1);
        m.callsign = Some("SAS123".into());
        m.latitude = Some(55.0);
        m.longitude = Some(12.0);
        registry.apply(&m, now);
        registry.apply(&msg(0xFFFF01), now);

        let stats = registry.stats_summary(now, TIMEOUT);
        assert_eq!(stats.total_aircraft, 2);
        assert_eq!(stats.with_position, 1);
        assert_eq!(stats.with_callsign, 1);
        assert_eq!(stats.synthetic, 1);
        assert_eq!(stats.total_messages, 2);
    }
}
