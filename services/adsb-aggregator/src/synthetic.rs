//! Synthetic aircraft for receiver outages
//!
//! Flies a small fleet around a center point. Every aircraft uses an address
//! from the reserved `FFFFxx` block and a `SIM` callsign so consumers can
//! tell them apart from real traffic.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{Location, MAX_SYNTHETIC_AIRCRAFT};
use crate::geo::project;
use crate::types::{DecodedMessage, MessageCount, TransponderAddress};

/// Aircraft further than this from the center turn around
const MAX_RADIUS_DEG: f64 = 1.5;

/// Chance per tick that an aircraft picks a new vertical rate
const VERTICAL_RATE_CHANGE_P: f64 = 0.1;

const MIN_ALTITUDE_FT: f64 = 2_000.0;
const MAX_ALTITUDE_FT: f64 = 41_000.0;

#[derive(Debug, Clone)]
struct SyntheticAircraft {
    address: TransponderAddress,
    callsign: String,
    squawk: String,
    lat: f64,
    lon: f64,
    altitude_ft: f64,
    speed_kts: f64,
    heading_deg: f64,
    vertical_rate_fpm: i32,
    messages: u64,
}

pub struct SyntheticFleet {
    center: Location,
    aircraft: Vec<SyntheticAircraft>,
    rng: StdRng,
}

impl SyntheticFleet {
    /// Place `count` aircraft around `center`. `count` is capped to the
    /// reserved address block.
    pub fn new(center: Location, count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let aircraft = (0..count.min(MAX_SYNTHETIC_AIRCRAFT))
            .map(|i| SyntheticAircraft {
                address: TransponderAddress::new(TransponderAddress::SYNTHETIC_BLOCK + i as u32),
                callsign: format!("SIM{:03}", i),
                squawk: format!("{:04o}", 0o1000 + i),
                lat: center.lat + rng.gen_range(-1.0..1.0_f64),
                lon: center.lon + rng.gen_range(-1.0..1.0_f64),
                altitude_ft: rng.gen_range(5_000.0..38_000.0_f64).round(),
                speed_kts: rng.gen_range(180.0..480.0_f64).round(),
                heading_deg: rng.gen_range(0.0..360.0_f64).round(),
                vertical_rate_fpm: 0,
                messages: 0,
            })
            .collect();

        Self {
            center,
            aircraft,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    /// Advance every aircraft by `dt` and return one record per aircraft
    pub fn tick(&mut self, dt: Duration) -> Vec<DecodedMessage> {
        let hours = dt.as_secs_f64() / 3600.0;
        let center = self.center;

        for ac in &mut self.aircraft {
            let (lat, lon) = project(ac.lat, ac.lon, ac.heading_deg, ac.speed_kts * hours);
            ac.lat = lat.clamp(-89.0, 89.0);
            ac.lon = lon;

            if self.rng.gen_bool(VERTICAL_RATE_CHANGE_P) {
                ac.vertical_rate_fpm = self.rng.gen_range(-15..=15) * 100;
            }
            ac.altitude_ft = (ac.altitude_ft + ac.vertical_rate_fpm as f64 * dt.as_secs_f64() / 60.0)
                .clamp(MIN_ALTITUDE_FT, MAX_ALTITUDE_FT);

            if ac.is_outbound_beyond(center) {
                ac.heading_deg = (ac.heading_deg + 180.0).rem_euclid(360.0);
            }

            ac.messages += 1;
        }

        self.aircraft.iter().map(SyntheticAircraft::to_message).collect()
    }
}

impl SyntheticAircraft {
    /// Outside the radius and still moving away from the center
    fn is_outbound_beyond(&self, center: Location) -> bool {
        let dlat = self.lat - center.lat;
        let dlon = self.lon - center.lon;
        if dlat.hypot(dlon) <= MAX_RADIUS_DEG {
            return false;
        }
        let heading = self.heading_deg.to_radians();
        dlat * heading.cos() + dlon * self.lat.to_radians().cos() * heading.sin() > 0.0
    }

    fn to_message(&self) -> DecodedMessage {
        DecodedMessage {
            callsign: Some(self.callsign.clone()),
            latitude: Some(self.lat),
            longitude: Some(self.lon),
            altitude_ft: Some(self.altitude_ft.round() as i32),
            ground_speed_kts: Some(self.speed_kts),
            track_deg: Some(self.heading_deg),
            vertical_rate_fpm: Some(self.vertical_rate_fpm),
            squawk: Some(self.squawk.clone()),
            category: Some("A3".to_string()),
            messages: MessageCount::Total(self.messages),
            ..DecodedMessage::new(self.address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Location = Location { lat: 55.75, lon: 37.61 };

    #[test]
    fn test_fleet_uses_reserved_identifiers() {
        let mut fleet = SyntheticFleet::new(CENTER, 15, 7);
        let messages = fleet.tick(Duration::ZERO);

        assert_eq!(messages.len(), 15);
        for (i, msg) in messages.iter().enumerate() {
            assert!(msg.address.is_synthetic());
            assert!(msg.address.to_string().starts_with("FFFF"));
            assert_eq!(msg.callsign.as_deref(), Some(format!("SIM{:03}", i).as_str()));
            assert!(msg.position().is_some());
        }
    }

    #[test]
    fn test_fleet_size_is_capped() {
        let fleet = SyntheticFleet::new(CENTER, 1000, 1);
        assert_eq!(fleet.len(), MAX_SYNTHETIC_AIRCRAFT);
    }

    #[test]
    fn test_tick_moves_along_heading() {
        let mut fleet = SyntheticFleet::new(CENTER, 3, 42);
        let before = fleet.tick(Duration::ZERO);
        let after = fleet.tick(Duration::from_secs(60));

        for (b, a) in before.iter().zip(&after) {
            let moved = (a.latitude.unwrap() - b.latitude.unwrap())
                .hypot(a.longitude.unwrap() - b.longitude.unwrap());
            assert!(moved > 0.0);
            assert_eq!(a.messages, MessageCount::Total(2));
        }
    }

    #[test]
    fn test_aircraft_stay_near_center() {
        let mut fleet = SyntheticFleet::new(CENTER, 10, 3);
        for _ in 0..2000 {
            fleet.tick(Duration::from_secs(10));
        }
        for msg in fleet.tick(Duration::ZERO) {
            let (lat, lon) = msg.position().unwrap();
            assert!((lat - CENTER.lat).hypot(lon - CENTER.lon) < MAX_RADIUS_DEG + 0.5);
            let alt = msg.altitude_ft.unwrap() as f64;
            assert!((MIN_ALTITUDE_FT..=MAX_ALTITUDE_FT).contains(&alt));
        }
    }

    #[test]
    fn test_same_seed_same_fleet() {
        let a = SyntheticFleet::new(CENTER, 5, 99).tick(Duration::from_secs(1));
        let b = SyntheticFleet::new(CENTER, 5, 99).tick(Duration::from_secs(1));
        assert_eq!(a, b);
    }
}
