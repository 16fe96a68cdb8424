//! CPR (Compact Position Reporting) position decoding

use std::collections::HashMap;
use std::f64::consts::PI;
use std::time::{Duration, Instant};

/// CPR coordinates are 17-bit fractions of a zone
const CPR_SCALE: f64 = 131072.0;

/// Even and odd frames further apart than this cannot be paired
const PAIR_WINDOW: Duration = Duration::from_secs(10);

/// One airborne position report before decoding
#[derive(Debug, Clone, Copy)]
struct CprFrame {
    lat: f64,
    lon: f64,
    received: Instant,
}

/// Latest even and odd reports for one aircraft
#[derive(Debug, Clone, Default)]
struct CprState {
    even: Option<CprFrame>,
    odd: Option<CprFrame>,
}

/// Context for CPR decoding across multiple aircraft
pub struct CprContext {
    states: HashMap<u32, CprState>,
    max_aircraft: usize,
}

impl CprContext {
    pub fn new(max_aircraft: usize) -> Self {
        Self {
            states: HashMap::with_capacity(max_aircraft),
            max_aircraft,
        }
    }

    /// Store a report and try a global decode against its counterpart
    pub fn update(
        &mut self,
        icao: u32,
        lat_cpr: u32,
        lon_cpr: u32,
        odd: bool,
        now: Instant,
    ) -> Option<(f64, f64)> {
        if self.states.len() >= self.max_aircraft && !self.states.contains_key(&icao) {
            self.evict_oldest();
        }

        let state = self.states.entry(icao).or_default();
        let frame = CprFrame {
            lat: lat_cpr as f64 / CPR_SCALE,
            lon: lon_cpr as f64 / CPR_SCALE,
            received: now,
        };
        if odd {
            state.odd = Some(frame);
        } else {
            state.even = Some(frame);
        }

        let even = state.even?;
        let odd_frame = state.odd?;
        if even.received.max(odd_frame.received) - even.received.min(odd_frame.received) > PAIR_WINDOW {
            return None;
        }
        decode_global(even, odd_frame, odd)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .states
            .iter()
            .min_by_key(|(_, s)| {
                s.even
                    .iter()
                    .chain(s.odd.iter())
                    .map(|f| f.received)
                    .max()
            })
            .map(|(&icao, _)| icao);
        if let Some(icao) = oldest {
            self.states.remove(&icao);
        }
    }
}

/// Number of longitude zones at a latitude
fn cpr_nl(lat: f64) -> i32 {
    let lat = lat.abs();
    if lat >= 87.0 {
        return 1;
    }
    if lat == 0.0 {
        return 59;
    }
    let nz = 15.0;
    let a = 1.0 - (PI / (2.0 * nz)).cos();
    let b = (PI / 180.0 * lat).cos().powi(2);
    (2.0 * PI / (1.0 - a / b).acos()).floor() as i32
}

/// Global decode from an even/odd pair; the most recent frame wins
fn decode_global(even: CprFrame, odd: CprFrame, odd_is_latest: bool) -> Option<(f64, f64)> {
    let dlat_even = 360.0 / 60.0;
    let dlat_odd = 360.0 / 59.0;

    let j = (59.0 * even.lat - 60.0 * odd.lat + 0.5).floor();

    let mut lat_even = dlat_even * (j.rem_euclid(60.0) + even.lat);
    let mut lat_odd = dlat_odd * (j.rem_euclid(59.0) + odd.lat);
    if lat_even >= 270.0 {
        lat_even -= 360.0;
    }
    if lat_odd >= 270.0 {
        lat_odd -= 360.0;
    }

    // Both reports must fall in the same longitude zone band
    let nl = cpr_nl(lat_even);
    if nl != cpr_nl(lat_odd) {
        return None;
    }

    let (lat, ni, lon_frac) = if odd_is_latest {
        (lat_odd, (nl - 1).max(1), odd.lon)
    } else {
        (lat_even, nl.max(1), even.lon)
    };

    let m = (even.lon * (nl - 1) as f64 - odd.lon * nl as f64 + 0.5).floor();
    let mut lon = (360.0 / ni as f64) * (m.rem_euclid(ni as f64) + lon_frac);
    if lon >= 180.0 {
        lon -= 360.0;
    }

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some((lat, lon))
}
