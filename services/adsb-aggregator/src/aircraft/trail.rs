//! Bounded per-aircraft position history

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::types::TransponderAddress;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug)]
pub struct TrailManager {
    trails: HashMap<TransponderAddress, VecDeque<HistoryPoint>>,
    max_points: usize,
    min_displacement_deg: f64,
}

impl TrailManager {
    pub fn new(max_points: usize, min_displacement_deg: f64) -> Self {
        Self {
            trails: HashMap::new(),
            max_points: max_points.max(1),
            min_displacement_deg,
        }
    }

    /// Append a point unless it sits within the displacement threshold of the
    /// last stored one. Returns whether the point was stored.
    pub fn record_position(&mut self, address: TransponderAddress, lat: f64, lon: f64) -> bool {
        let trail = self.trails.entry(address).or_default();

        if let Some(last) = trail.back() {
            // Planar distance in degrees; cheap and good enough for suppression
            let displacement = (lat - last.lat).hypot(lon - last.lon);
            if displacement <= self.min_displacement_deg {
                return false;
            }
        }

        trail.push_back(HistoryPoint { lat, lon });
        while trail.len() > self.max_points {
            trail.pop_front();
        }
        true
    }

    /// Ordered trail, oldest first; empty when none
    pub fn trail_of(&self, address: TransponderAddress) -> Vec<HistoryPoint> {
        self.trails
            .get(&address)
            .map(|trail| trail.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, address: TransponderAddress) {
        self.trails.remove(&address);
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }
}
