//! Core data types shared by the decoder boundary and the registry

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::AddressParseError;

/// ICAO 24-bit transponder address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransponderAddress(u32);

impl TransponderAddress {
    /// Reserved block used for synthetic fallback aircraft (hex prefix `FFFF`)
    pub const SYNTHETIC_BLOCK: u32 = 0xFF_FF00;

    pub const fn new(raw: u32) -> Self {
        Self(raw & 0xFF_FFFF)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn is_synthetic(self) -> bool {
        self.0 & 0xFF_FF00 == Self::SYNTHETIC_BLOCK
    }
}

impl fmt::Display for TransponderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

impl FromStr for TransponderAddress {
    type Err = AddressParseError;

    /// Strict: 1 to 6 hex digits, no sign, no wider values masked down
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        if digits.is_empty() || digits.len() > 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressParseError(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| AddressParseError(s.to_string()))
    }
}

impl Serialize for TransponderAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a message updates the per-aircraft message counter.
///
/// Streaming sources count frames one by one; sources that already keep a
/// running total hand it over verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCount {
    /// Add to the stored counter
    Increment(u64),
    /// Replace the stored counter
    Total(u64),
}

impl Default for MessageCount {
    fn default() -> Self {
        Self::Increment(1)
    }
}

/// One decoded transmission. Only the address is guaranteed.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub address: TransponderAddress,
    pub callsign: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_ft: Option<i32>,
    pub ground_speed_kts: Option<f64>,
    pub track_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
    /// Four octal digits, e.g. "7000"
    pub squawk: Option<String>,
    /// Emitter category, e.g. "A3"
    pub category: Option<String>,
    pub messages: MessageCount,
    pub downlink_format: Option<u8>,
}

impl DecodedMessage {
    pub fn new(address: TransponderAddress) -> Self {
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
            messages: MessageCount::default(),
            downlink_format: None,
        }
    }

    /// Position, if both coordinates are present and in range
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.abs() <= 90.0 && lon.abs() <= 180.0 => Some((lat, lon)),
            _ => None,
        }
    }

    /// True when the message carries any field kept in the extra-field side store
    pub fn has_extra_fields(&self) -> bool {
        self.vertical_rate_fpm.is_some() || self.squawk.is_some() || self.category.is_some()
    }
}
