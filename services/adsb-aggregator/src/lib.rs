//! ADS-B Aggregator - live aircraft state from a Beast receiver feed
//!
//! Reads the receiver's escape-coded byte stream, decodes Mode S frames,
//! merges them into a per-aircraft registry and republishes snapshots to
//! WebSocket subscribers. When the receiver is unreachable a synthetic
//! fleet keeps the feed alive.

pub mod adsb;
pub mod aircraft;
pub mod beast;
pub mod broadcast;
pub mod config;
pub mod decoder;
pub mod error;
pub mod feed;
pub mod geo;
pub mod runtime;
pub mod stats;
pub mod synthetic;
pub mod types;
pub mod web;
