//! Configuration loaded from environment variables

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Largest synthetic fleet the reserved address block can hold
pub const MAX_SYNTHETIC_AIRCRAFT: usize = 256;

/// A `lat:lon` coordinate pair as used by `SYNTHETIC_CENTER` and `RECEIVER_LOCATION`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(':')
            .ok_or_else(|| format!("expected lat:lon, got {:?}", s))?;
        let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {}", e))?;
        let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {}", e))?;
        if lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(format!("coordinate out of range: {}:{}", lat, lon));
        }
        Ok(Self { lat, lon })
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Receiver host serving the Beast stream
    pub upstream_host: String,

    /// Receiver Beast output port
    pub upstream_port: u16,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Aircraft not heard from within this window leave the snapshot
    pub stale_timeout: Duration,

    /// Maximum trail points kept per aircraft
    pub trail_max_points: usize,

    /// Minimum displacement in degrees before a new trail point is stored
    pub trail_min_displacement_deg: f64,

    /// Snapshot broadcast interval
    pub broadcast_interval: Duration,

    /// Side store and stale entry sweep interval
    pub sweep_interval: Duration,

    /// Fixed delay before reconnecting to the receiver
    pub reconnect_delay: Duration,

    /// Whether receiver errors arm the synthetic fleet
    pub synthetic_fallback: bool,

    /// Center of the synthetic fleet
    pub synthetic_center: Location,

    /// Synthetic fleet size
    pub synthetic_aircraft: usize,

    /// Synthetic motion tick
    pub synthetic_tick: Duration,

    /// Receiver antenna location, enables coverage statistics
    pub receiver_location: Option<Location>,

    /// HTTP/WebSocket listen port
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_host: "127.0.0.1".to_string(),
            upstream_port: 30005,
            connect_timeout: Duration::from_millis(5000),
            stale_timeout: Duration::from_millis(60_000),
            trail_max_points: 50,
            trail_min_displacement_deg: 0.001,
            broadcast_interval: Duration::from_millis(1000),
            sweep_interval: Duration::from_millis(60_000),
            reconnect_delay: Duration::from_millis(5000),
            synthetic_fallback: true,
            synthetic_center: Location { lat: 55.75, lon: 37.61 },
            synthetic_aircraft: 15,
            synthetic_tick: Duration::from_millis(1000),
            receiver_location: None,
            http_port: 8082,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup, falling back to
    /// defaults for missing or unparsable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Every duration drives a timer or an interval, so zero is rejected
        let millis = |key: &str, default: Duration| {
            match parse_or(key, value(key), default.as_millis() as u64) {
                0 => {
                    warn!("{}=0 is not a usable duration, using default {:?}", key, default);
                    default
                }
                ms => Duration::from_millis(ms),
            }
        };

        let synthetic_aircraft: usize =
            parse_or("SYNTHETIC_AIRCRAFT", value("SYNTHETIC_AIRCRAFT"), defaults.synthetic_aircraft);
        if synthetic_aircraft > MAX_SYNTHETIC_AIRCRAFT {
            warn!(
                "SYNTHETIC_AIRCRAFT={} exceeds the reserved block, clamping to {}",
                synthetic_aircraft, MAX_SYNTHETIC_AIRCRAFT
            );
        }

        Self {
            upstream_host: value("UPSTREAM_HOST").unwrap_or(defaults.upstream_host),
            upstream_port: parse_or("UPSTREAM_PORT", value("UPSTREAM_PORT"), defaults.upstream_port),
            connect_timeout: millis("CONNECT_TIMEOUT_MS", defaults.connect_timeout),
            stale_timeout: millis("STALE_TIMEOUT_MS", defaults.stale_timeout),
            trail_max_points: parse_or(
                "TRAIL_MAX_POINTS",
                value("TRAIL_MAX_POINTS"),
                defaults.trail_max_points,
            )
            .max(1),
            trail_min_displacement_deg: parse_or(
                "TRAIL_MIN_DISPLACEMENT_DEG",
                value("TRAIL_MIN_DISPLACEMENT_DEG"),
                defaults.trail_min_displacement_deg,
            ),
            broadcast_interval: millis("BROADCAST_INTERVAL_MS", defaults.broadcast_interval),
            sweep_interval: millis("SWEEP_INTERVAL_MS", defaults.sweep_interval),
            reconnect_delay: millis("RECONNECT_DELAY_MS", defaults.reconnect_delay),
            synthetic_fallback: parse_or(
                "SYNTHETIC_FALLBACK",
                value("SYNTHETIC_FALLBACK"),
                defaults.synthetic_fallback,
            ),
            synthetic_center: parse_or(
                "SYNTHETIC_CENTER",
                value("SYNTHETIC_CENTER"),
                defaults.synthetic_center,
            ),
            synthetic_aircraft: synthetic_aircraft.min(MAX_SYNTHETIC_AIRCRAFT),
            synthetic_tick: millis("SYNTHETIC_TICK_MS", defaults.synthetic_tick),
            receiver_location: value("RECEIVER_LOCATION").and_then(|raw| match raw.parse() {
                Ok(loc) => Some(loc),
                Err(e) => {
                    warn!("Ignoring RECEIVER_LOCATION={:?}: {}", raw, e);
                    None
                }
            }),
            http_port: parse_or("HTTP_PORT", value("HTTP_PORT"), defaults.http_port),
        }
    }

    /// `host:port` of the upstream receiver
    pub fn upstream_addr(&self) -> String {
        format!("{}:{}", self.upstream_host, self.upstream_port)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(e) => {
                warn!("Invalid value for {}={:?} ({}), using default", key, raw, e);
                default
            }
        },
        None => default,
    }
}
