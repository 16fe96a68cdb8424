//! Error types for the decoding, transport and address parsing layers

use thiserror::Error;

/// Failure to turn a Mode S payload into a decoded message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid message length: {0} bytes")]
    InvalidLength(usize),

    #[error("CRC check failed for DF{df} (residual {residual:06X})")]
    Crc { df: u8, residual: u32 },

    #[error("unsupported downlink format DF{0}")]
    UnsupportedFormat(u8),

    #[error("address {0:06X} recovered from parity was never seen in a clean frame")]
    UnknownAddress(u32),
}

/// Failure on the upstream receiver connection
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {addr} timed out after {timeout_ms} ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    #[error("read from receiver failed: {0}")]
    Read(#[source] std::io::Error),
}

/// Text that is not a 24-bit ICAO address in hex
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transponder address {0:?}: expected 1 to 6 hex digits")]
pub struct AddressParseError(pub String);
