//! Decoder boundary: Beast frames in, decoded messages out

mod adapter;

pub use adapter::{DecoderAdapter, DecoderStats};

use crate::error::DecodeError;
use crate::types::DecodedMessage;

/// External message decoder collaborator.
///
/// Takes the raw Mode S message bytes of one frame and returns zero, one or
/// many decoded records.
pub trait MessageDecoder: Send {
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<DecodedMessage>, DecodeError>;
}
