//! Mode S / ADS-B message decoding
//!
//! Default implementation of the message decoder collaborator. The rest of
//! the service only sees it through [`crate::decoder::MessageDecoder`].

mod cpr;
mod crc;
pub mod parser;
mod types;

pub use cpr::CprContext;
pub use crc::parity_residual;
pub use parser::ModeSDecoder;
pub use types::{emitter_category, DownlinkFormat};
