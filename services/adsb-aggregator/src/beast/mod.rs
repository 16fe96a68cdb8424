//! Beast binary feed framing
//!
//! The receiver emits frames as `<0x1A> <type> <payload>` where any `0x1A`
//! inside the payload is sent twice. The payload length is fixed by the type.

mod deframer;

pub use deframer::{Deframer, Frame, FrameKind, ESCAPE, MAX_UNFRAMED_BYTES};
