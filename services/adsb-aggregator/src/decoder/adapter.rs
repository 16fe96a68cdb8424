//! Adapter between the deframer and the message decoder

use tracing::{debug, trace};

use super::MessageDecoder;
use crate::beast::Frame;
use crate::types::DecodedMessage;

/// Counters for frames passed through the adapter
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub messages_produced: u64,
    pub decode_errors: u64,
    pub frames_skipped: u64,
}

/// Hands Mode S frames to the decoder and absorbs its failures
pub struct DecoderAdapter {
    decoder: Box<dyn MessageDecoder>,
    stats: DecoderStats,
}

impl DecoderAdapter {
    pub fn new(decoder: Box<dyn MessageDecoder>) -> Self {
        Self {
            decoder,
            stats: DecoderStats::default(),
        }
    }

    /// Decode one frame. Never fails: errors are logged and yield no messages.
    pub fn decode_frame(&mut self, frame: &Frame) -> Vec<DecodedMessage> {
        if !frame.is_mode_s() {
            trace!("Skipping {:?} frame", frame.kind());
            self.stats.frames_skipped += 1;
            return Vec::new();
        }

        match self.decoder.decode(frame.message()) {
            Ok(messages) => {
                self.stats.frames_decoded += 1;
                self.stats.messages_produced += messages.len() as u64;
                messages
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                debug!("Dropping frame {}: {}", hex::encode_upper(frame.message()), e);
                Vec::new()
            }
        }
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beast::FrameKind;
    use crate::error::DecodeError;
    use crate::types::TransponderAddress;

    struct FailingDecoder;

    impl MessageDecoder for FailingDecoder {
        fn decode(&mut self, payload: &[u8]) -> Result<Vec<DecodedMessage>, DecodeError> {
            Err(DecodeError::InvalidLength(payload.len()))
        }
    }

    /// Emits one message per payload byte, addressed by the byte value
    struct FanOutDecoder;

    impl MessageDecoder for FanOutDecoder {
        fn decode(&mut self, payload: &[u8]) -> Result<Vec<DecodedMessage>, DecodeError> {
            Ok(payload
                .iter()
                .map(|&b| DecodedMessage::new(TransponderAddress::new(b as u32)))
                .collect())
        }
    }

    fn frame(kind: FrameKind, message: &[u8]) -> Frame {
        let mut payload = vec![0u8; 7];
        payload.extend_from_slice(message);
        Frame::new(kind, payload).unwrap()
    }

    #[test]
    fn test_decode_failure_yields_nothing() {
        let mut adapter = DecoderAdapter::new(Box::new(FailingDecoder));
        let messages = adapter.decode_frame(&frame(FrameKind::ModeSShort, &[0; 7]));
        assert!(messages.is_empty());
        assert_eq!(adapter.stats().decode_errors, 1);

        // Still usable afterwards
        adapter.decode_frame(&frame(FrameKind::ModeSShort, &[0; 7]));
        assert_eq!(adapter.stats().decode_errors, 2);
    }

    #[test]
    fn test_many_messages_pass_through() {
        let mut adapter = DecoderAdapter::new(Box::new(FanOutDecoder));
        let messages = adapter.decode_frame(&frame(FrameKind::ModeSShort, &[1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[2].address.value(), 3);
        assert_eq!(adapter.stats().messages_produced, 7);
    }

    #[test]
    fn test_non_mode_s_frames_are_skipped() {
        let mut adapter = DecoderAdapter::new(Box::new(FanOutDecoder));
        assert!(adapter.decode_frame(&frame(FrameKind::ModeAc, &[1, 2])).is_empty());
        assert!(adapter.decode_frame(&frame(FrameKind::Status, &[])).is_empty());
        assert_eq!(adapter.stats().frames_skipped, 2);
    }

    #[test]
    fn test_mode_s_decoder_end_to_end() {
        let mut adapter = DecoderAdapter::new(Box::new(crate::adsb::ModeSDecoder::new(
            64,
            std::time::Duration::from_secs(60),
        )));
        let msg = hex::decode("8D4840D6202CC371C32CE0576098").unwrap();
        let messages = adapter.decode_frame(&frame(FrameKind::ModeSLong, &msg));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].callsign.as_deref(), Some("KLM1023"));
    }
}
