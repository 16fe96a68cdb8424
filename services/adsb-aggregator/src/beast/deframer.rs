//! Incremental Beast deframer

use tracing::{debug, trace};

/// Frame start marker, doubled when it occurs inside a payload
pub const ESCAPE: u8 = 0x1A;

/// Bytes kept without any marker before the buffer is thrown away
pub const MAX_UNFRAMED_BYTES: usize = 4096;

/// Length of the MLAT timestamp that opens every payload
const TIMESTAMP_LEN: usize = 6;

/// Frame type selected by the byte after the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// `'1'`: Mode A/C reply, 2 message bytes
    ModeAc,
    /// `'2'`: Mode S short frame, 7 message bytes
    ModeSShort,
    /// `'3'`: Mode S long frame, 14 message bytes
    ModeSLong,
    /// `'4'`: receiver status, no message bytes
    Status,
}

impl FrameKind {
    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Self::ModeAc),
            b'2' => Some(Self::ModeSShort),
            b'3' => Some(Self::ModeSLong),
            b'4' => Some(Self::Status),
            _ => None,
        }
    }

    pub fn type_byte(self) -> u8 {
        match self {
            Self::ModeAc => b'1',
            Self::ModeSShort => b'2',
            Self::ModeSLong => b'3',
            Self::Status => b'4',
        }
    }

    /// Unescaped payload length following the type byte
    pub fn payload_len(self) -> usize {
        match self {
            Self::ModeAc => 9,
            Self::ModeSShort => 14,
            Self::ModeSLong => 21,
            Self::Status => 7,
        }
    }
}

/// One complete, unescaped frame with the marker and type byte stripped.
///
/// The payload length always matches `kind.payload_len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    payload: Vec<u8>,
}

impl Frame {
    /// Wrap an unescaped payload, or `None` if its length does not fit `kind`
    pub fn new(kind: FrameKind, payload: Vec<u8>) -> Option<Self> {
        (payload.len() == kind.payload_len()).then_some(Self { kind, payload })
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Unescaped payload: timestamp, signal level, message
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 48-bit MLAT timestamp (12 MHz ticks on most receivers)
    pub fn timestamp(&self) -> u64 {
        self.payload[..TIMESTAMP_LEN]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }

    /// Signal level byte (status byte for `Status` frames)
    pub fn signal(&self) -> u8 {
        self.payload[TIMESTAMP_LEN]
    }

    /// Message bytes after the timestamp and signal level
    pub fn message(&self) -> &[u8] {
        &self.payload[TIMESTAMP_LEN + 1..]
    }

    /// Whether the message bytes are a Mode S frame the decoder understands
    pub fn is_mode_s(&self) -> bool {
        matches!(self.kind, FrameKind::ModeSShort | FrameKind::ModeSLong)
    }
}

/// Result of trying to read one frame at a marker
enum Attempt {
    /// Frame complete; the next frame may start at the given offset
    Complete(Frame, usize),
    /// Not enough bytes yet, keep everything from the marker on
    Incomplete,
    /// Aborted; resynchronize at the given offset
    Resync(usize),
}

/// Extract every complete frame from `buf`.
///
/// Returns the frames in stream order and the number of leading bytes
/// consumed. Bytes past that offset must be kept and prefixed to the next
/// read; they hold at most one partial frame.
pub fn extract_frames(buf: &[u8]) -> (Vec<Frame>, usize) {
    let mut frames = Vec::new();
    let mut pos = 0;

    loop {
        let Some(offset) = buf[pos..].iter().position(|&b| b == ESCAPE) else {
            if buf.len() - pos > MAX_UNFRAMED_BYTES {
                debug!("Dropping {} bytes without a frame marker", buf.len() - pos);
                pos = buf.len();
            }
            break;
        };
        pos += offset;

        match read_frame(buf, pos) {
            Attempt::Complete(frame, next) => {
                frames.push(frame);
                pos = next;
            }
            Attempt::Incomplete => break,
            Attempt::Resync(next) => {
                trace!("Resynchronizing at offset {}", next);
                pos = next;
            }
        }
    }

    (frames, pos)
}

fn read_frame(buf: &[u8], start: usize) -> Attempt {
    let Some(&type_byte) = buf.get(start + 1) else {
        return Attempt::Incomplete;
    };
    let Some(kind) = FrameKind::from_type_byte(type_byte) else {
        // Marker was noise
        return Attempt::Resync(start + 1);
    };

    let len = kind.payload_len();
    let mut payload = Vec::with_capacity(len);
    let mut i = start + 2;

    while payload.len() < len {
        let Some(&byte) = buf.get(i) else {
            return Attempt::Incomplete;
        };
        if byte == ESCAPE {
            match buf.get(i + 1) {
                None => return Attempt::Incomplete,
                Some(&ESCAPE) => {
                    payload.push(ESCAPE);
                    i += 2;
                }
                // Lone marker inside the payload window starts a new frame
                Some(_) => return Attempt::Resync(i),
            }
        } else {
            payload.push(byte);
            i += 1;
        }
    }

    Attempt::Complete(Frame { kind, payload }, i)
}

/// Stateful deframer fed by successive socket reads
#[derive(Debug, Default)]
pub struct Deframer {
    buffer: Vec<u8>,
    frames_extracted: u64,
}

impl Deframer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);
        let (frames, consumed) = extract_frames(&self.buffer);
        self.buffer.drain(..consumed);
        self.frames_extracted += frames.len() as u64;
        frames
    }

    /// Bytes waiting for the rest of a frame
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    pub fn frames_extracted(&self) -> u64 {
        self.frames_extracted
    }

    /// Forget buffered bytes, e.g. after the connection dropped
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
