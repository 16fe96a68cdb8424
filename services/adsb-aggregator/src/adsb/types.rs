//! Mode S field types

/// Downlink format identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DownlinkFormat {
    ShortAirSurveillance = 0,
    AltitudeReply = 4,
    IdentityReply = 5,
    AllCallReply = 11,
    LongAirSurveillance = 16,
    ExtendedSquitter = 17,
    ExtendedSquitterNonTransponder = 18,
    CommBAltitude = 20,
    CommBIdentity = 21,
    Unknown = 255,
}

impl From<u8> for DownlinkFormat {
    fn from(df: u8) -> Self {
        match df {
            0 => Self::ShortAirSurveillance,
            4 => Self::AltitudeReply,
            5 => Self::IdentityReply,
            11 => Self::AllCallReply,
            16 => Self::LongAirSurveillance,
            17 => Self::ExtendedSquitter,
            18 => Self::ExtendedSquitterNonTransponder,
            20 => Self::CommBAltitude,
            21 => Self::CommBIdentity,
            _ => Self::Unknown,
        }
    }
}

impl DownlinkFormat {
    /// Expected frame length in bytes (56 or 112 bits)
    pub fn frame_len(df: u8) -> usize {
        if df >= 16 {
            14
        } else {
            7
        }
    }

    /// Address is sent in clear and protected by a zero-residual CRC
    pub fn has_clear_address(self) -> bool {
        matches!(
            self,
            Self::AllCallReply | Self::ExtendedSquitter | Self::ExtendedSquitterNonTransponder
        )
    }
}

/// Emitter category from an identification message, e.g. `A3`.
///
/// Type codes 4, 3, 2, 1 select category sets A, B, C, D; the 3-bit
/// category field picks the entry. Entry 0 means "no information".
pub fn emitter_category(type_code: u8, category: u8) -> Option<String> {
    let set = match type_code {
        4 => 'A',
        3 => 'B',
        2 => 'C',
        1 => 'D',
        _ => return None,
    };
    Some(format!("{}{}", set, category & 0x07))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        assert_eq!(DownlinkFormat::frame_len(11), 7);
        assert_eq!(DownlinkFormat::frame_len(17), 14);
    }

    #[test]
    fn test_emitter_category() {
        assert_eq!(emitter_category(4, 3).as_deref(), Some("A3"));
        assert_eq!(emitter_category(1, 0).as_deref(), Some("D0"));
        assert_eq!(emitter_category(9, 3), None);
    }
}
