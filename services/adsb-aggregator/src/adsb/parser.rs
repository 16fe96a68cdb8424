//! Mode S / ADS-B message parser

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::cpr::CprContext;
use super::crc::{get_df, get_icao, parity_residual};
use super::types::{emitter_category, DownlinkFormat};
use crate::decoder::MessageDecoder;
use crate::error::DecodeError;
use crate::types::{DecodedMessage, TransponderAddress};

/// Callsign character lookup table
const CALLSIGN_CHARS: &[u8; 64] = b"#ABCDEFGHIJKLMNOPQRSTUVWXYZ##### ###############0123456789######";

/// Stateful Mode S decoder.
///
/// Keeps CPR pairing state and the set of addresses seen in CRC-clean
/// frames, which is needed to trust addresses recovered from parity.
pub struct ModeSDecoder {
    cpr: CprContext,
    known: HashMap<u32, Instant>,
    max_aircraft: usize,
    address_ttl: Duration,
}

impl ModeSDecoder {
    pub fn new(max_aircraft: usize, address_ttl: Duration) -> Self {
        Self {
            cpr: CprContext::new(max_aircraft),
            known: HashMap::with_capacity(max_aircraft),
            max_aircraft,
            address_ttl,
        }
    }

    /// Parse one 7 or 14 byte Mode S message
    pub fn parse_message(&mut self, msg: &[u8], now: Instant) -> Result<DecodedMessage, DecodeError> {
        let len = msg.len();
        if len != 7 && len != 14 {
            return Err(DecodeError::InvalidLength(len));
        }

        let df_raw = get_df(msg);
        if DownlinkFormat::frame_len(df_raw) != len {
            return Err(DecodeError::InvalidLength(len));
        }
        let df = DownlinkFormat::from(df_raw);
        let icao = self.resolve_address(msg, df_raw, df, now)?;

        let mut aircraft = DecodedMessage::new(TransponderAddress::new(icao));
        aircraft.downlink_format = Some(df_raw);

        match df {
            DownlinkFormat::ShortAirSurveillance
            | DownlinkFormat::AltitudeReply
            | DownlinkFormat::LongAirSurveillance
            | DownlinkFormat::CommBAltitude => {
                let ac13 = ((msg[2] as u16 & 0x1F) << 8) | msg[3] as u16;
                aircraft.altitude_ft = decode_ac13_altitude(ac13);
            }

            DownlinkFormat::IdentityReply | DownlinkFormat::CommBIdentity => {
                aircraft.squawk = Some(decode_squawk(msg));
            }

            DownlinkFormat::ExtendedSquitter | DownlinkFormat::ExtendedSquitterNonTransponder => {
                let tc = (msg[4] >> 3) & 0x1F;
                match tc {
                    1..=4 => {
                        aircraft.callsign = Some(decode_callsign(msg));
                        aircraft.category = emitter_category(tc, msg[4] & 0x07);
                    }
                    9..=18 | 20..=22 => {
                        self.decode_airborne_position(msg, &mut aircraft, now);
                    }
                    19 => decode_airborne_velocity(msg, &mut aircraft),
                    _ => {}
                }
            }

            // Address only
            DownlinkFormat::AllCallReply | DownlinkFormat::Unknown => {}
        }

        Ok(aircraft)
    }

    fn resolve_address(
        &mut self,
        msg: &[u8],
        df_raw: u8,
        df: DownlinkFormat,
        now: Instant,
    ) -> Result<u32, DecodeError> {
        let residual = parity_residual(msg);

        match df {
            DownlinkFormat::Unknown => Err(DecodeError::UnsupportedFormat(df_raw)),
            // DF11 may carry an interrogator code in the low 7 bits
            DownlinkFormat::AllCallReply if residual & !0x7F == 0 => Ok(self.remember(get_icao(msg), now)),
            DownlinkFormat::ExtendedSquitter | DownlinkFormat::ExtendedSquitterNonTransponder
                if residual == 0 =>
            {
                Ok(self.remember(get_icao(msg), now))
            }
            _ if df.has_clear_address() => Err(DecodeError::Crc { df: df_raw, residual }),
            _ => match self.known.get(&residual) {
                Some(&seen) if now.saturating_duration_since(seen) <= self.address_ttl => Ok(residual),
                _ => Err(DecodeError::UnknownAddress(residual)),
            },
        }
    }

    fn remember(&mut self, icao: u32, now: Instant) -> u32 {
        if self.known.len() >= self.max_aircraft && !self.known.contains_key(&icao) {
            let ttl = self.address_ttl;
            self.known.retain(|_, seen| now.saturating_duration_since(*seen) <= ttl);
        }
        self.known.insert(icao, now);
        icao
    }

    /// Decode airborne position (type codes 9-18, 20-22)
    fn decode_airborne_position(&mut self, msg: &[u8], aircraft: &mut DecodedMessage, now: Instant) {
        let tc = (msg[4] >> 3) & 0x1F;
        let ac12 = ((msg[5] as u16) << 4) | ((msg[6] >> 4) as u16 & 0x0F);
        aircraft.altitude_ft = if tc >= 20 {
            // GNSS height in meters
            (ac12 > 0).then(|| (ac12 as f64 * 3.28084).round() as i32)
        } else {
            decode_ac12_altitude(ac12)
        };

        let odd = ((msg[6] >> 2) & 1) == 1;
        let lat_cpr = ((msg[6] as u32 & 0x03) << 15) | ((msg[7] as u32) << 7) | ((msg[8] as u32 >> 1) & 0x7F);
        let lon_cpr = ((msg[8] as u32 & 0x01) << 16) | ((msg[9] as u32) << 8) | (msg[10] as u32);

        if let Some((lat, lon)) = self
            .cpr
            .update(aircraft.address.value(), lat_cpr, lon_cpr, odd, now)
        {
            aircraft.latitude = Some(lat);
            aircraft.longitude = Some(lon);
        }
    }
}

impl MessageDecoder for ModeSDecoder {
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<DecodedMessage>, DecodeError> {
        self.parse_message(payload, Instant::now()).map(|msg| vec![msg])
    }
}

/// Decode altitude from 13-bit AC code (25 ft increments only)
fn decode_ac13_altitude(ac13: u16) -> Option<i32> {
    let m_bit = (ac13 >> 6) & 1;
    let q_bit = (ac13 >> 4) & 1;
    if ac13 == 0 || m_bit == 1 || q_bit == 0 {
        return None;
    }
    let n = ((ac13 & 0x1F80) >> 2) | ((ac13 & 0x0020) >> 1) | (ac13 & 0x000F);
    Some(n as i32 * 25 - 1000)
}

/// Decode altitude from 12-bit AC code (25 ft increments only)
fn decode_ac12_altitude(ac12: u16) -> Option<i32> {
    let q_bit = (ac12 >> 4) & 1;
    if ac12 == 0 || q_bit == 0 {
        return None;
    }
    let n = ((ac12 & 0x0FE0) >> 1) | (ac12 & 0x000F);
    Some(n as i32 * 25 - 1000)
}

/// Decode callsign from type codes 1-4
fn decode_callsign(msg: &[u8]) -> String {
    let bits = msg[5..11]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64);

    let callsign: String = (0..8)
        .map(|i| {
            let idx = ((bits >> (42 - i * 6)) & 0x3F) as usize;
            CALLSIGN_CHARS[idx] as char
        })
        .collect();

    callsign.trim_end_matches(|c: char| c == ' ' || c == '#').to_string()
}

/// Decode airborne velocity (type code 19)
fn decode_airborne_velocity(msg: &[u8], aircraft: &mut DecodedMessage) {
    let subtype = msg[4] & 0x07;
    let multiplier = if subtype == 2 || subtype == 4 { 4.0 } else { 1.0 };

    match subtype {
        1 | 2 => {
            let west = ((msg[5] >> 2) & 1) == 1;
            let vew = ((msg[5] as i32 & 0x03) << 8) | msg[6] as i32;
            let south = ((msg[7] >> 7) & 1) == 1;
            let vns = ((msg[7] as i32 & 0x7F) << 3) | ((msg[8] >> 5) as i32 & 0x07);

            if vew > 0 && vns > 0 {
                let mut v_ew = (vew - 1) as f64 * multiplier;
                let mut v_ns = (vns - 1) as f64 * multiplier;
                if west {
                    v_ew = -v_ew;
                }
                if south {
                    v_ns = -v_ns;
                }

                aircraft.ground_speed_kts = Some(v_ew.hypot(v_ns));
                aircraft.track_deg = Some(v_ew.atan2(v_ns).to_degrees().rem_euclid(360.0));
            }
        }
        3 | 4 => {
            // Airspeed with magnetic heading
            if ((msg[5] >> 2) & 1) == 1 {
                let hdg = ((msg[5] as u16 & 0x03) << 8) | msg[6] as u16;
                aircraft.track_deg = Some(hdg as f64 * 360.0 / 1024.0);
            }

            let airspeed = ((msg[7] as u16 & 0x7F) << 3) | ((msg[8] >> 5) as u16 & 0x07);
            if airspeed > 0 {
                aircraft.ground_speed_kts = Some((airspeed - 1) as f64 * multiplier);
            }
        }
        _ => return,
    }

    let down = ((msg[8] >> 3) & 1) == 1;
    let vr = ((msg[8] as i32 & 0x07) << 6) | ((msg[9] >> 2) as i32 & 0x3F);
    if vr > 0 {
        let rate = (vr - 1) * 64;
        aircraft.vertical_rate_fpm = Some(if down { -rate } else { rate });
    }
}

/// Decode the 13-bit identity field into four octal digits
fn decode_squawk(msg: &[u8]) -> String {
    let id13 = ((msg[2] as u16 & 0x1F) << 8) | msg[3] as u16;
    let bit = |mask: u16, value: u16| if id13 & mask != 0 { value } else { 0 };

    let a = bit(0x1000, 4) + bit(0x0200, 2) + bit(0x0040, 1);
    let b = bit(0x0800, 4) + bit(0x0100, 2) + bit(0x0020, 1);
    let c = bit(0x0400, 4) + bit(0x0080, 2) + bit(0x0010, 1);
    let d = bit(0x0008, 4) + bit(0x0004, 2) + bit(0x0002, 1);

    format!("{}{}{}{}", a, b, c, d)
}
