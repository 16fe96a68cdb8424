//! CRC-24 parity for Mode S messages

/// CRC-24 generator polynomial used in Mode S (0x1FFF409)
const CRC24_POLY: u32 = 0x1FFF409;

/// Compute CRC-24 over the first `bits` bits of `msg`
pub fn compute_crc24(msg: &[u8], bits: usize) -> u32 {
    let mut crc: u32 = 0;

    for &byte in &msg[..bits / 8] {
        crc ^= (byte as u32) << 16;

        for _ in 0..8 {
            if crc & 0x800000 != 0 {
                crc = (crc << 1) ^ CRC24_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc & 0xFFFFFF
}

/// CRC of the data bits XOR the trailing 24-bit parity field.
///
/// Zero for an intact DF17/18 frame. For replies with address/parity
/// overlay (DF0/4/5/16/20/21) this is the transponder address.
pub fn parity_residual(msg: &[u8]) -> u32 {
    let data_len = msg.len().saturating_sub(3);
    let crc = compute_crc24(&msg[..data_len], data_len * 8);
    let parity = msg[data_len..]
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32);
    crc ^ parity
}

/// Extract the clear-text address field (bytes 1-3)
pub fn get_icao(msg: &[u8]) -> u32 {
    ((msg[1] as u32) << 16) | ((msg[2] as u32) << 8) | (msg[3] as u32)
}

/// Extract downlink format from message
pub fn get_df(msg: &[u8]) -> u8 {
    (msg[0] >> 3) & 0x1F
}
