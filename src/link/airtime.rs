//! LoRa Time-on-Air calculation
//!
//! Used to bound the post-transmit wait when no AUX line is wired. Pure
//! integer arithmetic: symbol times for every supported rate are whole
//! microseconds, and fractional symbol counts are carried as
//! quarter-symbols.

use crate::link::settings::AirDataRate;

/// Preamble length the module transmits
const PREAMBLE_SYMBOLS: u64 = 8;
/// Coding rate 4/5 expressed as the denominator offset
const CODING_RATE: u64 = 1;
/// CRC adds 16 bits to the payload
const CRC_BITS: u64 = 16;

/// Duration one transmission occupies the channel, in milliseconds
/// (rounded up).
///
/// Assumes the module's fixed physical framing: 8-symbol preamble,
/// explicit header, CRC on, coding rate 4/5, low-data-rate optimisation at
/// SF11 and above.
pub fn time_on_air_ms(rate: AirDataRate, payload_len: usize) -> u32 {
    let sf = rate.spreading_factor() as u64;
    let bw_khz = rate.bandwidth_khz() as u64;

    // Symbol time in microseconds: 2^SF / BW. Exact for 125/250/500 kHz.
    let t_sym_us = (1u64 << sf) * 1000 / bw_khz;

    // Low data rate optimisation halves the effective symbol bits.
    let de = if sf >= 11 { 1 } else { 0 };

    // Payload symbol count per the LoRa specification, CR 4/5.
    let bits = 8 * payload_len as u64 + 28 + CRC_BITS;
    let numerator = bits.saturating_sub(4 * sf);
    let denominator = 4 * (sf - 2 * de);
    let blocks = numerator.div_ceil(denominator);
    let payload_symbols = 8 + blocks * (CODING_RATE + 4);

    // Preamble is (8 + 4.25) symbols; track quarter-symbols to stay exact.
    let quarter_symbols = 4 * (PREAMBLE_SYMBOLS + payload_symbols) + 17;
    let total_us = quarter_symbols * t_sym_us / 4;

    total_us.div_ceil(1000) as u32
}
