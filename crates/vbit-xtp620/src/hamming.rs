//! Hamming 8/4 coding used for Newfor parameters.
//!
//! Each protected byte carries one nybble in bits 1, 3, 5 and 7 with four
//! protection bits interleaved. Any single-bit error is corrected; two-bit
//! errors are detected and the byte is rejected.

/// Hamming 8/4 codewords, indexed by nybble value.
pub const HAMMING_8_4: [u8; 16] = [
    0x15, 0x02, 0x49, 0x5E, 0x64, 0x73, 0x38, 0x2F, 0xD0, 0xC7, 0x8C, 0x9B, 0xA1, 0xB6, 0xFD, 0xEA,
];

/// Encode the low nybble of `nybble`.
pub fn encode(nybble: u8) -> u8 {
    HAMMING_8_4[usize::from(nybble & 0x0F)]
}

/// Decode one protected byte, correcting a single bit error.
///
/// Codewords are at least four bits apart, so at most one lies within one
/// bit of any received byte. Returns `None` for uncorrectable bytes.
pub fn decode(byte: u8) -> Option<u8> {
    HAMMING_8_4
        .iter()
        .position(|&code| (code ^ byte).count_ones() <= 1)
        .map(|n| n as u8)
}
