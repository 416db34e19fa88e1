//! Additive frame checksum.

/// Sums every byte modulo 256.
///
/// Returns 0 for empty input.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}
