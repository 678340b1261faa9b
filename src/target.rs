//! Difficulty to share-target conversion.
//!
//! Pools communicate share difficulty as a number; miners compare hashes
//! against a 256-bit target. The conversion divides the difficulty-1
//! boundary by the difficulty, carrying the (possibly fractional)
//! difficulty through a fixed 10^16 decimal scale so the division happens
//! in integer arithmetic.

use crate::u256::U256;

/// Decimal scale bridging floating-point difficulty into integers. Keeps
/// roughly 16 significant digits, which is all an f64 carries anyway.
pub(crate) const DIFFICULTY_SCALE: u64 = 10_000_000_000_000_000;

/// The difficulty-1 boundary: 0x00000000FFFF0000 zero-extended to 256 bits.
fn diff1() -> U256 {
    let mut be = [0u8; 32];
    be[4] = 0xff;
    be[5] = 0xff;
    U256::from_be_bytes(be)
}

/// Convert a share difficulty into a 256-bit target, serialized as eight
/// little-endian u32 words (`words[0]` holds the least significant bytes).
///
/// Difficulty 1.0 yields `words[6] == 0xFFFF0000` with every other word
/// zero. Difficulties too small for the decimal scale clamp to one scale
/// unit, saturating the target.
pub fn difficulty_to_target(difficulty: f64) -> [u32; 8] {
    let scaled = (difficulty * DIFFICULTY_SCALE as f64).floor() as u128;
    let scaled = scaled.max(1);

    let target = diff1().mul_div(DIFFICULTY_SCALE, scaled);

    let bytes = target.to_le_bytes();
    let mut words = [0u32; 8];
    for (i, word) in words.iter_mut().enumerate() {
        let mut chunk = [0u8; 4];
        chunk.copy_from_slice(&bytes[4 * i..4 * i + 4]);
        *word = u32::from_le_bytes(chunk);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_difficulty() {
        let words = difficulty_to_target(1.0);
        assert_eq!(words[6], 0xffff0000);
        for (i, word) in words.iter().enumerate() {
            if i != 6 {
                assert_eq!(*word, 0, "word {} should be zero", i);
            }
        }
    }

    #[test]
    fn test_half_difficulty_doubles_target() {
        let words = difficulty_to_target(0.5);
        assert_eq!(words[7], 0x1);
        assert_eq!(words[6], 0xfffe0000);
        assert_eq!(&words[..6], &[0; 6]);
    }

    #[test]
    fn test_fractional_difficulty() {
        // DIFF1 / 2.5: 0xffff0000 / 2.5 == 0x66660000 exactly.
        let words = difficulty_to_target(2.5);
        assert_eq!(words[6], 0x66660000);
        assert_eq!(words[7], 0);
        assert_eq!(&words[..6], &[0; 6]);
    }

    #[test]
    fn test_power_of_two_difficulty() {
        let words = difficulty_to_target(16384.0);
        assert_eq!(words[6], 0x3fffc);
        assert_eq!(words[7], 0);
        assert_eq!(&words[..6], &[0; 6]);
    }

    #[test]
    fn test_higher_difficulty_shrinks_target() {
        let easy = difficulty_to_target(1.0);
        let hard = difficulty_to_target(4096.0);
        // Compare as big integers via the most significant differing word.
        assert!(hard[6] < easy[6]);
    }
}
