//! Difficulty predicate, kept apart from block integrity checks.

use crate::blockchain::core::block::Sha256Hash;
use crate::error::ChainError;

/// Largest meaningful difficulty: every bit of a SHA-256 digest must be zero.
pub const MAX_DIFFICULTY: u32 = 256;

pub fn check_difficulty(difficulty: u32) -> Result<(), ChainError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(ChainError::InvalidDifficulty(difficulty));
    }
    Ok(())
}

/// Number of leading zero bits of `hash` read as a big-endian integer.
pub fn leading_zero_bits(hash: &Sha256Hash) -> u32 {
    let mut bits = 0;
    for byte in hash {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

/// Whether `hash < 2^(256 - difficulty)`.
///
/// A value is below `2^(256 - d)` exactly when its top `d` bits are clear, so
/// the comparison reduces to counting leading zeros. Difficulty 0 accepts
/// every digest.
pub fn meets_target(hash: &Sha256Hash, difficulty: u32) -> bool {
    leading_zero_bits(hash) >= difficulty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_bits() {
        assert_eq!(leading_zero_bits(&[0u8; 32]), 256);
        assert_eq!(leading_zero_bits(&[0xff; 32]), 0);

        let mut hash = [0u8; 32];
        hash[2] = 0b0001_0000;
        assert_eq!(leading_zero_bits(&hash), 19);
    }

    #[test]
    fn test_meets_target_boundary() {
        // 2^240 exactly: byte 1 is 0x01, so 15 leading zero bits.
        let mut at_target = [0u8; 32];
        at_target[1] = 0x01;
        assert!(!meets_target(&at_target, 16));
        assert!(meets_target(&at_target, 15));

        // 2^240 - 1: all ones after the first two bytes.
        let mut below = [0xff; 32];
        below[0] = 0;
        below[1] = 0;
        assert!(meets_target(&below, 16));
        assert!(!meets_target(&below, 17));
    }

    #[test]
    fn test_zero_difficulty_accepts_anything() {
        assert!(meets_target(&[0xff; 32], 0));
    }

    #[test]
    fn test_check_difficulty() {
        assert!(check_difficulty(0).is_ok());
        assert!(check_difficulty(256).is_ok());
        assert_eq!(check_difficulty(257), Err(ChainError::InvalidDifficulty(257)));
    }
}
