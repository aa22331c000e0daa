//! Conversion of raw entropy into battery-shaped sequences.
//!
//! External producers (OS random devices, other generator algorithms) hand over
//! raw bytes or fixed-width integer words. The test battery wants reals in
//! `[0, 1)`. This module is the single place where that reshaping happens:
//!
//! ```text
//! bytes → words_from_bytes → words → unit_from_words → [0, 1) sequence
//! ```

use thiserror::Error;

/// Word widths accepted by the conversions.
pub const SUPPORTED_WORD_BITS: [u32; 4] = [8, 16, 32, 64];

/// Errors raised while reshaping raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditioningError {
    #[error("unsupported word width: {0} bits (expected 8, 16, 32 or 64)")]
    UnsupportedWidth(u32),
    #[error("word {value:#x} at index {index} does not fit in {bits} bits")]
    WordTooWide { index: usize, value: u64, bits: u32 },
}

fn check_width(bits: u32) -> Result<(), ConditioningError> {
    if SUPPORTED_WORD_BITS.contains(&bits) {
        Ok(())
    } else {
        Err(ConditioningError::UnsupportedWidth(bits))
    }
}

/// Group bytes into big-endian words of `bits` width.
///
/// A trailing partial word is dropped.
pub fn words_from_bytes(bytes: &[u8], bits: u32) -> Result<Vec<u64>, ConditioningError> {
    check_width(bits)?;
    let width = (bits / 8) as usize;
    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| chunk.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
        .collect())
}

/// Map `bits`-wide words onto `[0, 1)` as `w / 2^bits`.
///
/// For 64-bit words the top 53 bits are kept so the quotient cannot round up
/// to 1.0.
pub fn unit_from_words(words: &[u64], bits: u32) -> Result<Vec<f64>, ConditioningError> {
    check_width(bits)?;
    if bits == 64 {
        let scale = 1.0 / (1u64 << 53) as f64;
        return Ok(words.iter().map(|&w| (w >> 11) as f64 * scale).collect());
    }
    let limit = 1u64 << bits;
    let scale = 1.0 / limit as f64;
    words
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if value >= limit {
                Err(ConditioningError::WordTooWide { index, value, bits })
            } else {
                Ok(value as f64 * scale)
            }
        })
        .collect()
}

/// [`words_from_bytes`] followed by [`unit_from_words`].
pub fn unit_from_bytes(bytes: &[u8], bits: u32) -> Result<Vec<f64>, ConditioningError> {
    let words = words_from_bytes(bytes, bits)?;
    unit_from_words(&words, bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_big_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0xFF, 0x00, 0x00, 0x01];
        assert_eq!(
            words_from_bytes(&bytes, 32).unwrap(),
            vec![0x0102_0304, 0xFF00_0001]
        );
        assert_eq!(words_from_bytes(&bytes, 16).unwrap()[0], 0x0102);
    }

    #[test]
    fn partial_word_dropped() {
        let bytes = [0xAA; 7];
        assert_eq!(words_from_bytes(&bytes, 32).unwrap().len(), 1);
        assert!(words_from_bytes(&bytes[..3], 32).unwrap().is_empty());
    }

    #[test]
    fn unsupported_width_rejected() {
        assert_eq!(
            words_from_bytes(&[0; 4], 12),
            Err(ConditioningError::UnsupportedWidth(12))
        );
        assert_eq!(
            unit_from_words(&[0], 0),
            Err(ConditioningError::UnsupportedWidth(0))
        );
    }

    #[test]
    fn unit_values_stay_below_one() {
        let v = unit_from_words(&[0, 0x8000_0000, u32::MAX as u64], 32).unwrap();
        assert_eq!(v[0], 0.0);
        assert_eq!(v[1], 0.5);
        assert!(v[2] < 1.0);

        let v = unit_from_words(&[u64::MAX], 64).unwrap();
        assert!(v[0] < 1.0);
    }

    #[test]
    fn oversized_word_rejected() {
        assert_eq!(
            unit_from_words(&[1, 256], 8),
            Err(ConditioningError::WordTooWide {
                index: 1,
                value: 256,
                bits: 8
            })
        );
    }

    #[test]
    fn bytes_to_unit() {
        let v = unit_from_bytes(&[0x00, 0x80, 0xFF], 8).unwrap();
        assert_eq!(v, vec![0.0, 0.5, 255.0 / 256.0]);
    }
}
