//! Full-row identity used for deduplication

use std::hash::Hash;

/// A row whose identity is the value of every one of its columns
///
/// Two rows are duplicates exactly when their identities are equal. The
/// identity must cover all columns; a narrower key would turn full-row
/// dedup into key-wise dedup.
pub trait RowIdentity {
    type Key: Hash + Eq;

    fn identity(&self) -> Self::Key;
}

/// Bit pattern of a float with `-0.0` folded into `0.0` and every NaN folded
/// into one canonical NaN
pub fn canonical_f64_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

/// [`canonical_f64_bits`] lifted over a nullable column
pub fn canonical_opt_f64(value: Option<f64>) -> Option<u64> {
    value.map(canonical_f64_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_zero_is_one_value() {
        assert_eq!(canonical_f64_bits(-0.0), canonical_f64_bits(0.0));
    }

    #[test]
    fn test_nans_are_one_value() {
        let other_nan = f64::from_bits(f64::NAN.to_bits() | 1);
        assert!(other_nan.is_nan());
        assert_eq!(canonical_f64_bits(other_nan), canonical_f64_bits(f64::NAN));
    }

    #[test]
    fn test_distinct_values_stay_distinct() {
        assert_ne!(canonical_f64_bits(1.5), canonical_f64_bits(1.25));
        assert_ne!(canonical_opt_f64(None), canonical_opt_f64(Some(0.0)));
    }
}
