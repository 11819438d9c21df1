//! Order-preserving 32-bit encodings.
//!
//! Range queries compare keys lexicographically, so stored values must
//! sort the same way their numeric originals do. Both encodings are
//! bijections onto `u32` with `a < b ⇔ encode(a) < encode(b)`:
//!
//! - `int32`: flip the sign bit, so negatives land below positives.
//! - `float32`: reinterpret the IEEE 754 bits, then flip all bits for
//!   negatives and only the sign bit for positives. `-0.0` lands directly
//!   below `+0.0`. NaNs are accepted but their relative order carries no
//!   meaning.

/// `f32` → order-preserving `u32`.
pub fn float_to_sortable(f: f32) -> u32 {
    let bits = f.to_bits();
    // arithmetic shift smears the sign bit across the mask
    let mask = (((bits as i32) >> 31) as u32) | 0x8000_0000;
    bits ^ mask
}

/// Inverse of [`float_to_sortable`].
pub fn sortable_to_float(s: u32) -> f32 {
    let mask = ((s >> 31).wrapping_sub(1)) | 0x8000_0000;
    f32::from_bits(s ^ mask)
}

/// `i32` → order-preserving `u32`.
pub fn int_to_sortable(i: i32) -> u32 {
    (i as u32) ^ 0x8000_0000
}

/// Inverse of [`int_to_sortable`].
pub fn sortable_to_int(s: u32) -> i32 {
    (s ^ 0x8000_0000) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_ordering_preserved() {
        let samples = [
            f32::NEG_INFINITY,
            -1.0e30,
            -2.5,
            -1.0,
            -f32::MIN_POSITIVE,
            -0.0,
            0.0,
            f32::MIN_POSITIVE,
            0.5,
            1.0,
            10.5,
            1.0e30,
            f32::INFINITY,
        ];
        for pair in samples.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a < b {
                assert!(
                    float_to_sortable(a) < float_to_sortable(b),
                    "{a} should encode below {b}"
                );
            }
        }
    }

    #[test]
    fn float_round_trip() {
        for f in [-1.0e30f32, -2.5, -0.0, 0.0, 1.0, 10.5, f32::INFINITY] {
            let back = sortable_to_float(float_to_sortable(f));
            assert_eq!(back.to_bits(), f.to_bits());
        }
    }

    #[test]
    fn int_ordering_preserved() {
        let samples = [i32::MIN, -100_000, -1, 0, 1, 42, 100_000, i32::MAX];
        for pair in samples.windows(2) {
            assert!(int_to_sortable(pair[0]) < int_to_sortable(pair[1]));
        }
    }

    #[test]
    fn int_round_trip() {
        for i in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert_eq!(sortable_to_int(int_to_sortable(i)), i);
        }
    }

    #[test]
    fn negative_zero_sorts_below_positive_zero() {
        assert!(float_to_sortable(-0.0) < float_to_sortable(0.0));
    }
}
