//! Depth and accumulator budgets.
//!
//! The reference arithmetic accumulates partial products in `i64`. A plane
//! pair at depths `(a, w)` contributes with significance `2^(a+w)`, so with
//! both operands capped at [`MAX_BIT_DEPTH`] planes the largest magnitude
//! per AND/popcount step is `2^62 · popcount`, which leaves headroom in the
//! 64-bit accumulator for any operand shape the harness exercises.

/// Maximum bitplane count per operand.
pub const MAX_BIT_DEPTH: usize = 32;

/// Accumulator width the reference engines are written against.
pub const ACCUMULATOR_BITS: usize = 64;

/// Largest significance exponent a plane pair can reach: both operands at
/// full depth contribute `2^(MAX_BIT_DEPTH-1 + MAX_BIT_DEPTH-1)`.
pub const MAX_SIGNIFICANCE_EXPONENT: usize = 2 * (MAX_BIT_DEPTH - 1);

/// Whether `bit_depth` is a usable plane count (at least the sign plane,
/// at most the accumulator budget allows).
#[must_use]
pub const fn depth_in_range(bit_depth: usize) -> bool {
    bit_depth >= 1 && bit_depth <= MAX_BIT_DEPTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significance_fits_the_accumulator() {
        assert!(MAX_SIGNIFICANCE_EXPONENT < ACCUMULATOR_BITS - 1);
        // the actual shift performed by the dot engine at full depth
        let alpha = 1i64 << MAX_SIGNIFICANCE_EXPONENT;
        assert!(alpha > 0);
    }

    #[test]
    fn depth_range_endpoints() {
        assert!(!depth_in_range(0));
        assert!(depth_in_range(1));
        assert!(depth_in_range(MAX_BIT_DEPTH));
        assert!(!depth_in_range(MAX_BIT_DEPTH + 1));
    }
}
