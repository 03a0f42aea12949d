// SPDX-License-Identifier: AGPL-3.0-only

//! Operand sources for verification sweeps.
//!
//! Test-vector generation is injected, not baked in: anything that can
//! hand out in-range integers one at a time is an [`OperandSource`], and
//! the builder functions assemble whole matrices, images, and filter banks
//! from one. The sweep binaries use [`XoshiroSource`] for reproducible
//! randomized cases; [`RampSource`] walks the representable range in order
//! and is handy for worked examples and layout debugging.

use crate::error::Result;
use bitmill_codec::{FilterBank, Image, Matrix, Signedness};

/// Supplies integer operand values one at a time.
///
/// Implementations must return values inside the representable range of
/// the requested depth and signedness; the codec range check will refuse
/// the operand otherwise.
pub trait OperandSource {
    /// Next value, representable at `bit_depth` planes under `signedness`.
    fn next_value(&mut self, bit_depth: usize, signedness: Signedness) -> i64;
}

/// Build a matrix by drawing `rows × cols` values from a source.
///
/// # Errors
///
/// Returns a configuration error for invalid dimensions or depth.
pub fn matrix_from<S: OperandSource + ?Sized>(
    source: &mut S,
    rows: usize,
    cols: usize,
    bit_depth: usize,
    signedness: Signedness,
) -> Result<Matrix> {
    let values = (0..rows * cols)
        .map(|_| source.next_value(bit_depth, signedness))
        .collect();
    Ok(Matrix::from_values(rows, cols, bit_depth, signedness, values)?)
}

/// Build an image by drawing `height × width × channels` values from a
/// source.
///
/// # Errors
///
/// Returns a configuration error for invalid dimensions or depth.
pub fn image_from<S: OperandSource + ?Sized>(
    source: &mut S,
    height: usize,
    width: usize,
    channels: usize,
    bit_depth: usize,
    signedness: Signedness,
) -> Result<Image> {
    let values = (0..height * width * channels)
        .map(|_| source.next_value(bit_depth, signedness))
        .collect();
    Ok(Image::from_values(height, width, channels, bit_depth, signedness, values)?)
}

/// Build a filter bank by drawing values from a source.
///
/// # Errors
///
/// Returns a configuration error for invalid dimensions or depth.
pub fn filters_from<S: OperandSource + ?Sized>(
    source: &mut S,
    out_channels: usize,
    in_channels: usize,
    window: usize,
    bit_depth: usize,
    signedness: Signedness,
) -> Result<FilterBank> {
    let values = (0..out_channels * in_channels * window * window)
        .map(|_| source.next_value(bit_depth, signedness))
        .collect();
    Ok(FilterBank::from_values(
        out_channels,
        in_channels,
        window,
        bit_depth,
        signedness,
        values,
    )?)
}

/// xoshiro256++ seeded PRNG source.
///
/// Small, fast, and reproducible from a single `u64` seed; the sweep
/// binaries print the seed in their banner so a failing case can be
/// replayed exactly.
#[derive(Debug, Clone)]
pub struct XoshiroSource {
    s: [u64; 4],
}

impl XoshiroSource {
    /// Create a source from a seed. Any seed is fine, including 0.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let s = [
            seed ^ 0x9e37_79b9_7f4a_7c15,
            seed.wrapping_add(0x6c62_272e_07bb_0142),
            seed.rotate_left(17),
            seed.rotate_right(5),
        ];
        let mut src = Self { s };
        for _ in 0..20 {
            let _ = src.next_u64();
        }
        src
    }

    /// Next raw 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1].wrapping_shl(17);
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Draw from `0..bound`. `bound` must be non-zero.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

impl OperandSource for XoshiroSource {
    fn next_value(&mut self, bit_depth: usize, signedness: Signedness) -> i64 {
        let lo = signedness.min_value(bit_depth);
        let hi = signedness.max_value(bit_depth);
        let span = (hi - lo + 1) as u64;
        lo + self.next_below(span) as i64
    }
}

/// Deterministic source that walks the representable range in order,
/// minimum first, wrapping at the top.
#[derive(Debug, Clone, Default)]
pub struct RampSource {
    counter: u64,
}

impl RampSource {
    /// Create a ramp starting at the range minimum.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OperandSource for RampSource {
    fn next_value(&mut self, bit_depth: usize, signedness: Signedness) -> i64 {
        let lo = signedness.min_value(bit_depth);
        let hi = signedness.max_value(bit_depth);
        let span = (hi - lo + 1) as u64;
        let v = lo + (self.counter % span) as i64;
        self.counter += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xoshiro_is_reproducible() {
        let mut a = XoshiroSource::new(42);
        let mut b = XoshiroSource::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn xoshiro_values_stay_in_range() {
        let mut src = XoshiroSource::new(7);
        for _ in 0..1000 {
            let v = src.next_value(5, Signedness::Signed);
            assert!((-16..=15).contains(&v));
            let u = src.next_value(5, Signedness::Unsigned);
            assert!((0..=31).contains(&u));
        }
    }

    #[test]
    fn ramp_walks_the_range() {
        let mut src = RampSource::new();
        let vals: Vec<i64> = (0..6).map(|_| src.next_value(2, Signedness::Signed)).collect();
        assert_eq!(vals, vec![-2, -1, 0, 1, -2, -1]);
    }

    #[test]
    fn built_operands_pack_cleanly() {
        let mut src = XoshiroSource::new(1234);
        let m = matrix_from(&mut src, 4, 9, 6, Signedness::Signed).unwrap();
        assert_eq!(m.values().len(), 36);
        let img = image_from(&mut src, 3, 3, 2, 4, Signedness::Unsigned).unwrap();
        assert!(img.values().iter().all(|&v| (0..16).contains(&v)));
        let f = filters_from(&mut src, 2, 2, 3, 3, Signedness::Signed).unwrap();
        assert_eq!(f.values().len(), 36);
    }
}
