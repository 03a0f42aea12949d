//! Bit-serial weighted dot engine.
//!
//! An integer product decomposes over bitplanes: with operand values
//! `a = Σ bit_d(a)·2^d` (top plane weighted negative when signed), the
//! product of two packed operands is a sum over plane pairs `(da, dw)` of
//! `±2^(da+dw) · popcount(planeA_da AND planeW_dw)` per output cell. The
//! sign correction lives entirely in the MSB planes; two MSB planes
//! multiply to a positive contribution because both signs cancel.
//!
//! The right-hand operand arrives **transposed-packed** (a logical `K × C`
//! matrix packed as `C × K`), so both operands expose the shared dimension
//! `K` as packed rows and every output cell is one AND/popcount pass over
//! two row slices.

use crate::error::{EngineError, Result};
use bitmill_codec::{Matrix, PackedMatrix, Signedness};
use tracing::debug;

/// Exact integer product of two operands, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMatrix {
    rows: usize,
    cols: usize,
    values: Vec<i64>,
}

impl ProductMatrix {
    fn zeroed(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0; rows * cols],
        }
    }

    /// Row count.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major values.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> i64 {
        assert!(row < self.rows && col < self.cols);
        self.values[row * self.cols + col]
    }
}

/// Popcount of the bitwise AND of two equal-length word runs.
///
/// Padding bits are zero in every packed row, so running over the full
/// padded slices never adds stray bits.
pub fn and_popcount(a: &[u64], b: &[u64]) -> i64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| i64::from((x & y).count_ones()))
        .sum()
}

/// Sign of plane `d`: `-1` on the MSB plane of a signed operand, else `+1`.
pub(crate) const fn plane_sign(signedness: Signedness, d: usize, bit_depth: usize) -> i64 {
    match signedness {
        Signedness::Signed if d == bit_depth - 1 => -1,
        _ => 1,
    }
}

/// Multiply two packed operands bit-serially.
///
/// `lhs` is an `R × K` matrix packed as-is; `rhs` is a logical `K × C`
/// matrix packed transposed (so its packed shape is `C × K`). The result
/// is the exact `R × C` integer product.
///
/// # Errors
///
/// Returns a word-size mismatch if the operands were packed for different
/// port widths, or a shape mismatch if their packed column counts (the
/// shared `K`) differ.
pub fn multiply(lhs: &PackedMatrix, rhs: &PackedMatrix) -> Result<ProductMatrix> {
    let lg = lhs.geometry();
    let rg = rhs.geometry();

    if lg.word_size() != rg.word_size() {
        return Err(EngineError::WordSizeMismatch {
            lhs: lg.word_size().bits(),
            rhs: rg.word_size().bits(),
        });
    }
    if lg.cols() != rg.cols() {
        return Err(EngineError::shape_mismatch(format!(
            "inner dimension differs: lhs is {}x{}, transposed rhs is {}x{}",
            lg.rows(),
            lg.cols(),
            rg.rows(),
            rg.cols()
        )));
    }

    debug!(
        rows = lg.rows(),
        inner = lg.cols(),
        cols = rg.rows(),
        lhs_depth = lg.bit_depth(),
        rhs_depth = rg.bit_depth(),
        "bit-serial multiply"
    );

    let rows = lg.rows();
    let cols = rg.rows();
    let mut out = ProductMatrix::zeroed(rows, cols);

    for da in 0..lg.bit_depth() {
        let sign_a = plane_sign(lhs.signedness(), da, lg.bit_depth());
        for dw in 0..rg.bit_depth() {
            let sign_w = plane_sign(rhs.signedness(), dw, rg.bit_depth());
            let alpha = (1i64 << (da + dw)) * sign_a * sign_w;
            for i in 0..rows {
                let a_row = lhs.row_words(da, i);
                for j in 0..cols {
                    let w_row = rhs.row_words(dw, j);
                    out.values[i * cols + j] += alpha * and_popcount(a_row, w_row);
                }
            }
        }
    }
    Ok(out)
}

/// Multiply two logical matrices directly. This is the plain integer
/// reference the bit-serial path must reproduce exactly.
///
/// # Errors
///
/// Returns a shape mismatch if `a.cols() != b.rows()`.
pub fn multiply_direct(a: &Matrix, b: &Matrix) -> Result<ProductMatrix> {
    if a.cols() != b.rows() {
        return Err(EngineError::shape_mismatch(format!(
            "cannot multiply {}x{} by {}x{}",
            a.rows(),
            a.cols(),
            b.rows(),
            b.cols()
        )));
    }
    let mut out = ProductMatrix::zeroed(a.rows(), b.cols());
    for i in 0..a.rows() {
        for j in 0..b.cols() {
            let mut acc = 0i64;
            for k in 0..a.cols() {
                acc += a.get(i, k) * b.get(k, j);
            }
            out.values[i * b.cols() + j] = acc;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitmill_codec::BitplaneCodec;
    use bitmill_layout::word::WordSize;

    fn codec() -> BitplaneCodec {
        BitplaneCodec::new(WordSize::W64)
    }

    #[test]
    fn popcount_over_word_runs() {
        assert_eq!(and_popcount(&[0b1010, u64::MAX], &[0b0110, 1]), 2);
        assert_eq!(and_popcount(&[], &[]), 0);
    }

    #[test]
    fn packed_matches_direct_small_signed() {
        let a = Matrix::from_values(2, 3, 4, Signedness::Signed, vec![-8, 7, 1, 0, -1, 3]).unwrap();
        let b = Matrix::from_values(3, 2, 3, Signedness::Signed, vec![1, -4, 2, 3, -2, 0]).unwrap();
        let direct = multiply_direct(&a, &b).unwrap();
        let packed = multiply(
            &codec().pack(&a).unwrap(),
            &codec().pack_transposed(&b).unwrap(),
        )
        .unwrap();
        assert_eq!(packed, direct);
    }

    #[test]
    fn mixed_signedness_operands() {
        let a = Matrix::from_values(1, 2, 4, Signedness::Unsigned, vec![15, 9]).unwrap();
        let b = Matrix::from_values(2, 1, 4, Signedness::Signed, vec![-8, 5]).unwrap();
        let direct = multiply_direct(&a, &b).unwrap();
        let packed = multiply(
            &codec().pack(&a).unwrap(),
            &codec().pack_transposed(&b).unwrap(),
        )
        .unwrap();
        assert_eq!(packed, direct);
        assert_eq!(packed.get(0, 0), 15 * -8 + 9 * 5);
    }

    #[test]
    fn inner_dimension_mismatch_is_rejected() {
        let a = Matrix::from_values(1, 2, 2, Signedness::Signed, vec![1, 1]).unwrap();
        let b = Matrix::from_values(1, 3, 2, Signedness::Signed, vec![1, 1, 1]).unwrap();
        // both packed as-is: K=2 vs K=3
        let err = multiply(&codec().pack(&a).unwrap(), &codec().pack(&b).unwrap());
        assert!(matches!(err, Err(EngineError::ShapeMismatch { .. })));
    }

    #[test]
    fn word_size_mismatch_is_rejected() {
        let a = Matrix::from_values(1, 2, 2, Signedness::Signed, vec![1, 1]).unwrap();
        let lhs = BitplaneCodec::new(WordSize::W64).pack(&a).unwrap();
        let rhs = BitplaneCodec::new(WordSize::W32).pack(&a).unwrap();
        assert!(matches!(
            multiply(&lhs, &rhs),
            Err(EngineError::WordSizeMismatch { lhs: 64, rhs: 32 })
        ));
    }

    #[test]
    fn direct_shape_mismatch_is_rejected() {
        let a = Matrix::from_values(1, 2, 2, Signedness::Signed, vec![1, 1]).unwrap();
        let b = Matrix::from_values(3, 1, 2, Signedness::Signed, vec![1, 1, 1]).unwrap();
        assert!(matches!(
            multiply_direct(&a, &b),
            Err(EngineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn msb_pair_contributes_positively() {
        assert_eq!(plane_sign(Signedness::Signed, 3, 4), -1);
        assert_eq!(plane_sign(Signedness::Signed, 2, 4), 1);
        assert_eq!(plane_sign(Signedness::Unsigned, 3, 4), 1);
    }
}
