//! Integer matrices with a declared storage depth.
//!
//! A [`Matrix`] is the logical (unpacked) form of an operand: row-major
//! `i64` values together with the plane count and signedness the codec
//! will pack them at. Values are held wider than the declared depth on
//! purpose: range enforcement happens at pack time, where an out-of-range
//! value is an error rather than a silent truncation.

use crate::error::{CodecError, Result};
use bitmill_layout::geometry::PlaneGeometry;
use bitmill_layout::limits::{depth_in_range, MAX_BIT_DEPTH};
use bitmill_layout::word::WordSize;
use std::fmt;

/// Interpretation of the most-significant bitplane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signedness {
    /// Two's-complement: the top plane carries weight `-2^(depth-1)`.
    #[default]
    Signed,
    /// Plain binary: every plane carries positive weight. Depth 1 unsigned
    /// is the pure binary (XNOR-free) configuration.
    Unsigned,
}

impl Signedness {
    /// Smallest value representable at `bit_depth` planes.
    ///
    /// `bit_depth` must be at least 1.
    #[must_use]
    pub const fn min_value(self, bit_depth: usize) -> i64 {
        match self {
            Self::Signed => -(1i64 << (bit_depth - 1)),
            Self::Unsigned => 0,
        }
    }

    /// Largest value representable at `bit_depth` planes.
    ///
    /// `bit_depth` must be at least 1.
    #[must_use]
    pub const fn max_value(self, bit_depth: usize) -> i64 {
        match self {
            Self::Signed => (1i64 << (bit_depth - 1)) - 1,
            Self::Unsigned => (1i64 << bit_depth) - 1,
        }
    }

    /// Whether `value` is representable at `bit_depth` planes.
    #[must_use]
    pub const fn fits(self, value: i64, bit_depth: usize) -> bool {
        value >= self.min_value(bit_depth) && value <= self.max_value(bit_depth)
    }
}

impl fmt::Display for Signedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed => write!(f, "signed"),
            Self::Unsigned => write!(f, "unsigned"),
        }
    }
}

/// Row-major integer matrix carrying its declared bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    bit_depth: usize,
    signedness: Signedness,
    values: Vec<i64>,
}

impl Matrix {
    /// Create a zero matrix.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero dimensions or a depth outside
    /// `1..=MAX_BIT_DEPTH`.
    pub fn zeroed(rows: usize, cols: usize, bit_depth: usize, signedness: Signedness) -> Result<Self> {
        validate_dims(rows, cols, bit_depth)?;
        Ok(Self {
            rows,
            cols,
            bit_depth,
            signedness,
            values: vec![0; rows * cols],
        })
    }

    /// Create a matrix from row-major values.
    ///
    /// Value range against `bit_depth` is deliberately not checked here;
    /// the codec checks at pack time so that a bad vector source fails
    /// loudly at the hardware boundary.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero dimensions, a depth outside
    /// `1..=MAX_BIT_DEPTH`, or a value buffer whose length is not
    /// `rows * cols`.
    pub fn from_values(
        rows: usize,
        cols: usize,
        bit_depth: usize,
        signedness: Signedness,
        values: Vec<i64>,
    ) -> Result<Self> {
        validate_dims(rows, cols, bit_depth)?;
        if values.len() != rows * cols {
            return Err(CodecError::configuration(format!(
                "value buffer holds {} entries, expected {rows}x{cols}={}",
                values.len(),
                rows * cols
            )));
        }
        Ok(Self { rows, cols, bit_depth, signedness, values })
    }

    pub(crate) fn from_raw_parts(
        rows: usize,
        cols: usize,
        bit_depth: usize,
        signedness: Signedness,
        values: Vec<i64>,
    ) -> Self {
        debug_assert_eq!(values.len(), rows * cols);
        Self { rows, cols, bit_depth, signedness, values }
    }

    /// Row count.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Declared plane count.
    pub fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// Declared top-plane interpretation.
    pub fn signedness(&self) -> Signedness {
        self.signedness
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
        assert!(row < self.rows && col < self.cols, "index ({row},{col}) out of {}x{}", self.rows, self.cols);
        self.values[row * self.cols + col]
    }

    /// Set the value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        assert!(row < self.rows && col < self.cols, "index ({row},{col}) out of {}x{}", self.rows, self.cols);
        self.values[row * self.cols + col] = value;
    }

    /// Transposed copy. The accelerator consumes its right-hand operand
    /// transposed, so both operands present the shared inner dimension as
    /// packed rows.
    pub fn transposed(&self) -> Self {
        let mut values = vec![0i64; self.values.len()];
        for r in 0..self.rows {
            for c in 0..self.cols {
                values[c * self.rows + r] = self.values[r * self.cols + c];
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            bit_depth: self.bit_depth,
            signedness: self.signedness,
            values,
        }
    }

    /// Packed layout this matrix takes at the given port width.
    pub fn geometry(&self, word_size: WordSize) -> PlaneGeometry {
        PlaneGeometry::new(self.rows, self.cols, self.bit_depth, word_size)
    }
}

fn validate_dims(rows: usize, cols: usize, bit_depth: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(CodecError::configuration(format!(
            "matrix dimensions must be non-zero, got {rows}x{cols}"
        )));
    }
    check_depth(bit_depth)
}

/// Shared depth check for every operand kind.
pub(crate) fn check_depth(bit_depth: usize) -> Result<()> {
    if !depth_in_range(bit_depth) {
        return Err(CodecError::configuration(format!(
            "bit depth {bit_depth} outside supported range 1..={MAX_BIT_DEPTH}"
        )));
    }
    Ok(())
}
