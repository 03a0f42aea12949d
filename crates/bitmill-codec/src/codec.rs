//! The bitplane codec.
//!
//! Packing slices an integer operand into single-bit planes: plane `d`
//! holds bit `d` of every element's two's-complement representation,
//! extracted as `(value >> d) & 1` (arithmetic shift makes this correct
//! for negative values, including the sign plane). Unpacking reassembles
//! `Σ bit_d · 2^d` over the low planes and subtracts `bit · 2^(D-1)` for
//! the top plane of a signed operand.
//!
//! Every value is range-checked against the declared depth before any bit
//! is written. An out-of-range value is a [`CodecError::Range`], never a
//! truncation; a truncated buffer would verify cleanly against the wrong
//! answer.

use crate::error::{CodecError, Result};
use crate::image::{FilterBank, Image};
use crate::matrix::{Matrix, Signedness};
use crate::packed::{PackedFilters, PackedImage, PackedMatrix};
use bitmill_layout::word::WordSize;
use tracing::debug;

/// Packs logical operands into word-aligned bitplanes and back.
///
/// The port width is fixed per instance; both operands of a multiply must
/// come from codecs configured for the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitplaneCodec {
    word_size: WordSize,
}

impl BitplaneCodec {
    /// Create a codec for the given port width.
    #[must_use]
    pub const fn new(word_size: WordSize) -> Self {
        Self { word_size }
    }

    /// Port width this codec packs for.
    #[must_use]
    pub const fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// Pack a matrix into bitplanes, rows as presented.
    ///
    /// # Errors
    ///
    /// Returns a range error for any value that does not fit the matrix's
    /// declared depth.
    pub fn pack(&self, matrix: &Matrix) -> Result<PackedMatrix> {
        debug!(
            rows = matrix.rows(),
            cols = matrix.cols(),
            bit_depth = matrix.bit_depth(),
            word = %self.word_size,
            "packing matrix"
        );
        self.check_range(matrix.values(), matrix.bit_depth(), matrix.signedness())?;

        let mut packed = PackedMatrix::zeroed(matrix.geometry(self.word_size), matrix.signedness());
        for d in 0..matrix.bit_depth() {
            for i in 0..matrix.rows() {
                for j in 0..matrix.cols() {
                    let bit = (matrix.get(i, j) >> d) & 1;
                    packed.or_bit(d, i, j, bit as u64);
                }
            }
        }
        Ok(packed)
    }

    /// Pack a matrix transposed, the right-hand operand convention. The
    /// accelerator wants both operands' shared dimension along packed
    /// rows, so a logical `K × C` right-hand side packs as `C × K`.
    ///
    /// # Errors
    ///
    /// Returns a range error for any value that does not fit the matrix's
    /// declared depth.
    pub fn pack_transposed(&self, matrix: &Matrix) -> Result<PackedMatrix> {
        self.pack(&matrix.transposed())
    }

    /// Unpack a packed matrix back to logical values.
    #[must_use]
    pub fn unpack(&self, packed: &PackedMatrix) -> Matrix {
        let g = packed.geometry();
        let mut values = vec![0i64; g.rows() * g.cols()];
        for i in 0..g.rows() {
            for j in 0..g.cols() {
                let mut v = 0i64;
                for d in 0..g.bit_depth() {
                    let bit = packed.bit(d, i, j) as i64;
                    v += plane_weight(d, g.bit_depth(), packed.signedness()) * bit;
                }
                values[i * g.cols() + j] = v;
            }
        }
        Matrix::from_raw_parts(g.rows(), g.cols(), g.bit_depth(), packed.signedness(), values)
    }

    /// Pack an image channel-major: all planes of channel 0, then channel
    /// 1, and so on; LSB plane first within a channel.
    ///
    /// # Errors
    ///
    /// Returns a range error for any pixel that does not fit the image's
    /// declared depth.
    pub fn pack_image(&self, image: &Image) -> Result<PackedImage> {
        debug!(
            height = image.height(),
            width = image.width(),
            channels = image.channels(),
            bit_depth = image.bit_depth(),
            word = %self.word_size,
            "packing image"
        );
        self.check_range(image.values(), image.bit_depth(), image.signedness())?;

        let mut packed = PackedImage::zeroed(
            image.height(),
            image.width(),
            image.channels(),
            image.bit_depth(),
            self.word_size,
            image.signedness(),
        );
        for c in 0..image.channels() {
            for d in 0..image.bit_depth() {
                for y in 0..image.height() {
                    for x in 0..image.width() {
                        let bit = (image.get(y, x, c) >> d) & 1;
                        packed.or_bit(c, d, y, x, bit as u64);
                    }
                }
            }
        }
        Ok(packed)
    }

    /// Unpack a packed image back to channel-interleaved values.
    #[must_use]
    pub fn unpack_image(&self, packed: &PackedImage) -> Image {
        let mut values = vec![0i64; packed.height() * packed.width() * packed.channels()];
        for y in 0..packed.height() {
            for x in 0..packed.width() {
                for c in 0..packed.channels() {
                    let mut v = 0i64;
                    for d in 0..packed.bit_depth() {
                        let bit = packed.bit(c, d, y, x) as i64;
                        v += plane_weight(d, packed.bit_depth(), packed.signedness()) * bit;
                    }
                    values[(y * packed.width() + x) * packed.channels() + c] = v;
                }
            }
        }
        Image::from_raw_parts(
            packed.height(),
            packed.width(),
            packed.channels(),
            packed.bit_depth(),
            packed.signedness(),
            values,
        )
    }

    /// Pack a filter bank plane-major, each input channel's taps in their
    /// own padded patch.
    ///
    /// # Errors
    ///
    /// Returns a range error for any tap that does not fit the bank's
    /// declared depth.
    pub fn pack_filters(&self, filters: &FilterBank) -> Result<PackedFilters> {
        debug!(
            out_channels = filters.out_channels(),
            in_channels = filters.in_channels(),
            window = filters.window(),
            bit_depth = filters.bit_depth(),
            word = %self.word_size,
            "packing filters"
        );
        self.check_range(filters.values(), filters.bit_depth(), filters.signedness())?;

        let mut packed = PackedFilters::zeroed(
            filters.out_channels(),
            filters.in_channels(),
            filters.window(),
            filters.bit_depth(),
            self.word_size,
            filters.signedness(),
        );
        for d in 0..filters.bit_depth() {
            for co in 0..filters.out_channels() {
                for ci in 0..filters.in_channels() {
                    for i in 0..filters.window() {
                        for j in 0..filters.window() {
                            let bit = (filters.get(co, ci, i, j) >> d) & 1;
                            packed.or_bit(d, co, ci, i, j, bit as u64);
                        }
                    }
                }
            }
        }
        Ok(packed)
    }

    fn check_range(&self, values: &[i64], bit_depth: usize, signedness: Signedness) -> Result<()> {
        for (index, &value) in values.iter().enumerate() {
            if !signedness.fits(value, bit_depth) {
                return Err(CodecError::Range { value, index, bit_depth, signedness });
            }
        }
        Ok(())
    }
}

/// Weight of plane `d` when reassembling a value: `2^d` for low planes,
/// `-2^(D-1)` for the top plane of a signed operand.
pub(crate) fn plane_weight(d: usize, bit_depth: usize, signedness: Signedness) -> i64 {
    let magnitude = 1i64 << d;
    if signedness == Signedness::Signed && d == bit_depth - 1 {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> BitplaneCodec {
        BitplaneCodec::new(WordSize::W64)
    }

    #[test]
    fn roundtrip_signed_full_range() {
        let m = Matrix::from_values(
            2,
            4,
            8,
            Signedness::Signed,
            vec![-128, -1, 0, 127, 64, -64, 1, -2],
        )
        .unwrap();
        let packed = codec().pack(&m).unwrap();
        assert_eq!(codec().unpack(&packed), m);
    }

    #[test]
    fn roundtrip_unsigned_full_range() {
        let m = Matrix::from_values(1, 4, 8, Signedness::Unsigned, vec![0, 1, 254, 255]).unwrap();
        let packed = codec().pack(&m).unwrap();
        assert_eq!(codec().unpack(&packed), m);
    }

    #[test]
    fn negative_one_is_all_ones() {
        let m = Matrix::from_values(1, 1, 5, Signedness::Signed, vec![-1]).unwrap();
        let packed = codec().pack(&m).unwrap();
        for d in 0..5 {
            assert_eq!(packed.bit(d, 0, 0), 1, "plane {d}");
        }
    }

    #[test]
    fn sign_plane_carries_negative_weight() {
        // -8 at depth 4 = 0b1000: only the top plane set
        let m = Matrix::from_values(1, 1, 4, Signedness::Signed, vec![-8]).unwrap();
        let packed = codec().pack(&m).unwrap();
        assert_eq!(packed.bit(3, 0, 0), 1);
        for d in 0..3 {
            assert_eq!(packed.bit(d, 0, 0), 0, "plane {d}");
        }
        assert_eq!(codec().unpack(&packed).get(0, 0), -8);
    }

    #[test]
    fn out_of_range_value_is_an_error_not_a_truncation() {
        let m = Matrix::from_values(1, 2, 4, Signedness::Signed, vec![3, 8]).unwrap();
        let err = codec().pack(&m).unwrap_err();
        match err {
            CodecError::Range { value, index, bit_depth, .. } => {
                assert_eq!(value, 8);
                assert_eq!(index, 1);
                assert_eq!(bit_depth, 4);
            }
            other => panic!("expected range error, got {other}"),
        }
    }

    #[test]
    fn unsigned_rejects_negatives() {
        let m = Matrix::from_values(1, 1, 8, Signedness::Unsigned, vec![-1]).unwrap();
        assert!(matches!(codec().pack(&m), Err(CodecError::Range { .. })));
    }

    #[test]
    fn padding_bits_stay_zero() {
        // 10 cols at w8: 6 padding bits per row in every plane
        let m = Matrix::from_values(1, 10, 3, Signedness::Signed, vec![-4; 10]).unwrap();
        let packed = BitplaneCodec::new(WordSize::W8).pack(&m).unwrap();
        for (i, &w) in packed.words().iter().enumerate() {
            if i % 2 == 1 {
                assert_eq!(w & !0b11, 0, "padding dirty in word {i}: {w:#x}");
            }
        }
    }

    #[test]
    fn pack_transposed_swaps_layout() {
        let m = Matrix::from_values(2, 3, 4, Signedness::Signed, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let packed = codec().pack_transposed(&m).unwrap();
        assert_eq!(packed.geometry().rows(), 3);
        assert_eq!(packed.geometry().cols(), 2);
        assert_eq!(codec().unpack(&packed), m.transposed());
    }

    #[test]
    fn image_roundtrip_multichannel() {
        let values: Vec<i64> = (0..2 * 3 * 2).map(|i| i as i64 - 6).collect();
        let img = Image::from_values(2, 3, 2, 5, Signedness::Signed, values).unwrap();
        let packed = codec().pack_image(&img).unwrap();
        assert_eq!(codec().unpack_image(&packed), img);
    }

    #[test]
    fn image_packed_layout_is_channel_planar() {
        // pixel (0,1) channel 1 = 2 = 0b10: plane 1 of channel 1 only
        let img = Image::from_values(1, 2, 2, 3, Signedness::Signed, vec![0, 0, 0, 2]).unwrap();
        let packed = codec().pack_image(&img).unwrap();
        assert_eq!(packed.bit(1, 1, 0, 1), 1);
        assert_eq!(packed.bit(1, 0, 0, 1), 0);
        assert_eq!(packed.bit(0, 1, 0, 1), 0);
    }

    #[test]
    fn filter_taps_land_in_their_channel_patch() {
        let mut bank = FilterBank::zeroed(1, 2, 2, 3, Signedness::Signed).unwrap();
        bank.set(0, 1, 1, 0, 3); // 0b011 at patch bit 2 of channel 1
        let packed = codec().pack_filters(&bank).unwrap();
        assert_eq!(packed.bit(0, 0, 1, 1, 0), 1);
        assert_eq!(packed.bit(1, 0, 1, 1, 0), 1);
        assert_eq!(packed.bit(2, 0, 1, 1, 0), 0);
        assert_eq!(packed.bit(0, 0, 0, 1, 0), 0);
    }

    #[test]
    fn depth_one_signed_is_zero_or_minus_one() {
        let m = Matrix::from_values(1, 2, 1, Signedness::Signed, vec![0, -1]).unwrap();
        let packed = codec().pack(&m).unwrap();
        assert_eq!(packed.bit(0, 0, 0), 0);
        assert_eq!(packed.bit(0, 0, 1), 1);
        let back = codec().unpack(&packed);
        assert_eq!(back.values(), &[0, -1]);
    }
}
