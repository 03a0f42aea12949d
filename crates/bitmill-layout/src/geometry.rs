//! Packed buffer geometry.
//!
//! Two layout questions come up everywhere in the stack and both are
//! answered here, with no operand data in sight:
//!
//! 1. where does bit `(plane, row, col)` of a packed matrix live, and how
//!    large is the whole buffer ([`PlaneGeometry`]);
//! 2. how many windows does a stride/window combination produce over an
//!    image, and does it tile evenly ([`WindowGrid`]).

use crate::word::WordSize;

/// Layout of one bitplane-packed matrix.
///
/// A `rows × cols` matrix at `bit_depth` planes is stored plane-major:
/// plane 0 (LSB) first, the sign-carrying MSB plane last. Within a plane,
/// rows are laid out in order, each padded to a whole number of words.
/// Bit `j` of a row sits at bit `j mod word` of word `j div word`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneGeometry {
    rows: usize,
    cols: usize,
    bit_depth: usize,
    word_size: WordSize,
}

impl PlaneGeometry {
    /// Describe a `rows × cols` matrix at `bit_depth` planes.
    ///
    /// This is pure layout arithmetic; dimension validation (non-zero rows,
    /// depth within budget) happens where operands are constructed.
    #[must_use]
    pub const fn new(rows: usize, cols: usize, bit_depth: usize, word_size: WordSize) -> Self {
        Self { rows, cols, bit_depth, word_size }
    }

    /// Matrix row count.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Matrix column count (bits per row before padding).
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of bitplanes.
    #[must_use]
    pub const fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// Port width the buffer is packed for.
    #[must_use]
    pub const fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// Words per padded row.
    #[must_use]
    pub const fn words_per_row(&self) -> usize {
        self.word_size.words_for_bits(self.cols)
    }

    /// Trailing zero bits in the last word of each row.
    #[must_use]
    pub const fn padding_bits(&self) -> usize {
        self.words_per_row() * self.word_size.bits() - self.cols
    }

    /// Words in one full bitplane.
    #[must_use]
    pub const fn words_per_plane(&self) -> usize {
        self.rows * self.words_per_row()
    }

    /// Words in the whole packed matrix, all planes.
    #[must_use]
    pub const fn total_words(&self) -> usize {
        self.bit_depth * self.words_per_plane()
    }

    /// Serialized size in bytes (each word travels as `word_size.bytes()`
    /// little-endian bytes).
    #[must_use]
    pub const fn wire_bytes(&self) -> usize {
        self.total_words() * self.word_size.bytes()
    }

    /// Flat index of the word holding column `col` of `row` in `plane`.
    #[must_use]
    pub const fn word_index(&self, plane: usize, row: usize, col: usize) -> usize {
        (plane * self.rows + row) * self.words_per_row() + col / self.word_size.bits()
    }

    /// Bit position of column `col` within its word.
    #[must_use]
    pub const fn bit_offset(&self, col: usize) -> usize {
        col % self.word_size.bits()
    }
}

/// Sliding-window tiling of an image.
///
/// The extractor slides a `window × window` patch across a
/// `height × width × channels` image at a fixed stride. The accelerator
/// requires the stride to tile the image exactly; [`Self::divides_evenly`]
/// is that precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGrid {
    height: usize,
    width: usize,
    channels: usize,
    window: usize,
    stride: usize,
}

impl WindowGrid {
    /// Describe a window sweep over a `height × width × channels` image.
    #[must_use]
    pub const fn new(height: usize, width: usize, channels: usize, window: usize, stride: usize) -> Self {
        Self { height, width, channels, window, stride }
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Channel count.
    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Window edge length in pixels.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Stride between window origins, in pixels.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Whether the window fits the image and the stride tiles both axes
    /// exactly. Extraction refuses to run when this is false.
    #[must_use]
    pub const fn divides_evenly(&self) -> bool {
        self.window >= 1
            && self.stride >= 1
            && self.window <= self.height
            && self.window <= self.width
            && (self.height - self.window) % self.stride == 0
            && (self.width - self.window) % self.stride == 0
    }

    /// Window positions along the vertical axis.
    #[must_use]
    pub const fn steps_y(&self) -> usize {
        (self.height - self.window) / self.stride + 1
    }

    /// Window positions along the horizontal axis.
    #[must_use]
    pub const fn steps_x(&self) -> usize {
        (self.width - self.window) / self.stride + 1
    }

    /// Total window count (one output pixel each).
    #[must_use]
    pub const fn window_count(&self) -> usize {
        self.steps_y() * self.steps_x()
    }

    /// Bits in one single-channel window patch.
    #[must_use]
    pub const fn patch_bits(&self) -> usize {
        self.window * self.window
    }

    /// Words one single-channel patch occupies once padded to `word_size`.
    #[must_use]
    pub const fn patch_words(&self, word_size: WordSize) -> usize {
        word_size.words_for_bits(self.patch_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_padding_and_word_counts() {
        let g = PlaneGeometry::new(3, 65, 4, WordSize::W64);
        assert_eq!(g.words_per_row(), 2);
        assert_eq!(g.padding_bits(), 63);
        assert_eq!(g.words_per_plane(), 6);
        assert_eq!(g.total_words(), 24);
        assert_eq!(g.wire_bytes(), 24 * 8);
    }

    #[test]
    fn exact_multiple_has_no_padding() {
        let g = PlaneGeometry::new(2, 64, 1, WordSize::W64);
        assert_eq!(g.words_per_row(), 1);
        assert_eq!(g.padding_bits(), 0);
    }

    #[test]
    fn word_index_walks_planes_then_rows() {
        let g = PlaneGeometry::new(2, 70, 3, WordSize::W64);
        // plane 0, row 0 starts at word 0; col 69 is in the second word
        assert_eq!(g.word_index(0, 0, 69), 1);
        assert_eq!(g.bit_offset(69), 5);
        // plane 1 starts after 2 rows × 2 words
        assert_eq!(g.word_index(1, 0, 0), 4);
        assert_eq!(g.word_index(2, 1, 64), 11);
    }

    #[test]
    fn narrow_port_packs_more_words() {
        let g = PlaneGeometry::new(1, 9, 1, WordSize::W8);
        assert_eq!(g.words_per_row(), 2);
        assert_eq!(g.padding_bits(), 7);
        assert_eq!(g.wire_bytes(), 2);
    }

    #[test]
    fn window_grid_step_counts() {
        let g = WindowGrid::new(5, 7, 2, 3, 2);
        assert!(g.divides_evenly());
        assert_eq!(g.steps_y(), 2);
        assert_eq!(g.steps_x(), 3);
        assert_eq!(g.window_count(), 6);
    }

    #[test]
    fn uneven_stride_is_rejected() {
        let g = WindowGrid::new(6, 6, 1, 3, 2);
        assert!(!g.divides_evenly());
    }

    #[test]
    fn oversized_window_is_rejected() {
        let g = WindowGrid::new(2, 2, 1, 3, 1);
        assert!(!g.divides_evenly());
    }

    #[test]
    fn identity_grid_covers_every_pixel() {
        let g = WindowGrid::new(4, 5, 3, 1, 1);
        assert!(g.divides_evenly());
        assert_eq!(g.window_count(), 20);
        assert_eq!(g.patch_bits(), 1);
        assert_eq!(g.patch_words(WordSize::W64), 1);
    }
}
