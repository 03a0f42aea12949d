// SPDX-License-Identifier: AGPL-3.0-only

//! Sliding-window extraction.
//!
//! The accelerator convolves by first unrolling the image into a stack of
//! window rows, then running the same row-AND/popcount datapath it uses
//! for GEMM. Two extraction modes exist, matching the two buffer kinds the
//! device accepts:
//!
//! - **plane mode** ([`WindowExtractor::extract_planes`]): input is a
//!   bitplane-packed image; output rows are ordered plane-major, then
//!   window-major, each row the concatenation of every channel's padded
//!   `window²`-bit patch, directly consumable by the dot engine against a
//!   packed filter row of the same shape.
//! - **pixel mode** ([`WindowExtractor::extract_pixels`]): input is the
//!   raw channel-interleaved image; output is window-major pixel data with
//!   channels still interleaved. At `window = 1, stride = 1` this is the
//!   identity: the output buffer equals the input buffer.

use crate::error::{EngineError, Result};
use bitmill_codec::{Image, PackedImage, Signedness};
use bitmill_layout::geometry::WindowGrid;
use bitmill_layout::word::WordSize;
use bytes::Bytes;
use tracing::debug;

/// Sliding-window extractor for a fixed window/stride pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowExtractor {
    window: usize,
    stride: usize,
}

impl WindowExtractor {
    /// Create an extractor for `window × window` patches at `stride`.
    #[must_use]
    pub const fn new(window: usize, stride: usize) -> Self {
        Self { window, stride }
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

    fn check_grid(&self, grid: WindowGrid) -> Result<()> {
        if !grid.divides_evenly() {
            return Err(EngineError::window_mismatch(format!(
                "window {} / stride {} does not tile a {}x{} image",
                self.window,
                self.stride,
                grid.height(),
                grid.width()
            )));
        }
        Ok(())
    }

    /// Extract windows from a bitplane-packed image.
    ///
    /// Output row `(u, s, t)` holds, for every channel in order, the
    /// `window²` bits of plane `u` under the window at `(s·stride,
    /// t·stride)`, bit `(l, k)` of the patch at patch position
    /// `l·window + k`, each channel padded to whole words.
    ///
    /// # Errors
    ///
    /// Returns a window mismatch if the window/stride pair does not tile
    /// the image exactly.
    pub fn extract_planes(&self, image: &PackedImage) -> Result<WindowStack> {
        let grid = WindowGrid::new(
            image.height(),
            image.width(),
            image.channels(),
            self.window,
            self.stride,
        );
        self.check_grid(grid)?;

        debug!(
            windows = grid.window_count(),
            planes = image.bit_depth(),
            channels = image.channels(),
            "extracting packed windows"
        );

        let word_bits = image.word_size().bits();
        let patch_words = grid.patch_words(image.word_size());
        let words_per_row = image.channels() * patch_words;
        let mut stack = WindowStack {
            bit_depth: image.bit_depth(),
            steps_y: grid.steps_y(),
            steps_x: grid.steps_x(),
            channels: image.channels(),
            window: self.window,
            word_size: image.word_size(),
            signedness: image.signedness(),
            patch_words,
            words: vec![0; image.bit_depth() * grid.window_count() * words_per_row],
        };

        for u in 0..image.bit_depth() {
            for s in 0..grid.steps_y() {
                for t in 0..grid.steps_x() {
                    let row_start =
                        ((u * grid.steps_y() + s) * grid.steps_x() + t) * words_per_row;
                    for c in 0..image.channels() {
                        for l in 0..self.window {
                            for k in 0..self.window {
                                let bit =
                                    image.bit(c, u, s * self.stride + l, t * self.stride + k);
                                let patch_bit = l * self.window + k;
                                let idx =
                                    row_start + c * patch_words + patch_bit / word_bits;
                                stack.words[idx] |= bit << (patch_bit % word_bits);
                            }
                        }
                    }
                }
            }
        }
        Ok(stack)
    }

    /// Extract windows from a raw channel-interleaved image.
    ///
    /// Output ordering: windows row-major, pixels row-major within a
    /// window, channels interleaved per pixel. This is the image's own
    /// layout at window granularity, which makes the identity case exact.
    ///
    /// # Errors
    ///
    /// Returns a window mismatch if the window/stride pair does not tile
    /// the image exactly.
    pub fn extract_pixels(&self, image: &Image) -> Result<PixelWindows> {
        let grid = image.window_grid(self.window, self.stride);
        self.check_grid(grid)?;

        let mut values =
            vec![0i64; grid.window_count() * grid.patch_bits() * image.channels()];
        for s in 0..grid.steps_y() {
            for t in 0..grid.steps_x() {
                for i in 0..self.window {
                    for j in 0..self.window {
                        for c in 0..image.channels() {
                            let out = ((s * grid.steps_x() + t) * grid.patch_bits()
                                + i * self.window
                                + j)
                                * image.channels()
                                + c;
                            values[out] =
                                image.get(s * self.stride + i, t * self.stride + j, c);
                        }
                    }
                }
            }
        }
        Ok(PixelWindows {
            steps_y: grid.steps_y(),
            steps_x: grid.steps_x(),
            window: self.window,
            channels: image.channels(),
            values,
        })
    }
}

/// Plane-mode extraction result: one packed row per (plane, window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowStack {
    bit_depth: usize,
    steps_y: usize,
    steps_x: usize,
    channels: usize,
    window: usize,
    word_size: WordSize,
    signedness: Signedness,
    patch_words: usize,
    words: Vec<u64>,
}

impl WindowStack {
    /// Plane count carried over from the source image.
    pub fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// Window positions along the vertical axis.
    pub fn steps_y(&self) -> usize {
        self.steps_y
    }

    /// Window positions along the horizontal axis.
    pub fn steps_x(&self) -> usize {
        self.steps_x
    }

    /// Channel count carried over from the source image.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Window edge length in pixels.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Port width the rows are packed for.
    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// Top-plane interpretation carried over from the source image.
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// Words per single-channel patch.
    pub fn patch_words(&self) -> usize {
        self.patch_words
    }

    /// Words per stack row (all channels).
    pub fn words_per_row(&self) -> usize {
        self.channels * self.patch_words
    }

    /// All words, plane-major then window-major.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// The packed row for plane `u`, window `(s, t)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn row_words(&self, u: usize, s: usize, t: usize) -> &[u64] {
        assert!(u < self.bit_depth && s < self.steps_y && t < self.steps_x);
        let wpr = self.words_per_row();
        let start = ((u * self.steps_y + s) * self.steps_x + t) * wpr;
        &self.words[start..start + wpr]
    }

    /// Bit `(l, k)` of channel `c` in plane `u` under window `(s, t)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn bit(&self, u: usize, s: usize, t: usize, c: usize, l: usize, k: usize) -> u64 {
        assert!(c < self.channels && l < self.window && k < self.window);
        let patch_bit = l * self.window + k;
        let word = self.row_words(u, s, t)
            [c * self.patch_words + patch_bit / self.word_size.bits()];
        (word >> (patch_bit % self.word_size.bits())) & 1
    }

    /// Serialize to the device wire format, row order preserved.
    pub fn wire_bytes(&self) -> Bytes {
        let granule = self.word_size.bytes();
        let mut buf = Vec::with_capacity(self.words.len() * granule);
        for &w in &self.words {
            buf.extend_from_slice(&w.to_le_bytes()[..granule]);
        }
        Bytes::from(buf)
    }
}

/// Pixel-mode extraction result: window-major raw values, channels
/// interleaved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelWindows {
    steps_y: usize,
    steps_x: usize,
    window: usize,
    channels: usize,
    values: Vec<i64>,
}

impl PixelWindows {
    /// Window positions along the vertical axis.
    pub fn steps_y(&self) -> usize {
        self.steps_y
    }

    /// Window positions along the horizontal axis.
    pub fn steps_x(&self) -> usize {
        self.steps_x
    }

    /// Window edge length in pixels.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// All values, window-major, channels interleaved.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Value of channel `c` at patch pixel `(i, j)` under window `(s, t)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn get(&self, s: usize, t: usize, i: usize, j: usize, c: usize) -> i64 {
        assert!(
            s < self.steps_y
                && t < self.steps_x
                && i < self.window
                && j < self.window
                && c < self.channels
        );
        self.values[((s * self.steps_x + t) * self.window * self.window
            + i * self.window
            + j)
            * self.channels
            + c]
    }
}
