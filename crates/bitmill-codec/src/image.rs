//! Multi-channel images and filter banks.
//!
//! The logical [`Image`] is channel-interleaved (HWC): pixel `(y, x)`
//! stores its `channels` values contiguously. The packed form produced by
//! the codec is channel-major planar; the interleaving only exists on the
//! host side, where it makes the raw window extractor a straight copy.
//!
//! A [`FilterBank`] holds `out_channels × in_channels` square filters that
//! pack with the same plane scheme at their own depth.

use crate::error::{CodecError, Result};
use crate::matrix::{check_depth, Signedness};
use bitmill_layout::geometry::WindowGrid;

/// Channel-interleaved integer image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    height: usize,
    width: usize,
    channels: usize,
    bit_depth: usize,
    signedness: Signedness,
    values: Vec<i64>,
}

impl Image {
    /// Create a zero image.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero dimensions or a depth outside
    /// the supported range.
    pub fn zeroed(
        height: usize,
        width: usize,
        channels: usize,
        bit_depth: usize,
        signedness: Signedness,
    ) -> Result<Self> {
        validate_image_dims(height, width, channels, bit_depth)?;
        Ok(Self {
            height,
            width,
            channels,
            bit_depth,
            signedness,
            values: vec![0; height * width * channels],
        })
    }

    /// Create an image from channel-interleaved values: index
    /// `(y * width + x) * channels + c`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero dimensions, a depth outside
    /// the supported range, or a buffer of the wrong length.
    pub fn from_values(
        height: usize,
        width: usize,
        channels: usize,
        bit_depth: usize,
        signedness: Signedness,
        values: Vec<i64>,
    ) -> Result<Self> {
        validate_image_dims(height, width, channels, bit_depth)?;
        if values.len() != height * width * channels {
            return Err(CodecError::configuration(format!(
                "image buffer holds {} entries, expected {height}x{width}x{channels}={}",
                values.len(),
                height * width * channels
            )));
        }
        Ok(Self { height, width, channels, bit_depth, signedness, values })
    }

    pub(crate) fn from_raw_parts(
        height: usize,
        width: usize,
        channels: usize,
        bit_depth: usize,
        signedness: Signedness,
        values: Vec<i64>,
    ) -> Self {
        debug_assert_eq!(values.len(), height * width * channels);
        Self { height, width, channels, bit_depth, signedness, values }
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Declared plane count.
    pub fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// Declared top-plane interpretation.
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// Channel-interleaved values.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Value of channel `c` at pixel `(y, x)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn get(&self, y: usize, x: usize, c: usize) -> i64 {
        assert!(
            y < self.height && x < self.width && c < self.channels,
            "pixel ({y},{x},{c}) out of {}x{}x{}",
            self.height,
            self.width,
            self.channels
        );
        self.values[(y * self.width + x) * self.channels + c]
    }

    /// Set channel `c` at pixel `(y, x)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn set(&mut self, y: usize, x: usize, c: usize, value: i64) {
        assert!(
            y < self.height && x < self.width && c < self.channels,
            "pixel ({y},{x},{c}) out of {}x{}x{}",
            self.height,
            self.width,
            self.channels
        );
        self.values[(y * self.width + x) * self.channels + c] = value;
    }

    /// Window tiling of this image for a `window`/`stride` pair.
    pub fn window_grid(&self, window: usize, stride: usize) -> WindowGrid {
        WindowGrid::new(self.height, self.width, self.channels, window, stride)
    }
}

/// Bank of square filters, `out_channels × in_channels × window × window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBank {
    out_channels: usize,
    in_channels: usize,
    window: usize,
    bit_depth: usize,
    signedness: Signedness,
    values: Vec<i64>,
}

impl FilterBank {
    /// Create a zero filter bank.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero dimensions or a depth outside
    /// the supported range.
    pub fn zeroed(
        out_channels: usize,
        in_channels: usize,
        window: usize,
        bit_depth: usize,
        signedness: Signedness,
    ) -> Result<Self> {
        validate_filter_dims(out_channels, in_channels, window, bit_depth)?;
        Ok(Self {
            out_channels,
            in_channels,
            window,
            bit_depth,
            signedness,
            values: vec![0; out_channels * in_channels * window * window],
        })
    }

    /// Create a bank from values ordered output-channel-major: index
    /// `((co * in_channels + ci) * window + i) * window + j`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero dimensions, a depth outside
    /// the supported range, or a buffer of the wrong length.
    pub fn from_values(
        out_channels: usize,
        in_channels: usize,
        window: usize,
        bit_depth: usize,
        signedness: Signedness,
        values: Vec<i64>,
    ) -> Result<Self> {
        validate_filter_dims(out_channels, in_channels, window, bit_depth)?;
        let expected = out_channels * in_channels * window * window;
        if values.len() != expected {
            return Err(CodecError::configuration(format!(
                "filter buffer holds {} entries, expected {out_channels}x{in_channels}x{window}x{window}={expected}",
                values.len()
            )));
        }
        Ok(Self { out_channels, in_channels, window, bit_depth, signedness, values })
    }

    /// Output channel count.
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Input channel count.
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Filter edge length in pixels.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Declared plane count.
    pub fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// Declared top-plane interpretation.
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// Raw values in output-channel-major order.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Filter tap `(i, j)` of filter `(co, ci)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn get(&self, co: usize, ci: usize, i: usize, j: usize) -> i64 {
        assert!(
            co < self.out_channels && ci < self.in_channels && i < self.window && j < self.window,
            "tap ({co},{ci},{i},{j}) out of {}x{}x{}x{}",
            self.out_channels,
            self.in_channels,
            self.window,
            self.window
        );
        self.values[((co * self.in_channels + ci) * self.window + i) * self.window + j]
    }

    /// Set filter tap `(i, j)` of filter `(co, ci)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn set(&mut self, co: usize, ci: usize, i: usize, j: usize, value: i64) {
        assert!(
            co < self.out_channels && ci < self.in_channels && i < self.window && j < self.window,
            "tap ({co},{ci},{i},{j}) out of {}x{}x{}x{}",
            self.out_channels,
            self.in_channels,
            self.window,
            self.window
        );
        self.values[((co * self.in_channels + ci) * self.window + i) * self.window + j] = value;
    }
}

fn validate_image_dims(height: usize, width: usize, channels: usize, bit_depth: usize) -> Result<()> {
    if height == 0 || width == 0 || channels == 0 {
        return Err(CodecError::configuration(format!(
            "image dimensions must be non-zero, got {height}x{width}x{channels}"
        )));
    }
    check_depth(bit_depth)
}

fn validate_filter_dims(out_channels: usize, in_channels: usize, window: usize, bit_depth: usize) -> Result<()> {
    if out_channels == 0 || in_channels == 0 || window == 0 {
        return Err(CodecError::configuration(format!(
            "filter dimensions must be non-zero, got {out_channels}x{in_channels}, window {window}"
        )));
    }
    check_depth(bit_depth)
}
