//! Convolution reference.
//!
//! Two paths compute the same multi-channel correlation (no filter flip):
//! a direct integer loop over the logical image, and the packed pipeline
//! the accelerator actually runs, window extraction followed by the
//! bit-serial plane-pair accumulation with one AND/popcount per (image
//! plane, filter plane, output cell). The two must agree exactly; the
//! direct path is the ground truth the packed path and the silicon are
//! diffed against.

use crate::dot::{and_popcount, plane_sign};
use crate::error::{EngineError, Result};
use crate::window::WindowExtractor;
use bitmill_codec::{FilterBank, Image, PackedFilters, PackedImage};
use tracing::debug;

/// Channel-major output volume of a convolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMap {
    out_channels: usize,
    height: usize,
    width: usize,
    values: Vec<i64>,
}

impl FeatureMap {
    fn zeroed(out_channels: usize, height: usize, width: usize) -> Self {
        Self {
            out_channels,
            height,
            width,
            values: vec![0; out_channels * height * width],
        }
    }

    /// Output channel count.
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Output height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Output width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Channel-major values: channel `co` occupies one contiguous
    /// `height × width` plane.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Value of output channel `co` at `(y, x)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn get(&self, co: usize, y: usize, x: usize) -> i64 {
        assert!(co < self.out_channels && y < self.height && x < self.width);
        self.values[(co * self.height + y) * self.width + x]
    }
}

/// Direct integer convolution over logical operands.
///
/// `out[co, s, t] = Σ_ci Σ_{k,l} filter[co, ci, k, l] · image[s·stride+k,
/// t·stride+l, ci]`. A correlation, matching the datapath (no filter
/// flip).
///
/// # Errors
///
/// Returns a shape mismatch if the filter bank's input channel count does
/// not equal the image's channel count, or a window mismatch if the
/// filter window and stride do not tile the image.
pub fn convolve(image: &Image, filters: &FilterBank, stride: usize) -> Result<FeatureMap> {
    check_channels(image.channels(), filters.in_channels())?;
    let grid = image.window_grid(filters.window(), stride);
    if !grid.divides_evenly() {
        return Err(EngineError::window_mismatch(format!(
            "filter window {} / stride {stride} does not tile a {}x{} image",
            filters.window(),
            image.height(),
            image.width()
        )));
    }

    let mut out = FeatureMap::zeroed(filters.out_channels(), grid.steps_y(), grid.steps_x());
    for co in 0..filters.out_channels() {
        for s in 0..grid.steps_y() {
            for t in 0..grid.steps_x() {
                let mut acc = 0i64;
                for ci in 0..image.channels() {
                    for k in 0..filters.window() {
                        for l in 0..filters.window() {
                            acc += filters.get(co, ci, k, l)
                                * image.get(s * stride + k, t * stride + l, ci);
                        }
                    }
                }
                out.values[(co * grid.steps_y() + s) * grid.steps_x() + t] = acc;
            }
        }
    }
    Ok(out)
}

/// Convolution through the packed pipeline: window extraction plus
/// bit-serial plane-pair accumulation.
///
/// Produces exactly the same numbers as [`convolve`] on the corresponding
/// logical operands.
///
/// # Errors
///
/// Returns a word-size mismatch if image and filters were packed for
/// different port widths, a shape mismatch on channel disagreement, or a
/// window mismatch if the filter window and stride do not tile the image.
pub fn convolve_packed(
    image: &PackedImage,
    filters: &PackedFilters,
    stride: usize,
) -> Result<FeatureMap> {
    if image.word_size() != filters.word_size() {
        return Err(EngineError::WordSizeMismatch {
            lhs: image.word_size().bits(),
            rhs: filters.word_size().bits(),
        });
    }
    check_channels(image.channels(), filters.in_channels())?;

    let stack = WindowExtractor::new(filters.window(), stride).extract_planes(image)?;
    debug_assert_eq!(stack.patch_words(), filters.patch_words());

    debug!(
        out_channels = filters.out_channels(),
        windows = stack.steps_y() * stack.steps_x(),
        image_depth = image.bit_depth(),
        filter_depth = filters.bit_depth(),
        "packed convolution"
    );

    let mut out = FeatureMap::zeroed(filters.out_channels(), stack.steps_y(), stack.steps_x());
    for u in 0..image.bit_depth() {
        let sign_img = plane_sign(image.signedness(), u, image.bit_depth());
        for d in 0..filters.bit_depth() {
            let sign_flt = plane_sign(filters.signedness(), d, filters.bit_depth());
            let alpha = (1i64 << (u + d)) * sign_img * sign_flt;
            for co in 0..filters.out_channels() {
                let filter_row = filters.row_words(d, co);
                for s in 0..stack.steps_y() {
                    for t in 0..stack.steps_x() {
                        let window_row = stack.row_words(u, s, t);
                        out.values[(co * stack.steps_y() + s) * stack.steps_x() + t] +=
                            alpha * and_popcount(window_row, filter_row);
                    }
                }
            }
        }
    }
    Ok(out)
}

fn check_channels(image_channels: usize, filter_in_channels: usize) -> Result<()> {
    if image_channels != filter_in_channels {
        return Err(EngineError::shape_mismatch(format!(
            "image has {image_channels} channels, filters expect {filter_in_channels}"
        )));
    }
    Ok(())
}
