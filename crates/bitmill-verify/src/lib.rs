#![deny(unsafe_code)]
#![warn(clippy::all)]

//! Randomized parity sweeps.
//!
//! Each sweep draws operand pairs from a seeded [`XoshiroSource`], runs the
//! packed bit-serial path next to the plain integer reference, and counts
//! divergences. The verification binaries print the reports; the CLI calls
//! the same routines, so the two entry points cannot drift apart.

use bitmill_codec::{BitplaneCodec, Signedness};
use bitmill_engine::source::{filters_from, image_from, matrix_from};
use bitmill_engine::{
    convolve, convolve_packed, multiply, multiply_direct, Result, WindowExtractor, XoshiroSource,
};
use bitmill_layout::word::WordSize;

/// Bounds for one randomized GEMM sweep.
#[derive(Debug, Clone, Copy)]
pub struct GemmSweepConfig {
    /// Seed for the operand stream; equal seeds replay identical sweeps.
    pub seed: u64,
    /// Number of operand pairs to draw.
    pub cases: usize,
    /// Port width shared by both packed operands.
    pub word_size: WordSize,
    /// Inclusive upper bound on output rows and columns.
    pub max_dim: usize,
    /// Inclusive upper bound on the shared inner dimension.
    pub max_inner: usize,
    /// Inclusive upper bound on operand bit depth.
    pub max_bit_depth: usize,
}

impl GemmSweepConfig {
    /// Default bounds: outputs up to 6x6, inner dimension up to 80 so packed
    /// rows cross word boundaries at every port width, depths up to 8 bits.
    #[must_use]
    pub const fn new(seed: u64, cases: usize, word_size: WordSize) -> Self {
        Self {
            seed,
            cases,
            word_size,
            max_dim: 6,
            max_inner: 80,
            max_bit_depth: 8,
        }
    }
}

/// Bounds for one randomized convolution sweep.
///
/// Image sides are derived from the drawn step counts as
/// `(steps - 1) * stride + window`, so every drawn geometry tiles evenly.
#[derive(Debug, Clone, Copy)]
pub struct ConvSweepConfig {
    /// Seed for the operand stream.
    pub seed: u64,
    /// Number of image/filter pairs to draw.
    pub cases: usize,
    /// Port width for both packed operands.
    pub word_size: WordSize,
    /// Inclusive upper bound on the filter window side.
    pub max_window: usize,
    /// Inclusive upper bound on the stride.
    pub max_stride: usize,
    /// Inclusive upper bound on window steps per axis.
    pub max_steps: usize,
    /// Inclusive upper bound on input channels.
    pub max_channels: usize,
    /// Inclusive upper bound on output channels.
    pub max_out_channels: usize,
    /// Inclusive upper bound on operand bit depth.
    pub max_bit_depth: usize,
}

impl ConvSweepConfig {
    /// Default bounds: windows up to 3x3, strides up to 2, grids up to 3x3
    /// steps, up to 3 channels either side, depths up to 6 bits.
    #[must_use]
    pub const fn new(seed: u64, cases: usize, word_size: WordSize) -> Self {
        Self {
            seed,
            cases,
            word_size,
            max_window: 3,
            max_stride: 2,
            max_steps: 3,
            max_channels: 3,
            max_out_channels: 3,
            max_bit_depth: 6,
        }
    }
}

/// One divergent case, kept for the report.
#[derive(Debug, Clone)]
pub struct Mismatch {
    /// Zero-based index of the case within the sweep.
    pub case: usize,
    /// Operand geometry and the first bad cell, rendered for the operator.
    pub detail: String,
}

/// Outcome of a sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Cases actually run.
    pub cases: usize,
    /// Cases whose packed result differed from the reference.
    pub mismatches: usize,
    /// First divergent case, when any.
    pub first_mismatch: Option<Mismatch>,
}

impl SweepReport {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.mismatches == 0
    }

    fn record(&mut self, case: usize, detail: impl FnOnce() -> String) {
        self.mismatches += 1;
        if self.first_mismatch.is_none() {
            self.first_mismatch = Some(Mismatch {
                case,
                detail: detail(),
            });
        }
    }
}

fn empty_report() -> SweepReport {
    SweepReport {
        cases: 0,
        mismatches: 0,
        first_mismatch: None,
    }
}

fn draw_dim(src: &mut XoshiroSource, max: usize) -> usize {
    1 + src.next_below(max as u64) as usize
}

fn draw_signedness(src: &mut XoshiroSource) -> Signedness {
    if src.next_below(2) == 0 {
        Signedness::Signed
    } else {
        Signedness::Unsigned
    }
}

fn first_bad_index(got: &[i64], expected: &[i64]) -> usize {
    got.iter()
        .zip(expected)
        .position(|(g, e)| g != e)
        .unwrap_or(0)
}

/// Run a randomized GEMM sweep, packed path against `multiply_direct`.
///
/// # Errors
///
/// Returns an error only if operand construction or one of the engines
/// rejects a drawn case; mismatched results are reported, not errored.
pub fn run_gemm_sweep(config: &GemmSweepConfig) -> Result<SweepReport> {
    let codec = BitplaneCodec::new(config.word_size);
    let mut src = XoshiroSource::new(config.seed);
    let mut report = empty_report();

    for case in 0..config.cases {
        let rows = draw_dim(&mut src, config.max_dim);
        let inner = draw_dim(&mut src, config.max_inner);
        let cols = draw_dim(&mut src, config.max_dim);
        let lhs_depth = draw_dim(&mut src, config.max_bit_depth);
        let rhs_depth = draw_dim(&mut src, config.max_bit_depth);
        let lhs_sign = draw_signedness(&mut src);
        let rhs_sign = draw_signedness(&mut src);

        let a = matrix_from(&mut src, rows, inner, lhs_depth, lhs_sign)?;
        let b = matrix_from(&mut src, inner, cols, rhs_depth, rhs_sign)?;
        let expected = multiply_direct(&a, &b)?;
        let got = multiply(&codec.pack(&a)?, &codec.pack_transposed(&b)?)?;

        report.cases += 1;
        if got != expected {
            report.record(case, || {
                let idx = first_bad_index(got.values(), expected.values());
                let (i, j) = (idx / cols, idx % cols);
                format!(
                    "{rows}x{inner} ({lhs_depth}-bit {lhs_sign}) x {inner}x{cols} \
                     ({rhs_depth}-bit {rhs_sign}): cell ({i},{j}) packed {} vs direct {}",
                    got.get(i, j),
                    expected.get(i, j)
                )
            });
        }
    }
    Ok(report)
}

/// Run a randomized convolution sweep, `convolve_packed` against `convolve`.
///
/// # Errors
///
/// Returns an error only if operand construction or one of the engines
/// rejects a drawn case.
pub fn run_conv_sweep(config: &ConvSweepConfig) -> Result<SweepReport> {
    let codec = BitplaneCodec::new(config.word_size);
    let mut src = XoshiroSource::new(config.seed);
    let mut report = empty_report();

    for case in 0..config.cases {
        let window = draw_dim(&mut src, config.max_window);
        let stride = draw_dim(&mut src, config.max_stride);
        let height = (draw_dim(&mut src, config.max_steps) - 1) * stride + window;
        let width = (draw_dim(&mut src, config.max_steps) - 1) * stride + window;
        let channels = draw_dim(&mut src, config.max_channels);
        let out_channels = draw_dim(&mut src, config.max_out_channels);
        let image_depth = draw_dim(&mut src, config.max_bit_depth);
        let filter_depth = draw_dim(&mut src, config.max_bit_depth);
        let image_sign = draw_signedness(&mut src);
        let filter_sign = draw_signedness(&mut src);

        let image = image_from(&mut src, height, width, channels, image_depth, image_sign)?;
        let filters = filters_from(
            &mut src,
            out_channels,
            channels,
            window,
            filter_depth,
            filter_sign,
        )?;
        let expected = convolve(&image, &filters, stride)?;
        let got = convolve_packed(
            &codec.pack_image(&image)?,
            &codec.pack_filters(&filters)?,
            stride,
        )?;

        report.cases += 1;
        if got != expected {
            report.record(case, || {
                let idx = first_bad_index(got.values(), expected.values());
                let plane = expected.height() * expected.width();
                let (co, rem) = (idx / plane, idx % plane);
                let (y, x) = (rem / expected.width(), rem % expected.width());
                format!(
                    "{height}x{width}x{channels} ({image_depth}-bit {image_sign}) * \
                     {out_channels}x{channels}x{window}x{window} ({filter_depth}-bit \
                     {filter_sign}) stride {stride}: cell ({co},{y},{x}) packed {} vs direct {}",
                    got.get(co, y, x),
                    expected.get(co, y, x)
                )
            });
        }
    }
    Ok(report)
}

/// Check that single-pixel windows at stride 1 reproduce each random image
/// verbatim. This is the degenerate geometry the pixel-mode extractor is
/// pinned to.
///
/// # Errors
///
/// Returns an error only if operand construction or the extractor rejects a
/// drawn case.
pub fn run_window_identity_sweep(seed: u64, cases: usize) -> Result<SweepReport> {
    let mut src = XoshiroSource::new(seed);
    let extractor = WindowExtractor::new(1, 1);
    let mut report = empty_report();

    for case in 0..cases {
        let height = draw_dim(&mut src, 8);
        let width = draw_dim(&mut src, 8);
        let channels = draw_dim(&mut src, 4);
        let depth = draw_dim(&mut src, 8);
        let sign = draw_signedness(&mut src);

        let image = image_from(&mut src, height, width, channels, depth, sign)?;
        let windows = extractor.extract_pixels(&image)?;

        report.cases += 1;
        if windows.values() != image.values() {
            report.record(case, || {
                let idx = first_bad_index(windows.values(), image.values());
                format!(
                    "{height}x{width}x{channels} ({depth}-bit {sign}): flat index {idx} \
                     extracted {} vs stored {}",
                    windows.values()[idx],
                    image.values()[idx]
                )
            });
        }
    }
    Ok(report)
}
