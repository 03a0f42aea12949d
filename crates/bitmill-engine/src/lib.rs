//! Reference arithmetic for the bitmill bit-serial accelerator.
//!
//! Everything the device computes, recomputed exactly on the host from the
//! same packed buffers, so device output can be diffed bit for bit:
//!
//! ```text
//! logical operands ──codec──▶ packed planes ──┐
//!                                             ├─▶ multiply / convolve_packed ─▶ exact ints
//! logical operands ──────────────────────────▶┴─▶ multiply_direct / convolve ─▶ exact ints
//! ```
//!
//! The two columns must agree on every cell; any divergence is a bug in
//! the packing, the datapath model, or the silicon.
//!
//! # Quick start
//!
//! ```
//! use bitmill_codec::{BitplaneCodec, Matrix, Signedness, WordSize};
//! use bitmill_engine::{multiply, multiply_direct};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let w = Matrix::from_values(3, 3, 8, Signedness::Signed,
//!     vec![-1, 2, 2, -1, 2, 2, -1, 2, 2])?;
//! let a = Matrix::from_values(3, 1, 8, Signedness::Signed, vec![-1, 2, 2])?;
//!
//! let codec = BitplaneCodec::new(WordSize::W64);
//! let product = multiply(&codec.pack(&w)?, &codec.pack_transposed(&a)?)?;
//! assert_eq!(product.values(), &[9, 9, 9]);
//! assert_eq!(product, multiply_direct(&w, &a)?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

mod conv;
mod dot;
mod error;
pub mod source;
mod window;

pub use conv::{convolve, convolve_packed, FeatureMap};
pub use dot::{and_popcount, multiply, multiply_direct, ProductMatrix};
pub use error::{EngineError, Result};
pub use source::{OperandSource, RampSource, XoshiroSource};
pub use window::{PixelWindows, WindowExtractor, WindowStack};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        convolve, convolve_packed, multiply, multiply_direct, EngineError, FeatureMap,
        OperandSource, ProductMatrix, Result, WindowExtractor, XoshiroSource,
    };
}
