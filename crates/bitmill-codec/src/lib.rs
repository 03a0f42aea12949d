#![deny(unsafe_code)]

//! Bitplane packing codec for the bitmill accelerator.
//!
//! The accelerator computes on **bitplanes**: a signed integer operand is
//! sliced into single-bit matrices (plane `d` = bit `d` of every element,
//! two's-complement) and each plane's rows are packed into machine words at
//! the datapath port width. This crate owns that transformation in both
//! directions, for all three operand shapes the device accepts:
//!
//! - matrices ([`Matrix`] ⇄ [`PackedMatrix`]), with the right-hand operand
//!   packed transposed so both sides present the shared inner dimension as
//!   packed rows;
//! - multi-channel images ([`Image`] → [`PackedImage`]), channel-major;
//! - filter banks ([`FilterBank`] → [`PackedFilters`]), plane-major with
//!   per-input-channel padded tap patches.
//!
//! Packed buffers serialize verbatim to the device wire format
//! (little-endian words at the port granule); see [`PackedMatrix::wire_bytes`].
//!
//! # Example
//!
//! ```
//! use bitmill_codec::{BitplaneCodec, Matrix, Signedness};
//! use bitmill_layout::word::WordSize;
//!
//! # fn main() -> bitmill_codec::Result<()> {
//! let m = Matrix::from_values(1, 3, 8, Signedness::Signed, vec![-1, 2, 2])?;
//! let codec = BitplaneCodec::new(WordSize::W64);
//! let packed = codec.pack(&m)?;
//! assert_eq!(codec.unpack(&packed), m);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]

mod codec;
mod error;
mod image;
mod matrix;
mod packed;

pub use codec::BitplaneCodec;
pub use error::{CodecError, Result};
pub use image::{FilterBank, Image};
pub use matrix::{Matrix, Signedness};
pub use packed::{PackedFilters, PackedImage, PackedMatrix};

/// Port width, re-exported from the layout model for downstream crates.
pub use bitmill_layout::word::WordSize;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        BitplaneCodec, CodecError, FilterBank, Image, Matrix, PackedMatrix, Result, Signedness,
        WordSize,
    };
}
