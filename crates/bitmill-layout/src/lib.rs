//! Memory layout model for the bitmill bit-serial datapath.
//!
//! This crate has **no dependencies** and **no hardware access**: it is a
//! pure model of the accelerator's memory geometry, covering datapath word widths,
//! bitplane buffer layout, and sliding-window grids. Everything that touches
//! actual operand data lives in `bitmill-codec` and `bitmill-engine`; this
//! crate only answers "how many words, and where does bit (i, j) land".
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`word`] | [`word::WordSize`], the datapath word width (8/16/32/64 bits) |
//! | [`geometry`] | [`geometry::PlaneGeometry`] (packed matrix layout), [`geometry::WindowGrid`] (stride/window tiling) |
//! | [`limits`] | Depth and accumulator budgets the reference arithmetic relies on |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geometry;
pub mod limits;
pub mod word;

pub use geometry::{PlaneGeometry, WindowGrid};
pub use word::WordSize;
