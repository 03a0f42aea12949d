//! Error types for packing and serialization

use crate::matrix::Signedness;
use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors that can occur while constructing operands, packing them, or
/// parsing wire buffers
#[derive(Debug, Error)]
pub enum CodecError {
    /// Operand geometry is unusable: zero dimension, depth outside the
    /// supported range, or a value buffer of the wrong length
    #[error("Invalid configuration: {reason}")]
    Configuration {
        /// Reason for rejection
        reason: String,
    },

    /// A value does not fit the declared bit depth. Packing refuses rather
    /// than truncating; a truncated operand would no longer model what the
    /// hardware receives.
    #[error("Value {value} at flat index {index} does not fit {signedness} bit depth {bit_depth}")]
    Range {
        /// Offending value
        value: i64,
        /// Flat row-major index of the value
        index: usize,
        /// Declared plane count
        bit_depth: usize,
        /// Declared interpretation of the top plane
        signedness: Signedness,
    },

    /// A wire buffer cannot be parsed back into a packed operand
    #[error("Wire format error: {reason}")]
    Wire {
        /// Reason for rejection
        reason: String,
    },
}

impl CodecError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a wire format error
    pub fn wire(reason: impl Into<String>) -> Self {
        Self::Wire {
            reason: reason.into(),
        }
    }
}
