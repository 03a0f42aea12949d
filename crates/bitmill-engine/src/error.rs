//! Error types for the reference engines

use bitmill_codec::CodecError;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while running the reference arithmetic
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operand shapes cannot be combined
    #[error("Shape mismatch: {reason}")]
    ShapeMismatch {
        /// Reason for rejection
        reason: String,
    },

    /// The two operands were packed for different port widths
    #[error("Word size mismatch: lhs packed for {lhs} bits, rhs for {rhs} bits")]
    WordSizeMismatch {
        /// Left operand port width in bits
        lhs: usize,
        /// Right operand port width in bits
        rhs: usize,
    },

    /// Window and stride do not tile the image
    #[error("Window geometry mismatch: {reason}")]
    WindowMismatch {
        /// Reason for rejection
        reason: String,
    },

    /// Packing failed inside a composed pipeline
    #[error("Codec error: {source}")]
    Codec {
        /// Underlying codec error
        #[from]
        source: CodecError,
    },
}

impl EngineError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            reason: reason.into(),
        }
    }

    /// Create a window geometry error
    pub fn window_mismatch(reason: impl Into<String>) -> Self {
        Self::WindowMismatch {
            reason: reason.into(),
        }
    }
}
