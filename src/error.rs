//! Error types for dispatched tensor operations.
//!
//! Every failure is reported as-is to the caller: the dispatcher never
//! retries, falls back to another layout, or translates an error raised by a
//! default kernel into something else.

use crate::operand::Layout;
use crate::ops::Operator;
use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while dispatching or executing an operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The default kernel has no implementation for this combination of layouts.
    #[error("operator '{op}' is not supported for layouts {layouts:?}")]
    UnsupportedLayout {
        /// The operator being executed
        op: Operator,
        /// Layout of every operand, in argument order
        layouts: Vec<Layout>,
    },

    /// Operand shapes are incompatible.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// A sparse coordinate lies outside the tensor.
    #[error("index {index} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds {
        /// The dimension holding the bad coordinate
        dim: usize,
        /// The invalid coordinate
        index: usize,
        /// Size of that dimension
        size: usize,
    },

    /// The operator was called with the wrong number of operands.
    #[error("operator '{op}' takes {expected} operand(s), got {got}")]
    Arity {
        /// The operator being executed
        op: Operator,
        /// Number of operands the operator takes
        expected: usize,
        /// Number of operands supplied
        got: usize,
    },

    /// An option or operand is not meaningful for this operator.
    #[error("invalid argument for operator '{op}': {reason}")]
    InvalidArgument {
        /// The operator being executed
        op: Operator,
        /// Why the argument was rejected
        reason: String,
    },
}
