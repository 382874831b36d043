//! sparse_output: an operator-dispatch mode that returns products as sparse tensors.
//!
//! Every tensor operator in this crate goes through a small dispatcher. A
//! [`DispatchMode`](ops::dispatch::DispatchMode) enabled on the current
//! thread sees each call before the default CPU kernels do and may change
//! what comes back. [`SparseOutputMode`] is one such mode: it lets
//! element-wise multiplication run as usual and converts the dense product
//! into the sparse coordinate layout.
//!
//! # Features
//!
//! - Dense row-major tensors and sparse COO tensors behind one [`Operand`] type.
//! - A fixed operator set with serial and rayon-parallel CPU kernels.
//! - Thread-local, guard-scoped dispatch modes.
//! - Minimal autograd, enough to show where sparse results stop being differentiable.
//!
//! # Modules
//!
//! - [`tensors`]: Dense tensor storage and the `tensor!` macro.
//! - [`sparse`]: COO tensors, conversion to and from dense.
//! - [`ops`]: Operators, the dispatcher, and the CPU kernels.
//! - [`sparse_mode`]: The sparse output mode and its entry points.
//! - [`backprop`]: Differentiable product and sum.
//! - [`approx`]: Layout-agnostic approximate equality.
//! - [`backend`]: Serial or parallel kernel execution.
//!
//! # Example
//!
//! ```rust
//! use sparse_output::{ops, sparse_output, tensor, Operand};
//!
//! let a: Operand = tensor!([[1.0, 0.0], [0.0, 2.0]]).into();
//! let b: Operand = tensor!([[3.0, 5.0], [0.0, 4.0]]).into();
//!
//! let product = sparse_output(|| ops::mul(&a, &b)).unwrap();
//! assert!(product.is_sparse());
//! assert_eq!(product.to_dense(), tensor!([[3.0, 0.0], [0.0, 8.0]]));
//!
//! // outside the closure, products are dense again
//! assert!(!ops::mul(&a, &b).unwrap().is_sparse());
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::many_single_char_names,
    clippy::cast_precision_loss,
    clippy::similar_names,
    clippy::module_name_repetitions
)]
#![deny(unsafe_code)]

pub mod approx;
pub mod backend;
pub mod backprop;
pub mod error;
pub mod operand;
pub mod ops;
pub mod sparse;
pub mod sparse_mode;
pub mod tensors;

pub use error::{Error, Result};
pub use operand::{Layout, Operand};
pub use sparse_mode::{SparseOutputMode, sparse_output, sparse_output_call};
