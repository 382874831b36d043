//! Sparse output mode.
//!
//! [`SparseOutputMode`] intercepts element-wise multiplication: it runs the
//! default product and hands back the result in the sparse coordinate layout.
//! Every other operator passes through to the default path untouched.
//!
//! The rule is a placeholder policy. Computing the full dense product and
//! sparsifying it afterwards costs as much as the dense product itself, and
//! it is deliberately not applied to any other operator.
//!
//! Gradients do not flow through the sparse result yet: the backward pass of
//! `mul` multiplies the (sparse) incoming gradient with a dense input, and the
//! default kernels reject that layout combination.
//!
//! ```rust
//! use sparse_output::{ops, sparse_output, tensor, Operand};
//!
//! let x: Operand = tensor!([1.0, 2.0, 3.0]).into();
//! let y: Operand = tensor!([4.0, 5.0, 6.0]).into();
//! let (dx, dy) = (ops::diag(&x).unwrap(), ops::diag(&y).unwrap());
//!
//! let r = sparse_output(|| ops::mul(&dx, &dy)).unwrap();
//! let coo = r.as_sparse().unwrap();
//! assert_eq!(coo.indices(), &[vec![0, 1, 2], vec![0, 1, 2]]);
//! assert_eq!(coo.values(), &[4.0, 10.0, 18.0]);
//! ```

use crate::error::Result;
use crate::operand::Operand;
use crate::ops::dispatch::{DispatchMode, default_dispatch, enable_mode};
use crate::ops::{OpOptions, Operator};
use std::rc::Rc;

/// Dispatch mode returning products as sparse COO tensors.
///
/// It carries no state and cannot be built outside this crate; it only
/// exists on the mode stack while [`sparse_output`] or
/// [`sparse_output_call`] runs.
///
/// ```compile_fail
/// let mode = sparse_output::SparseOutputMode { _private: () };
/// ```
#[derive(Debug)]
pub struct SparseOutputMode {
    _private: (),
}

impl SparseOutputMode {
    const fn new() -> Self {
        Self { _private: () }
    }
}

impl DispatchMode for SparseOutputMode {
    fn dispatch(&self, op: Operator, args: &[Operand], options: &OpOptions) -> Result<Operand> {
        if op == Operator::Mul {
            let product = default_dispatch(op, args, options)?;
            log::debug!("sparsifying {op} result of shape {:?}", product.shape());
            return default_dispatch(Operator::ToSparse, &[product], &OpOptions::default());
        }

        default_dispatch(op, args, options)
    }

    fn name(&self) -> &'static str {
        "sparse_output"
    }
}

/// Runs `f` with [`SparseOutputMode`] enabled and returns its result.
///
/// Every operator invoked while `f` runs on this thread goes through the
/// mode. It is disabled again before this function returns, also when `f`
/// returns early with an error or panics.
pub fn sparse_output<R>(f: impl FnOnce() -> R) -> R {
    let _guard = enable_mode(Rc::new(SparseOutputMode::new()));
    f()
}

/// Calls `op` on `args` with [`SparseOutputMode`] enabled.
///
/// # Errors
/// Whatever the operator reports; see [`default_dispatch`].
pub fn sparse_output_call(op: Operator, args: &[Operand], options: &OpOptions) -> Result<Operand> {
    sparse_output(|| crate::ops::dispatch::call(op, args, options))
}
