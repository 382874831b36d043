//! Differentiable operations and autograd utilities.
//!
//! # Backpropagation Primitives
//!
//! Just enough autograd to follow a product through an active dispatch mode
//! and back out again.
//!
//! ## Autograd Pattern
//!
//! Each operation follows the same pattern:
//! 1. **Inputs** are references to `WithGrad<Ten64>` (or operands for reductions).
//! 2. **Forward Pass** computes an output [`Operand`] through the dispatcher,
//!    so an active mode may change its layout.
//! 3. **Backward Pass** returns a closure capturing cloned inputs; it also
//!    runs through the dispatcher and reports layout errors instead of panicking.
//! 4. **Gradient Application** folds results into `WithGrad::grad` with [`accumulate`].
//!
//! ## Sparse Results
//!
//! A sparse forward result produces a sparse incoming gradient. Feeding that
//! into the backward pass of [`mul`] asks for a sparse × dense product, which
//! the default kernels do not support, so the call fails with
//! [`crate::error::Error::UnsupportedLayout`].

use crate::error::Result;
use crate::operand::Operand;
use crate::ops;
use crate::tensors::{Ten64, Tensor, WithGrad};

/// Backward closure of a binary operation: `dL/dout` to `(dL/da, dL/db)`.
pub type FnToDoubleOperand = dyn Fn(&Operand) -> Result<(Operand, Operand)>;

/// Backward closure of a reduction: `dL/dout` to `dL/dinput`.
pub type FnF64Operand = dyn Fn(f64) -> Operand;

/// Element-wise product with autograd support.
///
/// # Returns
/// - `out`: `a * b`, in whatever layout the active dispatch path produced.
/// - `back`: Closure mapping `dL/d(out)` to `(dL/da, dL/db) = (g * b, g * a)`.
///
/// # Errors
/// Shape mismatches between `a` and `b`.
///
/// # Example
/// ```rust
/// use sparse_output::{backprop, tensor, tensors::WithGrad, Operand};
///
/// let a = WithGrad::new(tensor!([2.0, 3.0]));
/// let b = WithGrad::new(tensor!([4.0, 5.0]));
/// let (out, back) = backprop::mul(&a, &b).unwrap();
/// assert_eq!(out, Operand::Dense(tensor!([8.0, 15.0])));
///
/// let (da, db) = back(&tensor!([1.0, 1.0]).into()).unwrap();
/// assert_eq!(da, Operand::Dense(tensor!([4.0, 5.0])));
/// assert_eq!(db, Operand::Dense(tensor!([2.0, 3.0])));
/// ```
pub fn mul(a: &WithGrad<Ten64>, b: &WithGrad<Ten64>) -> Result<(Operand, Box<FnToDoubleOperand>)> {
    let a_val = Operand::Dense(a.value.clone());
    let b_val = Operand::Dense(b.value.clone());
    let out = ops::mul(&a_val, &b_val)?;

    let back: Box<FnToDoubleOperand> = Box::new(move |grad: &Operand| -> Result<(Operand, Operand)> {
        let grad_a = ops::mul(grad, &b_val)?;
        let grad_b = ops::mul(grad, &a_val)?;
        Ok((grad_a, grad_b))
    });

    Ok((out, back))
}

/// Sum of every element with autograd support.
///
/// # Returns
/// - The scalar sum
/// - Closure mapping `dL/dsum` to a gradient laid out like `x`: a dense tensor
///   filled with it, or a sparse tensor holding it at every stored coordinate.
///
/// # Errors
/// Only when an active mode rejects the reduction.
pub fn sum(x: &Operand) -> Result<(f64, Box<FnF64Operand>)> {
    let total = ops::sum(x)?.to_dense().data.first().copied().unwrap_or(0.0);

    let back: Box<FnF64Operand> = match x {
        Operand::Dense(t) => {
            let shape = t.shape.clone();
            Box::new(move |g: f64| Operand::Dense(Tensor::full(shape.clone(), g)))
        }
        Operand::Sparse(s) => {
            let pattern = s.clone();
            Box::new(move |g: f64| Operand::Sparse(pattern.map_values(|_| g)))
        }
    };

    Ok((total, back))
}

/// Adds `grad` into `w.grad`.
///
/// # Errors
/// Shape mismatches, or a sparse `grad`: dense gradients cannot absorb sparse updates.
pub fn accumulate(w: &mut WithGrad<Ten64>, grad: &Operand) -> Result<()> {
    let current = Operand::Dense(w.grad.clone());
    let updated = ops::add(&current, grad)?;
    w.grad.update(updated.to_dense());
    Ok(())
}
