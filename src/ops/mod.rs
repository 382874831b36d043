//! # Operation Dispatch Layer
//!
//! This module names the primitive operators, routes every call through the
//! dispatcher, and holds the default CPU kernels behind it.
//!
//! ## Submodules
//!
//! - [`dispatch`]: Mode stack, scoped guards, and the default execution path
//! - [`cpu`]: Serial and rayon-parallel CPU kernels for both layouts
//!
//! ## Calling Operators
//!
//! The free functions here (`mul`, `add`, `sum`, ...) are the user-facing
//! surface. Each builds its operand list and hands it to
//! [`dispatch::call`], so an active [`dispatch::DispatchMode`] sees every one
//! of them.
//!
//! ```rust
//! use sparse_output::{ops, tensor, Operand};
//!
//! let a: Operand = tensor!([1.0, 2.0]).into();
//! let b: Operand = tensor!([3.0, 4.0]).into();
//! let c = ops::mul(&a, &b).unwrap();
//! assert_eq!(c, Operand::Dense(tensor!([3.0, 8.0])));
//! ```
//!
//! ## Extending the Operator Set
//!
//! 1. Add a variant to [`Operator`] and its arity
//! 2. Implement the kernel in `cpu`
//! 3. Route it in `dispatch::default_dispatch` and add a façade function here

use crate::error::Result;
use crate::operand::Operand;
use std::fmt;

pub mod cpu;
pub mod dispatch;

/// The fixed set of primitive operators the dispatcher knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    /// Element-wise product.
    Mul = 0,
    /// Element-wise sum, `a + alpha * b`.
    Add,
    /// Element-wise difference, `a - alpha * b`.
    Sub,
    /// Element-wise negation.
    Neg,
    /// 2-D matrix product.
    Matmul,
    /// Element-wise `max(0, x)`.
    Relu,
    /// Sum of all elements, as a scalar tensor.
    Sum,
    /// Vector to diagonal matrix, or square matrix to its diagonal.
    Diag,
    /// Conversion to the sparse coordinate layout.
    ToSparse,
    /// Conversion to the strided layout.
    ToDense,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Mul,
        Self::Add,
        Self::Sub,
        Self::Neg,
        Self::Matmul,
        Self::Relu,
        Self::Sum,
        Self::Diag,
        Self::ToSparse,
        Self::ToDense,
    ];

    /// Returns the operator name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mul => "mul",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Neg => "neg",
            Self::Matmul => "matmul",
            Self::Relu => "relu",
            Self::Sum => "sum",
            Self::Diag => "diag",
            Self::ToSparse => "to_sparse",
            Self::ToDense => "to_dense",
        }
    }

    /// Number of tensor operands the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            Self::Mul | Self::Add | Self::Sub | Self::Matmul => 2,
            Self::Neg | Self::Relu | Self::Sum | Self::Diag | Self::ToSparse | Self::ToDense => 1,
        }
    }

    /// Whether the operator accepts [`OpOptions::alpha`].
    pub fn accepts_alpha(&self) -> bool {
        matches!(self, Self::Add | Self::Sub)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyword options forwarded alongside the operands.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OpOptions {
    /// Scale applied to the second operand of `add`/`sub`.
    pub alpha: Option<f64>,
}

impl OpOptions {
    /// Options with `alpha` set.
    pub fn alpha(alpha: f64) -> Self {
        Self { alpha: Some(alpha) }
    }
}

fn call_binary(op: Operator, a: &Operand, b: &Operand, options: &OpOptions) -> Result<Operand> {
    dispatch::call(op, &[a.clone(), b.clone()], options)
}

fn call_unary(op: Operator, x: &Operand) -> Result<Operand> {
    dispatch::call(op, std::slice::from_ref(x), &OpOptions::default())
}

/// Element-wise product of two same-shaped tensors.
///
/// # Errors
/// Shape mismatches, or layouts the active path does not support.
pub fn mul(a: &Operand, b: &Operand) -> Result<Operand> {
    call_binary(Operator::Mul, a, b, &OpOptions::default())
}

/// Element-wise `a + b`.
///
/// # Errors
/// Shape mismatches, or layouts the active path does not support.
pub fn add(a: &Operand, b: &Operand) -> Result<Operand> {
    call_binary(Operator::Add, a, b, &OpOptions::default())
}

/// Element-wise `a + alpha * b`.
///
/// # Errors
/// Shape mismatches, or layouts the active path does not support.
pub fn add_scaled(a: &Operand, b: &Operand, alpha: f64) -> Result<Operand> {
    call_binary(Operator::Add, a, b, &OpOptions::alpha(alpha))
}

/// Element-wise `a - b`.
///
/// # Errors
/// Shape mismatches, or layouts the active path does not support.
pub fn sub(a: &Operand, b: &Operand) -> Result<Operand> {
    call_binary(Operator::Sub, a, b, &OpOptions::default())
}

/// Element-wise negation.
///
/// # Errors
/// Only when an active mode rejects the call.
pub fn neg(x: &Operand) -> Result<Operand> {
    call_unary(Operator::Neg, x)
}

/// Matrix product of two dense 2-D tensors.
///
/// # Errors
/// Non-matrix operands, mismatched inner dimensions, or sparse operands.
pub fn matmul(a: &Operand, b: &Operand) -> Result<Operand> {
    call_binary(Operator::Matmul, a, b, &OpOptions::default())
}

/// Element-wise `max(0, x)`.
///
/// # Errors
/// Only when an active mode rejects the call.
pub fn relu(x: &Operand) -> Result<Operand> {
    call_unary(Operator::Relu, x)
}

/// Sum of every element, returned as a dense scalar.
///
/// # Errors
/// Only when an active mode rejects the call.
pub fn sum(x: &Operand) -> Result<Operand> {
    call_unary(Operator::Sum, x)
}

/// Builds a diagonal matrix from a vector, or extracts the diagonal of a square matrix.
///
/// # Errors
/// Operands that are neither 1-D nor square 2-D, or sparse operands.
pub fn diag(x: &Operand) -> Result<Operand> {
    call_unary(Operator::Diag, x)
}

/// Converts to the sparse coordinate layout.
///
/// # Errors
/// Only when an active mode rejects the call.
pub fn to_sparse(x: &Operand) -> Result<Operand> {
    call_unary(Operator::ToSparse, x)
}

/// Converts to the strided layout.
///
/// # Errors
/// Only when an active mode rejects the call.
pub fn to_dense(x: &Operand) -> Result<Operand> {
    call_unary(Operator::ToDense, x)
}
