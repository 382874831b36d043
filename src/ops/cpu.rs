//! CPU kernels behind the default execution path.
//!
//! # CPU Backend
//!
//! These functions do the arithmetic once the dispatcher has decided no mode
//! wants to handle a call (or a mode has asked for the default path itself).
//! They never consult the dispatch state.
//!
//! ## Features
//!
//! - Parallel execution using [`rayon`](https://docs.rs/rayon) for buffers at
//!   or above [`crate::backend::PARALLEL_THRESHOLD`] elements
//! - Serial fallback when [`crate::backend::Backend::Serial`] is selected
//! - Sparse kernels working on coalesced coordinates
//!
//! ## Implemented Ops
//!
//! - `zip_map` / `map`: element-wise dense kernels (`mul`, `add`, `sub`, `neg`, `relu`)
//! - `matmul`: dense 2-D matrix product
//! - `sum`: reduction to a scalar
//! - `diag`: vector ↔ diagonal matrix
//! - `sparse_add` / `sparse_mul`: coordinate merge and intersection
//!
//! ## Design Goals
//!
//! - Deterministic results regardless of backend
//! - Shape errors reported, never panicked on

use crate::backend::use_parallel;
use crate::error::{Error, Result};
use crate::ops::Operator;
use crate::sparse::Coo64;
use crate::tensors::{Ten64, Tensor};
use rayon::prelude::*;

fn check_same_shape(a: &[usize], b: &[usize]) -> Result<()> {
    if a != b {
        return Err(Error::ShapeMismatch {
            expected: a.to_vec(),
            got: b.to_vec(),
        });
    }
    Ok(())
}

/// Applies `f` to aligned elements of two same-shaped dense tensors.
///
/// # Errors
/// [`Error::ShapeMismatch`] if the shapes differ.
pub fn zip_map<F>(a: &Ten64, b: &Ten64, f: F) -> Result<Ten64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    check_same_shape(&a.shape, &b.shape)?;

    let data: Vec<f64> = if use_parallel(a.numel()) {
        a.data
            .par_iter()
            .zip(&b.data)
            .map(|(&x, &y)| f(x, y))
            .collect()
    } else {
        a.data.iter().zip(&b.data).map(|(&x, &y)| f(x, y)).collect()
    };

    Ok(Tensor::new(a.shape.clone(), data))
}

/// Applies `f` to every element of a dense tensor.
pub fn map<F>(x: &Ten64, f: F) -> Ten64
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let data: Vec<f64> = if use_parallel(x.numel()) {
        x.data.par_iter().map(|&v| f(v)).collect()
    } else {
        x.data.iter().map(|&v| f(v)).collect()
    };
    Tensor::new(x.shape.clone(), data)
}

/// Sum of every element as a zero-dimensional tensor.
pub fn sum(x: &Ten64) -> Ten64 {
    let total = if use_parallel(x.numel()) {
        x.data.par_iter().sum()
    } else {
        x.data.iter().sum()
    };
    Tensor::scalar(total)
}

/// Rectified linear unit.
pub fn relu_scalar(v: f64) -> f64 {
    if v > 0.0 { v } else { 0.0 }
}

/// Performs a matrix multiplication `C = A × B` on two 2D tensors (`A: m×k`, `B: k×n`).
///
/// Rows of the output are computed in parallel when the output is large enough.
///
/// # Errors
/// - [`Error::InvalidArgument`] if either operand is not 2-D.
/// - [`Error::ShapeMismatch`] if the inner dimensions of `A` and `B` do not match.
pub fn matmul(a: &Ten64, b: &Ten64) -> Result<Ten64> {
    if a.ndim() != 2 || b.ndim() != 2 {
        return Err(Error::InvalidArgument {
            op: Operator::Matmul,
            reason: format!("expected 2-D operands, got {}-D and {}-D", a.ndim(), b.ndim()),
        });
    }
    let (m, k) = (a.shape[0], a.shape[1]);
    let n = b.shape[1];
    if b.shape[0] != k {
        return Err(Error::ShapeMismatch {
            expected: vec![k, n],
            got: b.shape.clone(),
        });
    }

    let a_data = &a.data;
    let b_data = &b.data;
    let row = |i: usize, out: &mut [f64]| {
        for (j, cell) in out.iter_mut().enumerate() {
            let mut acc = 0.0;
            for l in 0..k {
                acc += a_data[i * k + l] * b_data[l * n + j];
            }
            *cell = acc;
        }
    };

    let mut out_data = vec![0.0; m * n];
    if n > 0 {
        if use_parallel(m * n) {
            out_data
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(i, out)| row(i, out));
        } else {
            out_data
                .chunks_mut(n)
                .enumerate()
                .for_each(|(i, out)| row(i, out));
        }
    }

    Ok(Tensor::new(vec![m, n], out_data))
}

/// A 1-D tensor becomes a square matrix with it on the diagonal; a square
/// matrix yields its diagonal.
///
/// # Errors
/// [`Error::InvalidArgument`] for any other shape.
pub fn diag(x: &Ten64) -> Result<Ten64> {
    match x.shape.as_slice() {
        &[n] => {
            let mut out = Tensor::zeros(vec![n, n]);
            for (i, &v) in x.data.iter().enumerate() {
                out.data[i * n + i] = v;
            }
            Ok(out)
        }
        &[r, c] if r == c => Ok(Tensor::new(
            vec![r],
            (0..r).map(|i| x.data[i * c + i]).collect(),
        )),
        _ => Err(Error::InvalidArgument {
            op: Operator::Diag,
            reason: format!("expected a vector or a square matrix, got shape {:?}", x.shape),
        }),
    }
}

// Walks two coalesced operands in offset order. `both` sees entries stored in
// both; `only_a`/`only_b` see the rest and may drop them by returning `None`.
fn merge_coalesced(
    a: &Coo64,
    b: &Coo64,
    both: impl Fn(f64, f64) -> f64,
    only_a: impl Fn(f64) -> Option<f64>,
    only_b: impl Fn(f64) -> Option<f64>,
) -> Coo64 {
    let a = a.coalesce();
    let b = b.coalesce();
    let (a_off, b_off) = (a.flat_offsets(), b.flat_offsets());
    let (a_val, b_val) = (a.values(), b.values());

    let mut offsets = Vec::with_capacity(a_off.len() + b_off.len());
    let mut values = Vec::with_capacity(a_off.len() + b_off.len());
    let (mut i, mut j) = (0, 0);
    while i < a_off.len() || j < b_off.len() {
        let take_a = j >= b_off.len() || (i < a_off.len() && a_off[i] < b_off[j]);
        let take_b = i >= a_off.len() || (j < b_off.len() && b_off[j] < a_off[i]);
        if take_a {
            if let Some(v) = only_a(a_val[i]) {
                offsets.push(a_off[i]);
                values.push(v);
            }
            i += 1;
        } else if take_b {
            if let Some(v) = only_b(b_val[j]) {
                offsets.push(b_off[j]);
                values.push(v);
            }
            j += 1;
        } else {
            offsets.push(a_off[i]);
            values.push(both(a_val[i], b_val[j]));
            i += 1;
            j += 1;
        }
    }

    Coo64::from_offsets(a.shape().to_vec(), &offsets, values)
}

/// `a + alpha * b` over the union of stored coordinates.
///
/// # Errors
/// [`Error::ShapeMismatch`] if the shapes differ.
pub fn sparse_add(a: &Coo64, b: &Coo64, alpha: f64) -> Result<Coo64> {
    check_same_shape(a.shape(), b.shape())?;
    Ok(merge_coalesced(
        a,
        b,
        |x, y| x + alpha * y,
        Some,
        |y| Some(alpha * y),
    ))
}

/// Element-wise product over the intersection of stored coordinates.
///
/// # Errors
/// [`Error::ShapeMismatch`] if the shapes differ.
pub fn sparse_mul(a: &Coo64, b: &Coo64) -> Result<Coo64> {
    check_same_shape(a.shape(), b.shape())?;
    Ok(merge_coalesced(a, b, |x, y| x * y, |_| None, |_| None))
}

/// Sum of the stored values as a dense scalar.
pub fn sparse_sum(x: &Coo64) -> Ten64 {
    Tensor::scalar(x.values().iter().sum())
}
