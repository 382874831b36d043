//! Sparse coordinate (COO) tensors.
//!
//! A [`SparseCoo`] stores only the materialized entries of a tensor as
//! `(coordinate, value)` pairs. Coordinates are kept per dimension, so a
//! matrix holds `indices = [[rows...], [cols...]]`, the same layout used by
//! `sparse_coo_tensor` style constructors.
//!
//! Entries are not required to be sorted or unique. Duplicate coordinates sum
//! when the tensor is densified, and [`SparseCoo::coalesce`] folds them into
//! one sorted entry each. Equality is defined on the dense reconstruction, so
//! two tensors holding the same entries in a different order compare equal.
//!
//! ```rust
//! use sparse_output::{sparse::SparseCoo, tensor};
//!
//! let dense = tensor!([[0.0, 2.0], [3.0, 0.0]]);
//! let coo = SparseCoo::from_dense(&dense);
//! assert_eq!(coo.nnz(), 2);
//! assert_eq!(coo.indices(), &[vec![0, 1], vec![1, 0]]);
//! assert_eq!(coo.to_dense(), dense);
//! ```

use crate::error::{Error, Result};
use crate::tensors::{Tensor, ravel, strides};
use std::ops::AddAssign;

/// COO tensor with `ndim` rows of coordinates and `nnz` values.
#[derive(Debug, Clone)]
pub struct SparseCoo<T> {
    shape: Vec<usize>,
    indices: Vec<Vec<usize>>,
    values: Vec<T>,
    coalesced: bool,
}

/// The sparse counterpart of [`crate::tensors::Ten64`].
pub type Coo64 = SparseCoo<f64>;

impl<T> SparseCoo<T> {
    /// Creates a COO tensor from per-dimension coordinates and values.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the number of coordinate rows differs from `shape.len()`
    /// - a coordinate row does not hold one entry per value
    /// - a coordinate lies outside `shape`
    pub fn new(indices: Vec<Vec<usize>>, values: Vec<T>, shape: impl Into<Vec<usize>>) -> Result<Self> {
        let shape = shape.into();
        if indices.len() != shape.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![shape.len(), values.len()],
                got: vec![indices.len(), values.len()],
            });
        }
        for (dim, (row, &size)) in indices.iter().zip(&shape).enumerate() {
            if row.len() != values.len() {
                return Err(Error::ShapeMismatch {
                    expected: vec![shape.len(), values.len()],
                    got: vec![indices.len(), row.len()],
                });
            }
            if let Some(&index) = row.iter().find(|&&i| i >= size) {
                return Err(Error::IndexOutOfBounds { dim, index, size });
            }
        }
        Ok(Self {
            shape,
            indices,
            values,
            coalesced: false,
        })
    }

    /// Creates a COO tensor whose shape is the smallest one holding every coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the coordinate rows have different
    /// lengths than `values`, or if there are no coordinate rows to infer from.
    pub fn with_inferred_shape(indices: Vec<Vec<usize>>, values: Vec<T>) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::ShapeMismatch {
                expected: vec![1, values.len()],
                got: vec![0, values.len()],
            });
        }
        let shape: Vec<usize> = indices
            .iter()
            .map(|row| row.iter().max().map_or(0, |&m| m + 1))
            .collect();
        Self::new(indices, values, shape)
    }

    /// A COO tensor of `shape` without any stored entry.
    pub fn empty(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        Self {
            indices: vec![Vec::new(); shape.len()],
            shape,
            values: Vec::new(),
            coalesced: true,
        }
    }

    /// Shape of the tensor this represents.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of stored entries (zeros included, if stored explicitly).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Coordinates, one row per dimension.
    pub fn indices(&self) -> &[Vec<usize>] {
        &self.indices
    }

    /// Stored values, aligned with the columns of [`SparseCoo::indices`].
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Whether entries are unique and sorted in row-major order.
    pub fn is_coalesced(&self) -> bool {
        self.coalesced
    }

    /// Coordinate of the `entry`-th stored value.
    pub fn coordinate(&self, entry: usize) -> Vec<usize> {
        self.indices.iter().map(|row| row[entry]).collect()
    }

    /// Applies `f` to every stored value, keeping coordinates as they are.
    pub fn map_values<U>(&self, f: impl Fn(&T) -> U) -> SparseCoo<U> {
        SparseCoo {
            shape: self.shape.clone(),
            indices: self.indices.clone(),
            values: self.values.iter().map(f).collect(),
            coalesced: self.coalesced,
        }
    }

    // row-major flat offset of every entry; coordinates are validated on construction
    pub(crate) fn flat_offsets(&self) -> Vec<usize> {
        let strides = strides(&self.shape);
        (0..self.nnz())
            .map(|e| {
                self.indices
                    .iter()
                    .zip(&strides)
                    .map(|(row, s)| row[e] * s)
                    .sum::<usize>()
            })
            .collect()
    }

    pub(crate) fn from_offsets(shape: Vec<usize>, offsets: &[usize], values: Vec<T>) -> Self {
        let strides = strides(&shape);
        let indices = shape
            .iter()
            .zip(&strides)
            .map(|(&size, &stride)| offsets.iter().map(|o| (o / stride) % size).collect::<Vec<usize>>())
            .collect();
        Self {
            shape,
            indices,
            values,
            coalesced: true,
        }
    }
}

impl<T: Copy + Default + PartialEq + AddAssign> SparseCoo<T> {
    /// Converts a dense tensor, storing only entries that differ from zero.
    ///
    /// The result is coalesced: entries come out in row-major order.
    pub fn from_dense(dense: &Tensor<T>) -> Self {
        let zero = T::default();
        let (offsets, values): (Vec<usize>, Vec<T>) = dense
            .data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != zero)
            .map(|(i, v)| (i, *v))
            .unzip();
        Self::from_offsets(dense.shape.clone(), &offsets, values)
    }

    /// Materializes every position; duplicate coordinates are summed.
    pub fn to_dense(&self) -> Tensor<T> {
        let mut data = vec![T::default(); self.shape.iter().product()];
        for (offset, &value) in self.flat_offsets().into_iter().zip(&self.values) {
            data[offset] += value;
        }
        Tensor::new(self.shape.clone(), data)
    }

    /// Sorts entries in row-major order and sums duplicate coordinates.
    ///
    /// Explicitly stored zeros are kept.
    pub fn coalesce(&self) -> Self {
        if self.coalesced {
            return self.clone();
        }
        let mut entries: Vec<(usize, T)> = self
            .flat_offsets()
            .into_iter()
            .zip(self.values.iter().copied())
            .collect();
        entries.sort_by_key(|(offset, _)| *offset);

        let mut offsets: Vec<usize> = Vec::with_capacity(entries.len());
        let mut values: Vec<T> = Vec::with_capacity(entries.len());
        for (offset, value) in entries {
            match offsets.last() {
                Some(&last) if last == offset => {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                }
                _ => {
                    offsets.push(offset);
                    values.push(value);
                }
            }
        }
        Self::from_offsets(self.shape.clone(), &offsets, values)
    }

    /// Value at `coord`, summing duplicates; zero when nothing is stored there.
    pub fn get(&self, coord: &[usize]) -> Option<T> {
        let target = ravel(&self.shape, coord)?;
        let mut acc = T::default();
        for (offset, &value) in self.flat_offsets().into_iter().zip(&self.values) {
            if offset == target {
                acc += value;
            }
        }
        Some(acc)
    }
}

impl<T: Copy + Default + PartialEq + AddAssign> PartialEq for SparseCoo<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.to_dense() == other.to_dense()
    }
}
