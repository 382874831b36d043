//! Layout-polymorphic tensors passed through the dispatcher.

use crate::sparse::{Coo64, SparseCoo};
use crate::tensors::Ten64;
use std::fmt;

/// Memory layout of an [`Operand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Every element stored, row-major.
    Strided,
    /// Only stored entries, as coordinates plus values.
    SparseCoo,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strided => f.write_str("strided"),
            Self::SparseCoo => f.write_str("sparse_coo"),
        }
    }
}

/// A tensor in either layout.
///
/// Every operator takes and returns operands, so a dispatch mode can change
/// the layout of a result without the caller's code changing shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Dense row-major tensor.
    Dense(Ten64),
    /// Sparse coordinate tensor.
    Sparse(Coo64),
}

impl Operand {
    /// Layout of this operand.
    pub fn layout(&self) -> Layout {
        match self {
            Self::Dense(_) => Layout::Strided,
            Self::Sparse(_) => Layout::SparseCoo,
        }
    }

    /// Shape of the tensor, independent of layout.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Dense(t) => &t.shape,
            Self::Sparse(s) => s.shape(),
        }
    }

    /// Whether this operand is stored sparsely.
    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// The dense tensor, if this operand is dense.
    pub fn as_dense(&self) -> Option<&Ten64> {
        match self {
            Self::Dense(t) => Some(t),
            Self::Sparse(_) => None,
        }
    }

    /// The sparse tensor, if this operand is sparse.
    pub fn as_sparse(&self) -> Option<&Coo64> {
        match self {
            Self::Sparse(s) => Some(s),
            Self::Dense(_) => None,
        }
    }

    /// Dense reconstruction, cloning when already dense.
    pub fn to_dense(&self) -> Ten64 {
        match self {
            Self::Dense(t) => t.clone(),
            Self::Sparse(s) => s.to_dense(),
        }
    }
}

impl From<Ten64> for Operand {
    fn from(t: Ten64) -> Self {
        Self::Dense(t)
    }
}

impl From<SparseCoo<f64>> for Operand {
    fn from(s: Coo64) -> Self {
        Self::Sparse(s)
    }
}

/// Layouts of every operand, in argument order.
pub fn layouts(args: &[Operand]) -> Vec<Layout> {
    args.iter().map(Operand::layout).collect()
}
