//! Approximate equality of tensors, whatever their layout.
//!
//! Two operands compare by their dense reconstruction, so a sparse result can
//! be checked against a dense reference (or a sparse one with its entries in
//! a different order) without converting by hand.

use crate::operand::Operand;
use crate::sparse::Coo64;
use crate::tensors::Ten64;

/// The max epsilon accepted on `f64`s.
pub const F64_MAX_ERROR: f64 = 1e-3;

/// The expected minimum epsilon accepted on `f64`s.
pub const F64_AVG_ERROR: f64 = 1e-6;

/// The best expected epsilon accepted on `f64`s.
pub const F64_MIN_ERROR: f64 = 1e-13;

/// The approximated equality enumerated, best first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApproxEquality {
    /// Very strong epsilon.
    Precise = 0,

    /// Good epsilon.
    Partial = 1,

    /// Acceptable epsilon
    Relative = 2,

    /// No relative equality.
    Scarce = 3,
}

/// Checks the distance between two values against the epsilons above.
pub trait RelativeEq<Rhs: ?Sized = Self> {
    /// Enumerates the equality of `self` and `rhs`.
    fn approx_eq(&self, rhs: &Rhs) -> ApproxEquality;
}

impl RelativeEq for f64 {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        let dif = (self - rhs).abs();

        if dif < F64_MIN_ERROR {
            ApproxEquality::Precise
        } else if dif < F64_AVG_ERROR {
            ApproxEquality::Partial
        } else if dif < F64_MAX_ERROR {
            ApproxEquality::Relative
        } else {
            ApproxEquality::Scarce
        }
    }
}

impl RelativeEq for [f64] {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self.len() != rhs.len() {
            return ApproxEquality::Scarce;
        }
        // the worst element decides; nothing is worse than scarce
        let mut eq = ApproxEquality::Precise;
        for (a, b) in self.iter().zip(rhs) {
            eq = eq.max(a.approx_eq(b));
            if eq == ApproxEquality::Scarce {
                break;
            }
        }
        eq
    }
}

impl RelativeEq for Ten64 {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self.shape != rhs.shape {
            return ApproxEquality::Scarce;
        }
        self.data.as_slice().approx_eq(rhs.data.as_slice())
    }
}

impl RelativeEq for Coo64 {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        self.to_dense().approx_eq(&rhs.to_dense())
    }
}

impl RelativeEq for Operand {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        self.to_dense().approx_eq(&rhs.to_dense())
    }
}

impl RelativeEq<Ten64> for Operand {
    fn approx_eq(&self, rhs: &Ten64) -> ApproxEquality {
        self.to_dense().approx_eq(rhs)
    }
}

/// Whether `a` and `b` agree within [`F64_MIN_ERROR`] everywhere.
pub fn approx_eq<A: RelativeEq<B> + ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    a.approx_eq(b) == ApproxEquality::Precise
}

/// Asserts that two tensors agree within [`F64_MIN_ERROR`] everywhere.
///
/// Layouts may differ; both sides are compared densely.
///
/// ```rust
/// use sparse_output::{assert_approx_eq, ops, tensor, Operand};
///
/// let dense: Operand = tensor!([[0.0, 1.5], [0.0, 0.0]]).into();
/// let sparse = ops::to_sparse(&dense).unwrap();
/// assert_approx_eq!(sparse, dense);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => {{
        let (left, right) = (&$left, &$right);
        let eq = $crate::approx::RelativeEq::approx_eq(left, right);
        assert!(
            eq == $crate::approx::ApproxEquality::Precise,
            "tensors differ ({:?}):\n  left: {:?}\n right: {:?}",
            eq,
            left,
            right
        );
    }};
}
