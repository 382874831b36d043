//! Operation Dispatch Layer
//!
//! Every operator call lands in [`call`]. When a [`DispatchMode`] is active
//! on the current thread, the innermost one receives the call; otherwise the
//! call goes straight to [`default_dispatch`], which runs the CPU kernels.
//!
//! Modes are installed with [`enable_mode`] and stay active until the
//! returned [`ModeGuard`] is dropped, whichever way the enclosing scope is
//! left. While a mode handles a call it is taken off the stack, so any
//! operator it invokes reaches the next mode down, or the default path.
//!
//! # Design Highlights
//! - **Thread-local**: modes never leak into other threads
//! - **Scoped**: the guard is the only way to enable a mode, and it is `!Send`
//! - **Transparent default**: with no mode active the dispatcher adds nothing
//!   but a thread-local lookup
//!
//! # Example
//! ```rust
//! use std::rc::Rc;
//! use sparse_output::error::Result;
//! use sparse_output::ops::{self, Operator, OpOptions};
//! use sparse_output::ops::dispatch::{default_dispatch, enable_mode, DispatchMode};
//! use sparse_output::{tensor, Operand};
//!
//! // Doubles the result of every `neg`.
//! struct LoudNeg;
//!
//! impl DispatchMode for LoudNeg {
//!     fn dispatch(&self, op: Operator, args: &[Operand], options: &OpOptions) -> Result<Operand> {
//!         let out = default_dispatch(op, args, options)?;
//!         if op == Operator::Neg {
//!             return ops::add(&out, &out);
//!         }
//!         Ok(out)
//!     }
//! }
//!
//! let x: Operand = tensor!([1.0, -2.0]).into();
//! {
//!     let _guard = enable_mode(Rc::new(LoudNeg));
//!     assert_eq!(ops::neg(&x).unwrap(), Operand::Dense(tensor!([-2.0, 4.0])));
//! }
//! assert_eq!(ops::neg(&x).unwrap(), Operand::Dense(tensor!([-1.0, 2.0])));
//! ```

use crate::error::{Error, Result};
use crate::operand::{Operand, layouts};
use crate::ops::{OpOptions, Operator, cpu};
use crate::sparse::Coo64;
use std::cell::RefCell;
use std::rc::Rc;

/// A hook consulted for every operator call while it is enabled.
///
/// Implementations decide per operator whether to run the default path, alter
/// its result, or do something else entirely. Calling [`default_dispatch`]
/// runs the kernels directly; calling the functions in [`crate::ops`] goes
/// through the remaining modes first.
pub trait DispatchMode {
    /// Handles one operator call.
    ///
    /// # Errors
    /// Whatever the mode or the kernels it runs report.
    fn dispatch(&self, op: Operator, args: &[Operand], options: &OpOptions) -> Result<Operand>;

    /// Name used in log output.
    fn name(&self) -> &'static str {
        "anonymous"
    }
}

thread_local! {
    static MODE_STACK: RefCell<Vec<Rc<dyn DispatchMode>>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a dispatch mode enabled for as long as it lives.
///
/// Guards are meant to be dropped in reverse order of creation, which lexical
/// scoping gives for free. A guard dropped early removes only its own mode.
#[must_use = "the mode is disabled as soon as the guard is dropped"]
pub struct ModeGuard {
    mode: Rc<dyn DispatchMode>,
    depth: usize,
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        let name = self.mode.name();
        // the stack is gone already if the thread is shutting down
        let _ = MODE_STACK.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            let Some(pos) = stack.iter().rposition(|m| Rc::ptr_eq(m, &self.mode)) else {
                log::warn!("dispatch mode '{name}' was no longer on the stack");
                return;
            };
            if pos + 1 != stack.len() {
                log::warn!(
                    "dispatch mode '{name}' released out of order (depth {}, stack holds {})",
                    self.depth,
                    stack.len()
                );
            }
            stack.remove(pos);
        });
        log::debug!("disabled dispatch mode '{name}' (depth {})", self.depth);
    }
}

/// Pushes `mode` onto this thread's mode stack.
///
/// The mode handles every operator call made on this thread until the
/// returned guard is dropped, unless a mode enabled later shadows it.
pub fn enable_mode(mode: Rc<dyn DispatchMode>) -> ModeGuard {
    let name = mode.name();
    let depth = MODE_STACK.with_borrow_mut(|stack| {
        stack.push(Rc::clone(&mode));
        stack.len()
    });
    log::debug!("enabled dispatch mode '{name}' (depth {depth})");
    ModeGuard { mode, depth }
}

/// Whether any mode is enabled on this thread.
pub fn is_mode_active() -> bool {
    mode_depth() > 0
}

/// Number of modes currently stacked on this thread.
pub fn mode_depth() -> usize {
    MODE_STACK.with_borrow(Vec::len)
}

// Puts a popped mode back when its handler returns or unwinds.
struct Reinstate(Option<Rc<dyn DispatchMode>>);

impl Drop for Reinstate {
    fn drop(&mut self) {
        if let Some(mode) = self.0.take() {
            let _ = MODE_STACK.try_with(|stack| stack.borrow_mut().push(mode));
        }
    }
}

/// Routes one operator call through the innermost active mode, or the
/// default path when none is active.
///
/// # Errors
/// Whatever the handling mode or kernel reports; nothing is translated.
pub fn call(op: Operator, args: &[Operand], options: &OpOptions) -> Result<Operand> {
    match MODE_STACK.with_borrow_mut(Vec::pop) {
        Some(mode) => {
            log::trace!("{op}: handled by mode '{}'", mode.name());
            let reinstate = Reinstate(Some(Rc::clone(&mode)));
            let out = mode.dispatch(op, args, options);
            drop(reinstate);
            out
        }
        None => {
            log::trace!("{op}: default path");
            default_dispatch(op, args, options)
        }
    }
}

fn check_arguments(op: Operator, args: &[Operand], options: &OpOptions) -> Result<()> {
    if args.len() != op.arity() {
        return Err(Error::Arity {
            op,
            expected: op.arity(),
            got: args.len(),
        });
    }
    if options.alpha.is_some() && !op.accepts_alpha() {
        return Err(Error::InvalidArgument {
            op,
            reason: "alpha is only accepted by add and sub".to_string(),
        });
    }
    Ok(())
}

/// The default execution path: runs the CPU kernel for `op`, bypassing every mode.
///
/// Binary operators require both operands in the same layout; mixing a
/// strided and a sparse operand is reported as
/// [`Error::UnsupportedLayout`], as are sparse `matmul` and `diag`.
///
/// # Errors
/// Arity, option, shape, and layout errors.
pub fn default_dispatch(op: Operator, args: &[Operand], options: &OpOptions) -> Result<Operand> {
    use Operand::{Dense, Sparse};

    check_arguments(op, args, options)?;
    let alpha = options.alpha.unwrap_or(1.0);

    match (op, args) {
        (Operator::Mul, [Dense(a), Dense(b)]) => cpu::zip_map(a, b, |x, y| x * y).map(Dense),
        (Operator::Mul, [Sparse(a), Sparse(b)]) => cpu::sparse_mul(a, b).map(Sparse),

        (Operator::Add, [Dense(a), Dense(b)]) => cpu::zip_map(a, b, |x, y| x + alpha * y).map(Dense),
        (Operator::Add, [Sparse(a), Sparse(b)]) => cpu::sparse_add(a, b, alpha).map(Sparse),

        (Operator::Sub, [Dense(a), Dense(b)]) => cpu::zip_map(a, b, |x, y| x - alpha * y).map(Dense),
        (Operator::Sub, [Sparse(a), Sparse(b)]) => cpu::sparse_add(a, b, -alpha).map(Sparse),

        (Operator::Neg, [Dense(x)]) => Ok(Dense(cpu::map(x, |v| -v))),
        (Operator::Neg, [Sparse(x)]) => Ok(Sparse(x.map_values(|v| -v))),

        (Operator::Relu, [Dense(x)]) => Ok(Dense(cpu::map(x, cpu::relu_scalar))),
        // duplicates must sum before the nonlinearity
        (Operator::Relu, [Sparse(x)]) => Ok(Sparse(x.coalesce().map_values(|&v| cpu::relu_scalar(v)))),

        (Operator::Matmul, [Dense(a), Dense(b)]) => cpu::matmul(a, b).map(Dense),

        (Operator::Sum, [Dense(x)]) => Ok(Dense(cpu::sum(x))),
        (Operator::Sum, [Sparse(x)]) => Ok(Dense(cpu::sparse_sum(x))),

        (Operator::Diag, [Dense(x)]) => cpu::diag(x).map(Dense),

        (Operator::ToSparse, [Dense(x)]) => Ok(Sparse(Coo64::from_dense(x))),
        (Operator::ToSparse, [Sparse(x)]) => Ok(Sparse(x.clone())),

        (Operator::ToDense, [Dense(x)]) => Ok(Dense(x.clone())),
        (Operator::ToDense, [Sparse(x)]) => Ok(Dense(x.to_dense())),

        _ => Err(Error::UnsupportedLayout {
            op,
            layouts: layouts(args),
        }),
    }
}
