//! Kernel execution backend.
//!
//! This module selects how the default CPU kernels iterate over elements and
//! provides functions to set and get the current choice.
//!
//! # Supported Backends
//!
//! - `Parallel`: Rayon data parallelism over the element buffer (default).
//! - `Serial`: Plain iterators on the calling thread.
//!
//! The backend is stored globally using an `AtomicU8`, so it can be switched
//! at runtime. It only affects how a kernel computes its result, never the
//! result itself, and is unrelated to dispatch modes, which are thread-local.

use core::sync::atomic::{AtomicU8, Ordering};

/// Tensors smaller than this stay serial even with [`Backend::Parallel`].
pub const PARALLEL_THRESHOLD: usize = 4096;

/// Enumeration of supported kernel backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Single-threaded iteration.
    Serial = 0,
    /// Rayon-parallel iteration for large buffers (default).
    #[default]
    Parallel,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Serial),
            1 => Ok(Self::Parallel),
            _ => Err(()),
        }
    }
}

/// Internal global state for the active backend.
///
/// Acquire/release ordering; the backend changes rarely and either value
/// produces the same numbers.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Parallel as u8);

/// Sets the backend used by the default kernels.
///
/// # Example
///
/// ```
/// use sparse_output::backend::{set_backend, Backend};
/// set_backend(Backend::Serial);
/// ```
pub fn set_backend(b: Backend) {
    log::debug!("kernel backend set to {b:?}");
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the currently active backend.
///
/// If the stored value is invalid, defaults to [`Backend::Parallel`].
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}

/// Whether a kernel over `len` elements should fan out to the rayon pool.
pub(crate) fn use_parallel(len: usize) -> bool {
    get_backend() == Backend::Parallel && len >= PARALLEL_THRESHOLD
}
