use contig_alloc::AllocError;
use thiserror::Error;

/// Errors reported by container operations.
///
/// Failures raised inside user code, such as a panicking `Clone` or a
/// panicking construct hook, are not represented here; they unwind through
/// the container unchanged, with the container left in a valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A bounds-checked access named a position at or beyond the live
    /// length.
    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },

    /// The allocation strategy could not satisfy a storage request.
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// The requested element count exceeds what a single allocation can
    /// describe on this platform.
    #[error("capacity overflow")]
    CapacityOverflow,
}

pub type Result<T> = std::result::Result<T, Error>;
