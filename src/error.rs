//! Error type shared by buffers, views and the display engine.
//
// Out-of-bounds pixel access is never an error here: it resolves to the
// buffer's sentinel pixel. Only binding, sizing and capability problems
// are reported.

use thiserror::Error;

/// Recoverable failures reported by binding and sizing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedFbError {
    /// The buffer is already bound to a different sink.
    #[error("buffer is already bound to another sink")]
    AlreadyBound,
    /// Storage did not end up with the requested number of pixels.
    #[error("requested {requested} pixels, storage holds {actual}")]
    SizeMismatch { requested: usize, actual: usize },
    /// The backend has fixed geometry or otherwise can't do this.
    #[error("operation not supported by this backend")]
    Unsupported,
}

pub type Result<T> = core::result::Result<T, LedFbError>;
