//! Error types for the blocked triangular inversion.

use thiserror::Error;

#[cfg(feature = "std")]
use std::string::String;

#[cfg(not(feature = "std"))]
use alloc::string::String;

/// Errors that can occur while setting up a blocked inversion.
///
/// Device-side hard errors (lost context, launch failure) surface through
/// the CubeCL client on synchronization or readback, not through this enum:
/// launches are stream-ordered and fire-and-forget. Numerical singularity of
/// the source matrix is never detected — the inverse of a singular
/// triangular matrix is undefined and propagates Inf/NaN by contract.
#[derive(Error, Debug, Clone)]
pub enum TrtriError {
    /// Diagonal tile size outside the supported doubling family.
    #[error("Unsupported block size NB={nb}: {reason}")]
    UnsupportedBlockSize {
        /// Requested diagonal tile size
        nb: usize,
        /// Why the size is rejected
        reason: String,
    },

    /// Inconsistent matrix descriptor.
    #[error("Invalid shape: {reason}")]
    InvalidShape {
        /// Description of the shape error
        reason: String,
    },

    /// Scratch buffer is smaller than the combination step needs.
    #[error("Workspace too small: need {required} elements, got {provided}")]
    WorkspaceTooSmall {
        /// Required element count (see `scratch_elements`)
        required: usize,
        /// Element count the caller provided
        provided: usize,
    },
}

/// Result type for triangular inversion operations.
pub type TrtriResult<T> = Result<T, TrtriError>;
