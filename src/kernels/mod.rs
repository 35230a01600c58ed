//! Low-level GPU kernels for blocked triangular inversion.

pub mod diag_invert;
pub mod fill;
pub mod gemm;

pub use diag_invert::*;
pub use fill::*;
pub use gemm::*;
