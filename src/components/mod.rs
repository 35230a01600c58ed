//! Host-side drivers for blocked triangular inversion.
//!
//! - `trtri`: descriptors, block-family validation and the doubling driver
//! - `gemm_block`: the two-multiply block combination over a batched GEMM
//!   capability

pub mod gemm_block;
pub mod trtri;

pub use gemm_block::{BatchGemm, GemmOperand, GemmShape, PerMatrixBatched, StridedBatched};
pub use trtri::{
    scratch_elements, trtri_trsm, Diagonal, InverseTiles, SourceMatrix, Triangle, Workspace,
};
