//! # CubeCL TRTRI
//!
//! Blocked triangular matrix inversion on the GPU, for use as the
//! inverse-factor engine inside a blocked triangular solve (TRSM).
//!
//! ## What it computes
//!
//! Given a batch of N×N triangular matrices `A`, fills a caller-owned buffer
//! `invA` with the inverses of the NB×NB diagonal blocks of `A`, stored as a
//! sequence of dense NB×NB tiles (leading dimension NB). The half of each
//! tile outside the active triangle is zeroed so a TRSM caller can multiply
//! against whole tiles.
//!
//! ## Algorithm
//!
//! Blocked doubling recursion, expressed as a fixed-depth loop:
//!
//! ```text
//! 1. Invert every IB×IB diagonal leaf block directly (device kernel,
//!    one execution unit per inverse column, IB = NB/8).
//! 2. Zero the opposite triangle of every NB×NB output tile.
//! 3. Combine pairs of inverted blocks, doubling the block size:
//!    IB -> 2·IB -> 4·IB -> NB, two batched GEMMs per pair:
//!
//!        [ A11   0  ]^-1   [    invA11            0    ]
//!        [ A21  A22 ]    = [ -invA22·A21·invA11  invA22 ]
//!
//!    (mirrored for upper triangular: invA12 = -invA11·A12·invA22)
//! 4. If N is not a multiple of NB, invert the trailing rem×rem block
//!    directly as an independent problem.
//! ```
//!
//! Most of the arithmetic lands in batched GEMM launches, which is what
//! makes the blocked form worthwhile on GPUs.
//!
//! ## Example
//!
//! ```ignore
//! use cubecl_trtri::{trtri_trsm, StridedBatched, Triangle, Diagonal, F32Precision};
//!
//! trtri_trsm::<Runtime, F32Precision, _, 128>(
//!     &client,
//!     &StridedBatched,
//!     Triangle::Lower,
//!     Diagonal::NonUnit,
//!     n,
//!     a,       // source descriptor: offset, lda, batch stride
//!     inv_a,   // output tiles: ld fixed at 128
//!     c_tmp,   // workspace, see `scratch_elements`
//!     batch_count,
//! )?;
//! ```
//!
//! Inverting a singular triangular matrix is undefined behavior: the result
//! contains Inf/NaN and no error is raised, matching the BLAS-level contract.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
extern crate alloc;

mod config;
mod error;
mod precision;

/// Host-side drivers: the blocked inversion entry point and the
/// GEMM combination helper.
pub mod components;

/// Low-level GPU kernels.
pub mod kernels;

/// CPU reference implementations and runtime-generic test bodies.
#[cfg(feature = "export_tests")]
pub mod tests;

pub use config::*;
pub use error::*;
pub use precision::*;

pub use components::gemm_block::*;
pub use components::trtri::*;
