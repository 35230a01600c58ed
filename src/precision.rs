//! Precision trait system for the inversion kernels.

use cubecl_core::prelude::{CubePrimitive, Float, Numeric};

/// Precision specification for triangular inversion.
///
/// Follows the global/working/accumulation split used across the CubeCL
/// linear algebra crates:
/// - `EG`: dtype of the caller's buffers (source and inverse tiles)
/// - `EW`: working dtype the kernels compute in
/// - `EA`: accumulation dtype for GEMM inner products
///
/// The inversion reads and writes a single buffer dtype, so only uniform
/// configurations (`EG == EW == EA`) are provided; converting mixed-dtype
/// inputs is the caller's concern.
pub trait TrtriPrecision: Send + Sync + 'static {
    /// Global memory type (source matrix and inverse tiles).
    type EG: Numeric + CubePrimitive;

    /// Working precision (substitution and combination arithmetic).
    type EW: Float + CubePrimitive;

    /// Accumulation precision (GEMM inner products).
    type EA: Float + CubePrimitive;
}

/// Standard single precision (f32).
#[derive(Debug, Clone, Copy)]
pub struct F32Precision;

impl TrtriPrecision for F32Precision {
    type EG = f32;
    type EW = f32;
    type EA = f32;
}

/// Standard double precision (f64).
#[derive(Debug, Clone, Copy)]
pub struct F64Precision;

impl TrtriPrecision for F64Precision {
    type EG = f64;
    type EW = f64;
    type EA = f64;
}

/// Pure fp16 precision.
///
/// Warning: triangular inversion amplifies conditioning; fp16 is only
/// adequate for small, well-conditioned tiles.
#[derive(Debug, Clone, Copy)]
pub struct F16Precision;

impl TrtriPrecision for F16Precision {
    type EG = half::f16;
    type EW = half::f16;
    type EA = half::f16;
}

/// Pure bf16 precision.
///
/// Warning: bf16 has fewer mantissa bits than fp16; accuracy is limited.
#[derive(Debug, Clone, Copy)]
pub struct BF16Precision;

impl TrtriPrecision for BF16Precision {
    type EG = half::bf16;
    type EW = half::bf16;
    type EA = half::bf16;
}
