//! Strided batched GEMM over small column-major blocks.
//!
//! `C = alpha * A * B` for every (sub-block, batch entry) instance, one unit
//! per output element with an in-register accumulation over k. The block
//! combination only ever multiplies blocks of at most NB/2 elements per side,
//! so this shape is adequate; no shared-memory tiling.
//!
//! Operands are addressed through [`MatrixSlice`]: a base offset plus a
//! leading dimension, a sub-block stride (Y axis of the grid) and a batch
//! stride (Z axis). Instances never overlap, so the fully batched launch
//! writes disjoint regions.

use cubecl_core as cubecl;
use cubecl_core::client::ComputeClient;
use cubecl_core::prelude::*;
use cubecl_core::server::Handle;

/// Addressing of one GEMM operand inside a flat column-major buffer.
#[derive(Debug, Clone, Copy)]
pub struct MatrixSlice {
    /// Element offset of instance (0, 0).
    pub offset: u32,
    /// Leading dimension.
    pub ld: u32,
    /// Offset between consecutive sub-block instances.
    pub stride: u32,
    /// Offset between consecutive batch entries.
    pub batch_stride: u32,
}

/// `C = alpha * A * B`, batched over sub-blocks (Y) and batch entries (Z).
///
/// `A` is m×k, `B` k×n, `C` m×n, all column-major. Element (i, j) of `C` is
/// owned by exactly one unit; `C` is overwritten, not accumulated into.
#[cube(launch)]
pub fn gemm_strided_batched_kernel<F: Float>(
    a: &Tensor<F>,
    b: &Tensor<F>,
    c: &mut Tensor<F>,
    m: u32,
    n: u32,
    k: u32,
    alpha: F,
    off_a: u32,
    lda: u32,
    stride_a: u32,
    batch_stride_a: u32,
    off_b: u32,
    ldb: u32,
    stride_b: u32,
    batch_stride_b: u32,
    off_c: u32,
    ldc: u32,
    stride_c: u32,
    batch_stride_c: u32,
) {
    let idx = CUBE_POS_X * CUBE_DIM_X + UNIT_POS_X;
    let t = CUBE_POS_Y;
    let bat = CUBE_POS_Z;

    if idx < m * n {
        let i = idx % m;
        let j = idx / m;

        let base_a = off_a + t * stride_a + bat * batch_stride_a;
        let base_b = off_b + t * stride_b + bat * batch_stride_b;
        let base_c = off_c + t * stride_c + bat * batch_stride_c;

        let mut acc = F::new(0.0);
        for p in 0..k {
            acc += a[base_a + i + p * lda] * b[base_b + p + j * ldb];
        }
        c[base_c + i + j * ldc] = alpha * acc;
    }
}

/// Host-side launcher for [`gemm_strided_batched_kernel`].
///
/// The three handles may alias (the combination step reads and writes the
/// inverse-tile buffer); the regions addressed by the slices must then be
/// disjoint, which the caller guarantees.
#[allow(clippy::too_many_arguments)]
pub fn launch_gemm_strided_batched<F, R>(
    client: &ComputeClient<R::Server>,
    a: &Handle,
    a_len: usize,
    a_slice: MatrixSlice,
    b: &Handle,
    b_len: usize,
    b_slice: MatrixSlice,
    c: &Handle,
    c_len: usize,
    c_slice: MatrixSlice,
    m: u32,
    n: u32,
    k: u32,
    alpha: F,
    sub_blocks: u32,
    batch_count: u32,
    unit_width: u32,
) where
    F: Float + CubeElement,
    R: Runtime,
{
    let a_shape = [a_len];
    let b_shape = [b_len];
    let c_shape = [c_len];
    let strides = [1usize];

    let cube_count = CubeCount::Static((m * n).div_ceil(unit_width), sub_blocks, batch_count);
    let cube_dim = CubeDim::new(unit_width, 1, 1);

    unsafe {
        gemm_strided_batched_kernel::launch::<F, R>(
            client,
            cube_count,
            cube_dim,
            TensorArg::from_raw_parts::<F>(a, &strides, &a_shape, 1),
            TensorArg::from_raw_parts::<F>(b, &strides, &b_shape, 1),
            TensorArg::from_raw_parts::<F>(c, &strides, &c_shape, 1),
            ScalarArg::new(m),
            ScalarArg::new(n),
            ScalarArg::new(k),
            ScalarArg::new(alpha),
            ScalarArg::new(a_slice.offset),
            ScalarArg::new(a_slice.ld),
            ScalarArg::new(a_slice.stride),
            ScalarArg::new(a_slice.batch_stride),
            ScalarArg::new(b_slice.offset),
            ScalarArg::new(b_slice.ld),
            ScalarArg::new(b_slice.stride),
            ScalarArg::new(b_slice.batch_stride),
            ScalarArg::new(c_slice.offset),
            ScalarArg::new(c_slice.ld),
            ScalarArg::new(c_slice.stride),
            ScalarArg::new(c_slice.batch_stride),
        );
    }
}
