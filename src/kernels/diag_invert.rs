//! Exact inversion of small triangular blocks on the diagonal.
//!
//! One cube per (block, batch entry), one unit per inverse column. Column `j`
//! of the inverse of a triangular block solves `T * x = e_j` by substitution,
//! so the columns are fully independent: each unit only ever reads back values
//! it wrote itself.
//!
//! The same kernel serves two call shapes:
//!
//! - **Leaf pass**: many IB×IB blocks along the diagonal of A, scattered into
//!   the leaf positions of the dense NB×NB inverse tiles (`blocks_per_tile`
//!   leaves per tile).
//! - **Direct pass**: a single block of runtime size (the trailing remainder
//!   tile, or a whole problem smaller than one tile), with
//!   `blocks_per_tile = 1`.
//!
//! A singular diagonal entry is not detected; the division produces Inf/NaN
//! which propagates into the output.

use cubecl_core as cubecl;
use cubecl_core::client::ComputeClient;
use cubecl_core::prelude::*;
use cubecl_core::server::Handle;

/// Addressing for one invocation of [`block_invert_kernel`].
///
/// All values are element offsets/strides into flat column-major buffers.
#[derive(Debug, Clone, Copy)]
pub struct BlockInvertParams {
    /// Leading dimension of the source matrix.
    pub lda: u32,
    /// Leading dimension of the inverse tiles (NB for the leaf pass).
    pub ldinv: u32,
    /// Base offset of the source matrix.
    pub off_a: u32,
    /// Base offset of the inverse tiles.
    pub off_inv: u32,
    /// Offset between consecutive diagonal blocks in the source.
    pub step_a: u32,
    /// Offset between consecutive leaf positions within one inverse tile.
    pub step_inv: u32,
    /// Leaf blocks per inverse tile (1 for the direct pass).
    pub blocks_per_tile: u32,
    /// Offset between consecutive inverse tiles.
    pub tile_stride: u32,
    /// Offset between batch entries of the source.
    pub batch_stride_a: u32,
    /// Offset between batch entries of the inverse tiles.
    pub batch_stride_inv: u32,
}

/// Invert triangular diagonal blocks, one cube per (block, batch entry).
///
/// Block `t` of batch entry `b` reads the `dim`×`dim` triangle at
/// `off_a + b*batch_stride_a + t*step_a` and writes its inverse at
/// `off_inv + b*batch_stride_inv + (t/blocks_per_tile)*tile_stride
///  + (t%blocks_per_tile)*step_inv`.
///
/// Unit `col` produces inverse column `col`, including the zeros of the
/// opposite triangle within the block.
#[cube(launch)]
pub fn block_invert_kernel<F: Float>(
    a: &Tensor<F>,
    inv: &mut Tensor<F>,
    dim: u32,
    lda: u32,
    ldinv: u32,
    off_a: u32,
    off_inv: u32,
    step_a: u32,
    step_inv: u32,
    blocks_per_tile: u32,
    tile_stride: u32,
    batch_stride_a: u32,
    batch_stride_inv: u32,
    lower: u32,
    unit_diag: u32,
) {
    let t = CUBE_POS_X;
    let b = CUBE_POS_Y;
    let col = UNIT_POS_X;

    let base_a = off_a + b * batch_stride_a + t * step_a;
    let base_inv = off_inv
        + b * batch_stride_inv
        + (t / blocks_per_tile) * tile_stride
        + (t % blocks_per_tile) * step_inv;

    if col < dim {
        if lower == 1 {
            // inv(L) column col: forward substitution against e_col.
            for i in 0..col {
                inv[base_inv + i + col * ldinv] = F::new(0.0);
            }

            let mut pivot = F::new(1.0);
            if unit_diag == 0 {
                pivot = F::new(1.0) / a[base_a + col + col * lda];
            }
            inv[base_inv + col + col * ldinv] = pivot;

            for i in (col + 1)..dim {
                let mut s = F::new(0.0);
                for k in col..i {
                    s += a[base_a + i + k * lda] * inv[base_inv + k + col * ldinv];
                }
                let mut x = F::new(0.0) - s;
                if unit_diag == 0 {
                    x = x / a[base_a + i + i * lda];
                }
                inv[base_inv + i + col * ldinv] = x;
            }
        } else {
            // inv(U) column col: backward substitution against e_col.
            for i in (col + 1)..dim {
                inv[base_inv + i + col * ldinv] = F::new(0.0);
            }

            let mut pivot = F::new(1.0);
            if unit_diag == 0 {
                pivot = F::new(1.0) / a[base_a + col + col * lda];
            }
            inv[base_inv + col + col * ldinv] = pivot;

            let mut i = col;
            while i > 0 {
                i -= 1;
                let mut s = F::new(0.0);
                for k in (i + 1)..(col + 1) {
                    s += a[base_a + i + k * lda] * inv[base_inv + k + col * ldinv];
                }
                let mut x = F::new(0.0) - s;
                if unit_diag == 0 {
                    x = x / a[base_a + i + i * lda];
                }
                inv[base_inv + i + col * ldinv] = x;
            }
        }
    }
}

/// Host-side launcher for [`block_invert_kernel`].
///
/// Launches `num_blocks` cubes along X and `batch_count` along Y, with one
/// unit per inverse column. Buffers are passed as flat 1-D views; all
/// addressing goes through [`BlockInvertParams`].
#[allow(clippy::too_many_arguments)]
pub fn launch_block_invert<F, R>(
    client: &ComputeClient<R::Server>,
    a: &Handle,
    a_len: usize,
    inv: &Handle,
    inv_len: usize,
    dim: u32,
    num_blocks: u32,
    batch_count: u32,
    params: BlockInvertParams,
    lower: bool,
    unit_diag: bool,
) where
    F: Float + CubeElement,
    R: Runtime,
{
    let a_shape = [a_len];
    let inv_shape = [inv_len];
    let strides = [1usize];

    let cube_count = CubeCount::Static(num_blocks, batch_count, 1);
    let cube_dim = CubeDim::new(dim, 1, 1);

    unsafe {
        block_invert_kernel::launch::<F, R>(
            client,
            cube_count,
            cube_dim,
            TensorArg::from_raw_parts::<F>(a, &strides, &a_shape, 1),
            TensorArg::from_raw_parts::<F>(inv, &strides, &inv_shape, 1),
            ScalarArg::new(dim),
            ScalarArg::new(params.lda),
            ScalarArg::new(params.ldinv),
            ScalarArg::new(params.off_a),
            ScalarArg::new(params.off_inv),
            ScalarArg::new(params.step_a),
            ScalarArg::new(params.step_inv),
            ScalarArg::new(params.blocks_per_tile),
            ScalarArg::new(params.tile_stride),
            ScalarArg::new(params.batch_stride_a),
            ScalarArg::new(params.batch_stride_inv),
            ScalarArg::new(if lower { 1u32 } else { 0u32 }),
            ScalarArg::new(if unit_diag { 1u32 } else { 0u32 }),
        );
    }
}
