//! Zero-padding of the strict opposite triangle of inverse tiles.
//!
//! The inverse tiles are dense, but only their `uplo` triangle is produced by
//! the inversion kernels. The consumer multiplies against the full tile, so
//! the strict opposite triangle must hold exact zeros.
//!
//! Work is enumerated over the `n(n-1)/2` strict-triangle elements of each
//! tile; a unit decodes its ordinal to (row, column) with a short column
//! search, mirrored for the lower-storage case.

use cubecl_core as cubecl;
use cubecl_core::client::ComputeClient;
use cubecl_core::prelude::*;
use cubecl_core::server::Handle;

/// Number of elements in the strict (off-diagonal) triangle of an n×n matrix.
pub fn num_non_tri_elements(n: usize) -> usize {
    n * (n - 1) / 2
}

/// Zero the strict opposite triangle of every tile.
///
/// Grid: X covers the `num_zero` strict-triangle elements, Y the tiles,
/// Z the batch entries. `num_zero` may describe a leading sub-matrix of the
/// tile (the remainder tile uses `rem(rem-1)/2` with the same `ld`).
///
/// Ordinal `k` maps to the k-th strict-upper element in column-major order;
/// with lower storage that element itself is zeroed, with upper storage its
/// transpose is.
#[cube(launch)]
pub fn fill_opposite_triangle_kernel<F: Float>(
    inv: &mut Tensor<F>,
    ld: u32,
    num_zero: u32,
    off_inv: u32,
    tile_stride: u32,
    batch_stride: u32,
    lower: u32,
) {
    let k = CUBE_POS_X * CUBE_DIM_X + UNIT_POS_X;
    let t = CUBE_POS_Y;
    let b = CUBE_POS_Z;

    if k < num_zero {
        // Column c holds the ordinals [c(c-1)/2, c(c+1)/2).
        let mut c = 1u32;
        while c * (c + 1) / 2 <= k {
            c += 1;
        }
        let r = k - c * (c - 1) / 2;

        let base = off_inv + b * batch_stride + t * tile_stride;
        if lower == 1 {
            inv[base + r + c * ld] = F::new(0.0);
        } else {
            inv[base + c + r * ld] = F::new(0.0);
        }
    }
}

/// Host-side launcher for [`fill_opposite_triangle_kernel`].
///
/// `unit_width` units per cube along X; one cube row per tile, one layer per
/// batch entry.
#[allow(clippy::too_many_arguments)]
pub fn launch_fill_opposite<F, R>(
    client: &ComputeClient<R::Server>,
    inv: &Handle,
    inv_len: usize,
    ld: u32,
    num_zero: u32,
    off_inv: u32,
    tile_stride: u32,
    batch_stride: u32,
    num_tiles: u32,
    batch_count: u32,
    unit_width: u32,
    lower: bool,
) where
    F: Float + CubeElement,
    R: Runtime,
{
    if num_zero == 0 {
        return;
    }

    let inv_shape = [inv_len];
    let strides = [1usize];

    let cube_count = CubeCount::Static(num_zero.div_ceil(unit_width), num_tiles, batch_count);
    let cube_dim = CubeDim::new(unit_width, 1, 1);

    unsafe {
        fill_opposite_triangle_kernel::launch::<F, R>(
            client,
            cube_count,
            cube_dim,
            TensorArg::from_raw_parts::<F>(inv, &strides, &inv_shape, 1),
            ScalarArg::new(ld),
            ScalarArg::new(num_zero),
            ScalarArg::new(off_inv),
            ScalarArg::new(tile_stride),
            ScalarArg::new(batch_stride),
            ScalarArg::new(if lower { 1u32 } else { 0u32 }),
        );
    }
}
