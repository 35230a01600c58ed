//! Blocked triangular inversion into dense diagonal tiles.
//!
//! Inverts the diagonal NB×NB tiles of a batched triangular matrix and writes
//! them as dense, zero-padded tiles for consumption by a blocked triangular
//! solve. Off-tile parts of the inverse are never formed; the solver handles
//! them through substitution.
//!
//! ## Algorithm
//!
//! Each NB×NB tile is split into IBD = 8 leaf blocks of size IB = NB/8 on its
//! diagonal. The leaves are inverted exactly (one kernel, all leaves of all
//! tiles and batch entries at once), the strict opposite triangle of every
//! tile is zeroed, and inverted blocks are then merged pairwise by two GEMMs
//! per pair:
//!
//! ```text
//!        IB        2·IB        4·IB         NB
//!   [i][i][i][i]   [ii][ii]    [iiii]     [iiiiiiii]
//!      pairs    ->   pairs  ->  pair   ->   done
//! ```
//!
//! A trailing remainder of `n mod NB` rows is inverted directly as an
//! independent problem in the last tile.
//!
//! All launches are ordered by the compute client's stream; nothing
//! synchronizes across the batch, sub-block or column axes.

use cubecl_core::client::ComputeClient;
use cubecl_core::prelude::*;
use cubecl_core::server::Handle;

use crate::components::gemm_block::{trtri_gemm_block, BatchGemm, GemmOperand};
use crate::config::{get_trtri_config, BlockFamily, IBD};
use crate::kernels::{
    launch_block_invert, launch_fill_opposite, num_non_tri_elements, BlockInvertParams,
    MatrixSlice,
};
use crate::{TrtriError, TrtriPrecision, TrtriResult};

/// Triangle type (upper or lower storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triangle {
    /// Upper triangular
    Upper,
    /// Lower triangular
    Lower,
}

/// Diagonal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagonal {
    /// Use diagonal elements of A
    NonUnit,
    /// Assume diagonal elements are 1 (unit triangular)
    Unit,
}

/// The batched triangular source matrix, column-major.
///
/// Only the `uplo` triangle is read; the opposite triangle may hold anything.
#[derive(Clone, Copy)]
pub struct SourceMatrix<'a> {
    pub handle: &'a Handle,
    /// Total element length of the buffer.
    pub len: usize,
    /// Element offset of entry (0, 0) of batch entry 0.
    pub offset: usize,
    /// Leading dimension (>= n).
    pub lda: usize,
    /// Element offset between batch entries.
    pub batch_stride: usize,
}

/// The dense inverse-tile output, ld fixed to NB.
///
/// Tile `t` of a batch entry occupies elements `[t·NB·NB, (t+1)·NB·NB)`
/// relative to the entry's base.
#[derive(Clone, Copy)]
pub struct InverseTiles<'a> {
    pub handle: &'a Handle,
    pub len: usize,
    pub offset: usize,
    pub batch_stride: usize,
}

/// Scratch buffer for the intermediate combination products.
#[derive(Clone, Copy)]
pub struct Workspace<'a> {
    pub handle: &'a Handle,
    pub len: usize,
}

/// Required workspace length in elements for a given problem.
///
/// One JB×JB region per (sub-block, batch entry) instance, so the fully
/// batched combination multiplies write disjoint scratch.
pub fn scratch_elements(n: usize, nb: usize, batch_count: usize) -> usize {
    let jb = nb / 2;
    jb * jb * (n / nb) * batch_count
}

/// Invert the diagonal NB×NB tiles of a batched triangular matrix.
///
/// Writes `n/NB` dense tiles plus, when `n % NB > 0`, a trailing tile whose
/// leading `n % NB` columns hold the inverse of the remainder block. Tail
/// elements of the trailing tile are left untouched.
///
/// `NB` must be a multiple of 8. Singular input is not detected: a zero
/// diagonal entry in non-unit mode yields Inf/NaN in the output, never an
/// `Err`. `n == 0` or `batch_count == 0` is a quick success.
///
/// # Example
///
/// ```ignore
/// let gemm = StridedBatched;
/// trtri_trsm::<R, F32Precision, _, 128>(
///     &client,
///     &gemm,
///     Triangle::Lower,
///     Diagonal::NonUnit,
///     n,
///     a,
///     inv_a,
///     c_tmp,
///     batch_count,
/// )?;
/// ```
#[allow(clippy::too_many_arguments)]
pub fn trtri_trsm<R, P, G, const NB: usize>(
    client: &ComputeClient<R::Server>,
    gemm: &G,
    uplo: Triangle,
    diag: Diagonal,
    n: usize,
    a: SourceMatrix<'_>,
    inv_a: InverseTiles<'_>,
    c_tmp: Workspace<'_>,
    batch_count: usize,
) -> TrtriResult<()>
where
    R: Runtime,
    P: TrtriPrecision,
    P::EW: Float + CubeElement,
    G: BatchGemm,
{
    if n == 0 || batch_count == 0 {
        return Ok(());
    }

    let family = BlockFamily::for_nb(NB)?;
    let nb = family.nb;
    let ib = family.ib;
    let jb = family.jb;
    let lda = a.lda;

    if lda < n {
        return Err(TrtriError::InvalidShape {
            reason: format!("leading dimension {} smaller than n = {}", lda, n),
        });
    }

    let sub_blocks = n / nb;
    let rem = n % nb;
    let tiles = sub_blocks + usize::from(rem > 0);

    let a_span = a.offset + (batch_count - 1) * a.batch_stride + (n - 1) * lda + n;
    if a.len < a_span {
        return Err(TrtriError::InvalidShape {
            reason: format!("source buffer holds {} elements, needs {}", a.len, a_span),
        });
    }
    let inv_span = inv_a.offset + (batch_count - 1) * inv_a.batch_stride + tiles * nb * nb;
    if inv_a.len < inv_span {
        return Err(TrtriError::InvalidShape {
            reason: format!(
                "inverse buffer holds {} elements, needs {}",
                inv_a.len, inv_span
            ),
        });
    }
    let required = scratch_elements(n, nb, batch_count);
    if c_tmp.len < required {
        return Err(TrtriError::WorkspaceTooSmall {
            required,
            provided: c_tmp.len,
        });
    }

    // Kernel indices are u32; every flat offset the launches compute is
    // bounded by one of these spans.
    let max_index = a_span.max(inv_span).max(required).max(lda);
    if u32::try_from(max_index).is_err() {
        return Err(TrtriError::InvalidShape {
            reason: format!(
                "flat extent {} exceeds the 32-bit device index range",
                max_index
            ),
        });
    }

    let config = get_trtri_config();
    let lower = uplo == Triangle::Lower;
    let unit_diag = diag == Diagonal::Unit;

    if sub_blocks > 0 {
        // Invert every IB×IB leaf of every full tile in one launch.
        launch_block_invert::<P::EW, R>(
            client,
            a.handle,
            a.len,
            inv_a.handle,
            inv_a.len,
            ib as u32,
            (sub_blocks * IBD) as u32,
            batch_count as u32,
            BlockInvertParams {
                lda: lda as u32,
                ldinv: nb as u32,
                off_a: a.offset as u32,
                off_inv: inv_a.offset as u32,
                step_a: (ib * (lda + 1)) as u32,
                step_inv: (ib * (nb + 1)) as u32,
                blocks_per_tile: IBD as u32,
                tile_stride: (nb * nb) as u32,
                batch_stride_a: a.batch_stride as u32,
                batch_stride_inv: inv_a.batch_stride as u32,
            },
            lower,
            unit_diag,
        );

        // Zero the strict opposite triangle of every full tile.
        launch_fill_opposite::<P::EW, R>(
            client,
            inv_a.handle,
            inv_a.len,
            nb as u32,
            num_non_tri_elements(nb) as u32,
            inv_a.offset as u32,
            (nb * nb) as u32,
            inv_a.batch_stride as u32,
            sub_blocks as u32,
            batch_count as u32,
            config.fill_unit_width,
            lower,
        );

        // Doubling combination: IB -> 2·IB -> 4·IB -> NB. At level s each
        // pair of adjacent inverted s-blocks at diagonal offsets d1, d2
        // yields the off-diagonal inverse block in two multiplies, batched
        // over all sub-blocks and the whole batch.
        let mut s = ib;
        while s < nb {
            let pairs = nb / (2 * s);
            for p in 0..pairs {
                let d1 = 2 * p * s;
                let d2 = d1 + s;

                // lower: invA21 = -invA22 · (A21 · invA11)
                // upper: invA12 = -invA11 · (A12 · invA22)
                let (src_off, first_off, second_off, dest_off) = match uplo {
                    Triangle::Lower => {
                        (d2 + d1 * lda, d1 * (nb + 1), d2 * (nb + 1), d2 + d1 * nb)
                    }
                    Triangle::Upper => {
                        (d1 + d2 * lda, d2 * (nb + 1), d1 * (nb + 1), d1 + d2 * nb)
                    }
                };

                let inv_slice = |off: usize| MatrixSlice {
                    offset: (inv_a.offset + off) as u32,
                    ld: nb as u32,
                    stride: (nb * nb) as u32,
                    batch_stride: inv_a.batch_stride as u32,
                };
                let src = GemmOperand {
                    handle: a.handle,
                    len: a.len,
                    slice: MatrixSlice {
                        offset: (a.offset + src_off) as u32,
                        ld: lda as u32,
                        stride: (nb * (lda + 1)) as u32,
                        batch_stride: a.batch_stride as u32,
                    },
                };
                let inv_first = GemmOperand {
                    handle: inv_a.handle,
                    len: inv_a.len,
                    slice: inv_slice(first_off),
                };
                let inv_second = GemmOperand {
                    handle: inv_a.handle,
                    len: inv_a.len,
                    slice: inv_slice(second_off),
                };
                let dest = GemmOperand {
                    handle: inv_a.handle,
                    len: inv_a.len,
                    slice: inv_slice(dest_off),
                };
                let tmp = GemmOperand {
                    handle: c_tmp.handle,
                    len: c_tmp.len,
                    slice: MatrixSlice {
                        offset: 0,
                        ld: s as u32,
                        stride: (jb * jb) as u32,
                        batch_stride: (jb * jb * sub_blocks) as u32,
                    },
                };

                trtri_gemm_block::<P::EW, R, G>(
                    client,
                    gemm,
                    s as u32,
                    src,
                    inv_first,
                    inv_second,
                    dest,
                    tmp,
                    sub_blocks as u32,
                    batch_count as u32,
                    config.gemm_unit_width,
                )?;
            }
            s *= 2;
        }
    }

    if rem > 0 {
        // The trailing rem×rem block is an independent problem, inverted
        // directly into the leading columns of the last tile. The inverter
        // writes the opposite-triangle zeros of its own columns, so no
        // separate fill pass is needed here.
        launch_block_invert::<P::EW, R>(
            client,
            a.handle,
            a.len,
            inv_a.handle,
            inv_a.len,
            rem as u32,
            1,
            batch_count as u32,
            BlockInvertParams {
                lda: lda as u32,
                ldinv: nb as u32,
                off_a: (a.offset + sub_blocks * nb * (lda + 1)) as u32,
                off_inv: (inv_a.offset + sub_blocks * nb * nb) as u32,
                step_a: 0,
                step_inv: 0,
                blocks_per_tile: 1,
                tile_stride: 0,
                batch_stride_a: a.batch_stride as u32,
                batch_stride_inv: inv_a.batch_stride as u32,
            },
            lower,
            unit_diag,
        );
    }

    Ok(())
}
