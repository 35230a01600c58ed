//! Block combination: merge two adjacent inverted diagonal blocks.
//!
//! Combining inverted blocks A11 and A22 with the off-diagonal block of A
//! takes two multiplies through a scratch buffer:
//!
//! ```text
//! lower:  tmp = A21 · invA11         invA21 = -invA22 · tmp
//! upper:  tmp = A12 · invA22         invA12 = -invA11 · tmp
//! ```
//!
//! Both multiplies run batched over every sub-block and every batch entry.
//! How that batching maps onto launches is the [`BatchGemm`] capability:
//! strided single-launch, or one launch per batch entry.

use cubecl_core::client::ComputeClient;
use cubecl_core::prelude::*;
use cubecl_core::server::Handle;

use crate::kernels::{launch_gemm_strided_batched, MatrixSlice};
use crate::TrtriResult;

/// One GEMM operand: a flat device buffer plus per-instance addressing.
#[derive(Clone, Copy)]
pub struct GemmOperand<'a> {
    pub handle: &'a Handle,
    /// Total element length of the buffer (for the flat tensor view).
    pub len: usize,
    pub slice: MatrixSlice,
}

/// Dimensions of one GEMM instance: A is m×k, B k×n, C m×n, column-major.
#[derive(Debug, Clone, Copy)]
pub struct GemmShape {
    pub m: u32,
    pub n: u32,
    pub k: u32,
}

/// How a two-axis batch of small GEMMs is mapped onto kernel launches.
pub trait BatchGemm {
    /// `C = alpha * A * B` for every (sub-block, batch entry) instance.
    #[allow(clippy::too_many_arguments)]
    fn run<F, R>(
        &self,
        client: &ComputeClient<R::Server>,
        a: GemmOperand<'_>,
        b: GemmOperand<'_>,
        c: GemmOperand<'_>,
        shape: GemmShape,
        alpha: F,
        sub_blocks: u32,
        batch_count: u32,
        unit_width: u32,
    ) -> TrtriResult<()>
    where
        F: Float + CubeElement,
        R: Runtime;
}

/// One launch for the whole batch; batch strides carried as scalar args.
#[derive(Debug, Clone, Copy, Default)]
pub struct StridedBatched;

impl BatchGemm for StridedBatched {
    fn run<F, R>(
        &self,
        client: &ComputeClient<R::Server>,
        a: GemmOperand<'_>,
        b: GemmOperand<'_>,
        c: GemmOperand<'_>,
        shape: GemmShape,
        alpha: F,
        sub_blocks: u32,
        batch_count: u32,
        unit_width: u32,
    ) -> TrtriResult<()>
    where
        F: Float + CubeElement,
        R: Runtime,
    {
        launch_gemm_strided_batched::<F, R>(
            client,
            a.handle,
            a.len,
            a.slice,
            b.handle,
            b.len,
            b.slice,
            c.handle,
            c.len,
            c.slice,
            shape.m,
            shape.n,
            shape.k,
            alpha,
            sub_blocks,
            batch_count,
            unit_width,
        );
        Ok(())
    }
}

/// One launch per batch entry, batch offset folded into the base offsets.
///
/// This is the call shape of per-matrix (pointer-array) batching expressed
/// in the flat-offset model; useful when batch entries live at irregular
/// offsets encoded in the operand slices by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerMatrixBatched;

impl BatchGemm for PerMatrixBatched {
    fn run<F, R>(
        &self,
        client: &ComputeClient<R::Server>,
        a: GemmOperand<'_>,
        b: GemmOperand<'_>,
        c: GemmOperand<'_>,
        shape: GemmShape,
        alpha: F,
        sub_blocks: u32,
        batch_count: u32,
        unit_width: u32,
    ) -> TrtriResult<()>
    where
        F: Float + CubeElement,
        R: Runtime,
    {
        for bat in 0..batch_count {
            let fold = |op: GemmOperand<'_>| MatrixSlice {
                offset: op.slice.offset + bat * op.slice.batch_stride,
                ld: op.slice.ld,
                stride: op.slice.stride,
                batch_stride: 0,
            };
            launch_gemm_strided_batched::<F, R>(
                client,
                a.handle,
                a.len,
                fold(a),
                b.handle,
                b.len,
                fold(b),
                c.handle,
                c.len,
                fold(c),
                shape.m,
                shape.n,
                shape.k,
                alpha,
                sub_blocks,
                1,
                unit_width,
            );
        }
        Ok(())
    }
}

/// The two-multiply combination for one doubling level and pair position.
///
/// All five operands address square `dim`×`dim` blocks. `inv_second` and
/// `dest` alias the inverse-tile buffer on disjoint regions; the second
/// multiply only starts after the first in stream order, so `tmp` is safe to
/// reuse across calls.
#[allow(clippy::too_many_arguments)]
pub fn trtri_gemm_block<F, R, G>(
    client: &ComputeClient<R::Server>,
    gemm: &G,
    dim: u32,
    src: GemmOperand<'_>,
    inv_first: GemmOperand<'_>,
    inv_second: GemmOperand<'_>,
    dest: GemmOperand<'_>,
    tmp: GemmOperand<'_>,
    sub_blocks: u32,
    batch_count: u32,
    unit_width: u32,
) -> TrtriResult<()>
where
    F: Float + CubeElement,
    R: Runtime,
    G: BatchGemm,
{
    let shape = GemmShape {
        m: dim,
        n: dim,
        k: dim,
    };

    gemm.run::<F, R>(
        client,
        src,
        inv_first,
        tmp,
        shape,
        F::from_int(1),
        sub_blocks,
        batch_count,
        unit_width,
    )?;
    gemm.run::<F, R>(
        client,
        inv_second,
        tmp,
        dest,
        shape,
        F::from_int(-1),
        sub_blocks,
        batch_count,
        unit_width,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    type TestRuntime = cubecl_cpu::CpuRuntime;

    fn operand<'a>(handle: &'a Handle, len: usize, offset: u32, ld: u32) -> GemmOperand<'a> {
        GemmOperand {
            handle,
            len,
            slice: MatrixSlice {
                offset,
                ld,
                stride: 0,
                batch_stride: (len / 2) as u32,
            },
        }
    }

    #[test]
    fn test_strided_and_per_matrix_agree() {
        let device = Default::default();
        let client = TestRuntime::client(&device);

        // Two batch entries of a 2×2 product.
        let a_data = vec![1.0_f32, 3.0, 2.0, 4.0, 2.0, 1.0, 0.0, 3.0];
        let b_data = vec![1.0_f32, 0.0, 1.0, 2.0, 4.0, 1.0, 2.0, 2.0];
        let a = client.create(bytemuck::cast_slice(&a_data));
        let b = client.create(bytemuck::cast_slice(&b_data));
        let c1 = client.create(bytemuck::cast_slice(&vec![0.0_f32; 8]));
        let c2 = client.create(bytemuck::cast_slice(&vec![0.0_f32; 8]));

        let shape = GemmShape { m: 2, n: 2, k: 2 };

        StridedBatched
            .run::<f32, TestRuntime>(
                &client,
                operand(&a, 8, 0, 2),
                operand(&b, 8, 0, 2),
                operand(&c1, 8, 0, 2),
                shape,
                1.0,
                1,
                2,
                64,
            )
            .unwrap();
        PerMatrixBatched
            .run::<f32, TestRuntime>(
                &client,
                operand(&a, 8, 0, 2),
                operand(&b, 8, 0, 2),
                operand(&c2, 8, 0, 2),
                shape,
                1.0,
                1,
                2,
                64,
            )
            .unwrap();

        let r1 = client.read(c1.binding());
        let r2 = client.read(c2.binding());
        let v1 = f32::from_bytes(&r1);
        let v2 = f32::from_bytes(&r2);
        for i in 0..8 {
            assert_relative_eq!(v1[i], v2[i]);
        }
        // Spot-check entry (0,0) of batch 0: [1,2;3,4]·[1,1;0,2] col-major.
        assert_relative_eq!(v1[0], 1.0);
    }
}
