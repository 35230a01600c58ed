//! Tests for blocked triangular inversion against CPU references.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

/// CPU reference: exact triangular inversion (unblocked, column by column).
///
/// `a` is column-major n×n with leading dimension `lda`; only the `lower`
/// triangle is read. Returns a dense n×n inverse (ld = n) with exact zeros
/// in the opposite triangle.
pub fn cpu_trtri(a: &[f32], n: usize, lda: usize, lower: bool, unit_diag: bool) -> Vec<f32> {
    let mut inv = vec![0.0_f32; n * n];
    let get = |i: usize, j: usize| -> f32 {
        if i == j && unit_diag {
            1.0
        } else {
            a[i + j * lda]
        }
    };

    for col in 0..n {
        if lower {
            inv[col + col * n] = 1.0 / get(col, col);
            for i in (col + 1)..n {
                let mut s = 0.0;
                for k in col..i {
                    s += get(i, k) * inv[k + col * n];
                }
                inv[i + col * n] = -s / get(i, i);
            }
        } else {
            inv[col + col * n] = 1.0 / get(col, col);
            for i in (0..col).rev() {
                let mut s = 0.0;
                for k in (i + 1)..=col {
                    s += get(i, k) * inv[k + col * n];
                }
                inv[i + col * n] = -s / get(i, i);
            }
        }
    }

    inv
}

/// CPU reference: dense column-major matrix product C = A * B.
pub fn cpu_matmul(a: &[f32], b: &[f32], n: usize) -> Vec<f32> {
    let mut c = vec![0.0_f32; n * n];
    for j in 0..n {
        for i in 0..n {
            let mut s = 0.0;
            for k in 0..n {
                s += a[i + k * n] * b[k + j * n];
            }
            c[i + j * n] = s;
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::gemm_block::StridedBatched;
    use crate::components::trtri::{
        scratch_elements, trtri_trsm, Diagonal, InverseTiles, SourceMatrix, Triangle, Workspace,
    };
    use crate::F32Precision;
    use approx::assert_relative_eq;
    use cubecl_core::prelude::*;
    use cubecl_core::Runtime;

    // Define test runtime
    type TestRuntime = cubecl_cpu::CpuRuntime;

    const NB: usize = 16;

    fn triangular_matrix(n: usize, lda: usize, lower: bool, seed: usize) -> Vec<f32> {
        let mut a = vec![0.0_f32; lda * n];
        for j in 0..n {
            for i in 0..n {
                let in_triangle = if lower { i >= j } else { i <= j };
                if in_triangle {
                    a[i + j * lda] = if i == j {
                        2.5 + ((i * 11 + seed) % 7) as f32 * 0.2
                    } else {
                        ((i * 17 + j * 23 + seed) % 13) as f32 * 0.06 - 0.36
                    };
                }
            }
        }
        a
    }

    /// Run the full pipeline and compare every diagonal tile against the
    /// CPU reference inverse of the same block.
    fn check_against_reference_impl<R: Runtime>(
        device: &R::Device,
        n: usize,
        lower: bool,
        unit_diag: bool,
        batch_count: usize,
    ) {
        let client = R::client(device);

        let lda = n;
        let mut a_data = Vec::new();
        for seed in 0..batch_count {
            a_data.extend(triangular_matrix(n, lda, lower, seed));
        }

        let sub_blocks = n / NB;
        let rem = n % NB;
        let tiles = sub_blocks + usize::from(rem > 0);
        let inv_len = tiles * NB * NB * batch_count;
        let scratch = scratch_elements(n, NB, batch_count).max(1);

        let a_handle = client.create(f32::as_bytes(&a_data));
        let inv_handle = client.create(f32::as_bytes(&vec![0.0_f32; inv_len]));
        let tmp_handle = client.create(f32::as_bytes(&vec![0.0_f32; scratch]));

        trtri_trsm::<R, F32Precision, _, NB>(
            &client,
            &StridedBatched,
            if lower { Triangle::Lower } else { Triangle::Upper },
            if unit_diag { Diagonal::Unit } else { Diagonal::NonUnit },
            n,
            SourceMatrix {
                handle: &a_handle,
                len: a_data.len(),
                offset: 0,
                lda,
                batch_stride: lda * n,
            },
            InverseTiles {
                handle: &inv_handle,
                len: inv_len,
                offset: 0,
                batch_stride: tiles * NB * NB,
            },
            Workspace {
                handle: &tmp_handle,
                len: scratch,
            },
            batch_count,
        )
        .expect("inversion failed");

        let bytes = client.read(inv_handle.binding());
        let inv = f32::from_bytes(&bytes);

        for b in 0..batch_count {
            let a_entry = &a_data[b * lda * n..(b + 1) * lda * n];
            for t in 0..tiles {
                let d = t * NB;
                let m = if t < sub_blocks { NB } else { rem };

                // CPU reference inverse of the m×m diagonal block at d.
                let mut block = vec![0.0_f32; m * m];
                for j in 0..m {
                    for i in 0..m {
                        block[i + j * m] = a_entry[(d + i) + (d + j) * lda];
                    }
                }
                let expected = cpu_trtri(&block, m, m, lower, unit_diag);

                let tile = &inv[b * tiles * NB * NB + t * NB * NB..];
                for j in 0..m {
                    for i in 0..m {
                        assert_relative_eq!(
                            tile[i + j * NB],
                            expected[i + j * m],
                            epsilon = 1e-3,
                            max_relative = 1e-3,
                        );
                    }
                }
            }
        }

        println!(
            "✓ n={} lower={} unit={} batch={} matches CPU reference",
            n, lower, unit_diag, batch_count
        );
    }

    #[test]
    fn test_cpu_trtri_round_trips() {
        // Sanity of the reference itself: A * inv(A) = I.
        let n = 6;
        let a = triangular_matrix(n, n, true, 1);
        let inv = cpu_trtri(&a, n, n, true, false);
        let prod = cpu_matmul(&a, &inv, n);
        for j in 0..n {
            for i in 0..n {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(prod[i + j * n], expect, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_lower_single_tile() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, NB, true, false, 1);
    }

    #[test]
    fn test_lower_multiple_tiles() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, 5 * NB, true, false, 1);
    }

    #[test]
    fn test_upper_multiple_tiles() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, 3 * NB, false, false, 1);
    }

    #[test]
    fn test_lower_with_remainder() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, 2 * NB + 5, true, false, 1);
    }

    #[test]
    fn test_upper_with_remainder() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, 2 * NB + 7, false, false, 1);
    }

    #[test]
    fn test_small_problem() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, 9, true, false, 1);
    }

    #[test]
    fn test_batched_distinct_entries() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, 2 * NB, true, false, 4);
    }

    #[test]
    fn test_unit_diag_batched() {
        let device = Default::default();
        check_against_reference_impl::<TestRuntime>(&device, 2 * NB, true, true, 2);
    }
}
