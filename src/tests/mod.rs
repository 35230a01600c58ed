//! Test infrastructure and CPU reference implementations.

pub mod trtri_tests;

// Re-export CPU references for use in other tests
pub use trtri_tests::{cpu_matmul, cpu_trtri};
