//! Block-size family and global configuration.

#[cfg(feature = "std")]
use once_cell::sync::Lazy;

#[cfg(feature = "std")]
use std::sync::RwLock;

#[cfg(feature = "std")]
use std::string::ToString;

#[cfg(not(feature = "std"))]
use alloc::string::ToString;

#[cfg(not(feature = "std"))]
use spin::{Lazy, RwLock};

use crate::{TrtriError, TrtriResult};

/// Default diagonal tile size used by the TRSM caller.
pub const TRTRI_NB: usize = 128;

/// Leaf subdivision factor: each NB tile holds IBD leaf blocks of size
/// IB = NB / IBD on its diagonal. The doubling combination
/// IB -> 2·IB -> 4·IB -> NB requires IBD = 8.
pub const IBD: usize = 8;

/// The derived block-size family for one diagonal tile size.
///
/// `nb` is the dense output tile size, `ib` the directly inverted leaf size,
/// `jb = 4·ib` the largest intermediate combination block (which sizes the
/// per-(sub-block, batch) scratch region).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFamily {
    /// Diagonal tile size (output tiles are nb×nb, ld = nb).
    pub nb: usize,
    /// Leaf block size inverted by the diagonal kernel.
    pub ib: usize,
    /// Largest intermediate combination size (4·ib = nb/2).
    pub jb: usize,
}

impl BlockFamily {
    /// Derive the family for a tile size, rejecting sizes the doubling
    /// recursion is not defined for.
    pub fn for_nb(nb: usize) -> TrtriResult<Self> {
        if nb < IBD || nb % IBD != 0 {
            return Err(TrtriError::UnsupportedBlockSize {
                nb,
                reason: "NB must be a positive multiple of 8".to_string(),
            });
        }
        let ib = nb / IBD;
        Ok(Self { nb, ib, jb: 4 * ib })
    }
}

/// Runtime-tunable knobs for the inversion driver.
///
/// The defaults match the original kernel shapes; override globally via
/// [`set_trtri_config`] for benchmarking or platform tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrtriConfig {
    /// Work units per cube for the zero-padding kernel (elements zeroed
    /// per cube).
    pub fill_unit_width: u32,

    /// Work units per cube for the combination GEMM kernel (output
    /// elements per cube).
    pub gemm_unit_width: u32,
}

impl Default for TrtriConfig {
    fn default() -> Self {
        Self {
            fill_unit_width: 128,
            gemm_unit_width: 256,
        }
    }
}

static GLOBAL_CONFIG: Lazy<RwLock<TrtriConfig>> =
    Lazy::new(|| RwLock::new(TrtriConfig::default()));

/// Set the global driver configuration.
#[cfg(feature = "std")]
pub fn set_trtri_config(config: TrtriConfig) {
    *GLOBAL_CONFIG.write().unwrap() = config;
}

/// Set the global driver configuration.
#[cfg(not(feature = "std"))]
pub fn set_trtri_config(config: TrtriConfig) {
    *GLOBAL_CONFIG.write() = config;
}

/// Get the current global driver configuration.
#[cfg(feature = "std")]
pub fn get_trtri_config() -> TrtriConfig {
    *GLOBAL_CONFIG.read().unwrap()
}

/// Get the current global driver configuration.
#[cfg(not(feature = "std"))]
pub fn get_trtri_config() -> TrtriConfig {
    *GLOBAL_CONFIG.read()
}
