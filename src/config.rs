//! Performance tuning. Nothing in here affects results, only how they are
//! computed.
//!
//! The crate has exactly one knob: the element count at which
//! [`MerkleVector::from_elements`](crate::vector::MerkleVector::from_elements)
//! stops hashing leaves sequentially and fans out over all cores. Hashing a
//! leaf is cheap, so below a few hundred elements the rayon dispatch overhead
//! outweighs the parallelism.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

const CUTOFF_ENV_VAR: &str = "MERKLE_VECTOR_PARALLELIZATION_CUTOFF";
const DEFAULT_CUTOFF: usize = 512;

// a cutoff below 2 would "parallelize" single-leaf vectors
const MINIMUM_CUTOFF: usize = 2;

static CONFIGURED_CUTOFF: AtomicUsize = AtomicUsize::new(DEFAULT_CUTOFF);

/// Sets the element count at which leaf hashing becomes parallel.
///
/// Building a vector from fewer elements than the cutoff hashes its leaves on
/// the calling thread; anything at or above it is distributed over all
/// available cores. The default is 512, and values below 2 are raised to 2.
///
/// The environment variable `MERKLE_VECTOR_PARALLELIZATION_CUTOFF`, when set
/// to a valid number at first use, wins over any value passed here.
pub fn set_leaf_hashing_parallelization_cutoff(cutoff: usize) {
    CONFIGURED_CUTOFF.store(cutoff.max(MINIMUM_CUTOFF), Ordering::Relaxed);
}

pub(crate) fn leaf_hashing_parallelization_cutoff() -> usize {
    match cutoff_from_environment() {
        Some(cutoff) => cutoff.max(MINIMUM_CUTOFF),
        None => CONFIGURED_CUTOFF.load(Ordering::Relaxed),
    }
}

/// The environment override, parsed once and cached for the lifetime of the
/// process.
fn cutoff_from_environment() -> Option<usize> {
    static ENV_CUTOFF: OnceLock<Option<usize>> = OnceLock::new();
    *ENV_CUTOFF.get_or_init(|| std::env::var(CUTOFF_ENV_VAR).ok()?.parse().ok())
}
