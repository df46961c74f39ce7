//! Keccak-256 node hashing and the two pairing modes.
//!
//! Everything in this crate hashes with bit-exact Keccak-256 (not the padded
//! FIPS SHA3-256). Internal nodes are the hash of their concatenated
//! children; leaves are domain-separated from internal nodes by a 32-byte
//! zero prefix; the committed root binds the element count to the element
//! tree root.

use std::fmt::Debug;

use sha3::Digest as _;
use sha3::Keccak256;

use crate::digest::Digest;
use crate::digest::Element;

/// `Keccak256(left ‖ right)`.
pub fn node_hash(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Digest::new(hasher.finalize().into())
}

/// [`node_hash`] with the operands in canonical order: the numerically
/// smaller digest (big-endian) goes left.
///
/// Discarding the operand order is what allows multi proofs to describe each
/// replay step with a single bit instead of a position.
pub fn pair_hash(a: &Digest, b: &Digest) -> Digest {
    if a <= b {
        node_hash(a, b)
    } else {
        node_hash(b, a)
    }
}

/// The leaf digest of an element: `Keccak256(0³² ‖ element)`.
///
/// The zero prefix separates raw caller payloads from internal node digests.
/// Without it, a 64-byte payload could be confused with a pair of children.
pub fn leaf_hash(element: &Element) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(Digest::ZERO.as_bytes());
    hasher.update(element.as_bytes());
    Digest::new(hasher.finalize().into())
}

/// The element count as a 32-byte big-endian word, as it appears both in the
/// committed root preimage and as word 0 of every witness.
pub fn count_word(element_count: u32) -> Digest {
    let mut bytes = [0; Digest::BYTES];
    bytes[Digest::BYTES - 4..].copy_from_slice(&element_count.to_be_bytes());
    Digest::new(bytes)
}

/// The committed root: `Keccak256(be_u256(element_count) ‖ element_root)`.
///
/// Always computes the hash, even for a count of zero. The all-zero root of
/// the empty vector is a convention of the builder, not of this function;
/// verifiers must never treat a zero count as a shortcut.
pub fn committed_root(element_count: u32, element_root: &Digest) -> Digest {
    node_hash(&count_word(element_count), element_root)
}

/// How two sibling digests combine into their parent. Chosen per vector, at
/// compile time.
pub trait PairingScheme: Clone + Copy + Debug + Send + Sync + 'static {
    fn combine(left: &Digest, right: &Digest) -> Digest;
}

/// Position-preserving pairing: parents commit to which child was left and
/// which was right. Single and append proofs work in this mode; the
/// bit-encoded multi proof does not, since its witness carries no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ordered;

impl PairingScheme for Ordered {
    fn combine(left: &Digest, right: &Digest) -> Digest {
        node_hash(left, right)
    }
}

/// Position-discarding pairing via [`pair_hash`]. Required for multi and
/// combined proofs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortedPair;

impl PairingScheme for SortedPair {
    fn combine(left: &Digest, right: &Digest) -> Digest {
        pair_hash(left, right)
    }
}
