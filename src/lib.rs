//! An authenticated append-only vector of 32-byte elements, backed by an
//! unbalanced Merkle tree over Keccak-256 leaf digests.
//!
//! The committed root binds the element count together with the element tree
//! root, making every witness self-describing. Four witness kinds cover the
//! whole lifecycle of a vector:
//!
//! - [`SingleProof`](proof::single::SingleProof): one element — verify it or
//!   replace it.
//! - [`MultiProof`](proof::multi::MultiProof): many elements at once, with a
//!   bit-packed witness — verify them or replace them all.
//! - [`AppendProof`](proof::append::AppendProof): grow the vector by one or
//!   many elements, with a witness of logarithmic size.
//! - [`CombinedProof`](proof::combined::CombinedProof): a multi witness that
//!   additionally lets the verifier derive the append witness, so one pass
//!   authorizes replacement *and* growth.
//!
//! Provers hold a [`MerkleVector`](vector::MerkleVector); verifiers hold
//! nothing but the root, and every engine operation is a pure function of
//! `(root, witness, inputs)`.
//!
//! Sibling digests combine either position-aware
//! ([`Ordered`](hashing::Ordered)) or position-oblivious
//! ([`SortedPair`](hashing::SortedPair)); the bit-packed multi and combined
//! witnesses exist only for the latter.

pub mod bits;
pub mod config;
pub mod digest;
pub mod error;
pub mod hashing;
pub mod prelude;
pub mod proof;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_shared;
