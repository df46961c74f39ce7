//! Re-exports the most commonly-used types of this crate.
//!
//! The intention is to simplify the usage of this library. For example:
//!
//! ```
//! use merkle_vector::prelude::*;
//!
//! let elements: Vec<Element> = (0..9_u8).map(|i| Element::new([i; 32])).collect();
//! let vector = MerkleVector::<SortedPair>::from_elements(&elements);
//! let proof = vector.prove_single(3);
//! assert!(proof.verify::<SortedPair>(vector.root(), 9, 3, &elements[3]));
//! ```

pub use crate::bits::minimum_combined_index;
pub use crate::digest::Digest;
pub use crate::digest::Element;
pub use crate::error::ProofError;
pub use crate::hashing::Ordered;
pub use crate::hashing::PairingScheme;
pub use crate::hashing::SortedPair;
pub use crate::proof::append::AppendProof;
pub use crate::proof::combined::CombinedProof;
pub use crate::proof::multi::MultiProof;
pub use crate::proof::single::SingleProof;
pub use crate::vector::MerkleVector;
