use arbitrary::Arbitrary;
use serde::Deserialize;
use serde::Serialize;

use super::count_from_word;
use crate::digest::Digest;
use crate::digest::Element;
use crate::error::ProofError;
use crate::hashing::committed_root;
use crate::hashing::count_word;
use crate::hashing::leaf_hash;
use crate::hashing::PairingScheme;

/// Witness for one element of the vector: the element count plus one sibling
/// digest per level of the climb, deepest first.
///
/// Levels where the climbing node sits at the right edge of an unbalanced
/// level (no right sibling) contribute no digest — the node is carried up
/// unchanged — so the witness can be shorter than the tree is high.
///
/// The same witness serves both directions: [`verify`](Self::verify) checks
/// membership, [`update`](Self::update) additionally derives the committed
/// root after the element is replaced. Both climbs traverse the same
/// siblings, which is what guarantees the new root differs from the old one
/// only along the touched path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Arbitrary)]
pub struct SingleProof {
    element_count: u32,
    decommitments: Vec<Digest>,
}

impl SingleProof {
    pub fn new(element_count: u32, decommitments: Vec<Digest>) -> Self {
        Self {
            element_count,
            decommitments,
        }
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn decommitments(&self) -> &[Digest] {
        &self.decommitments
    }

    pub fn to_words(&self) -> Vec<Digest> {
        let mut words = Vec::with_capacity(1 + self.decommitments.len());
        words.push(count_word(self.element_count));
        words.extend_from_slice(&self.decommitments);

        words
    }

    pub fn from_words(words: &[Digest]) -> Result<Self, ProofError> {
        let (count, decommitments) = words.split_first().ok_or(ProofError::InvalidProof)?;

        Ok(Self {
            element_count: count_from_word(count)?,
            decommitments: decommitments.to_vec(),
        })
    }

    /// Drive every register from the leaf level to the element root, all of
    /// them through the same witness digests.
    fn climb<M>(&self, index: u32, registers: &mut [Digest]) -> Result<(), ProofError>
    where
        M: PairingScheme,
    {
        if self.element_count == 0 || index >= self.element_count {
            return Err(ProofError::InvalidProof);
        }

        let mut idx = index;
        let mut upper = self.element_count - 1;
        let mut decommitments = self.decommitments.iter();
        while upper > 0 {
            // a left node at the very edge of an unbalanced level has no
            // sibling and moves up as-is
            if idx != upper || idx & 1 == 1 {
                let decommitment = decommitments.next().ok_or(ProofError::InvalidProof)?;
                for register in registers.iter_mut() {
                    *register = if idx & 1 == 1 {
                        M::combine(decommitment, register)
                    } else {
                        M::combine(register, decommitment)
                    };
                }
            }
            idx >>= 1;
            upper >>= 1;
        }
        if decommitments.next().is_some() {
            return Err(ProofError::InvalidProof);
        }

        Ok(())
    }

    /// Whether `element` is the `index`-th element of the vector committed
    /// to by `root` with `element_count` elements.
    pub fn verify<M>(&self, root: Digest, element_count: u32, index: u32, element: &Element) -> bool
    where
        M: PairingScheme,
    {
        if element_count != self.element_count {
            return false;
        }
        let mut registers = [leaf_hash(element)];
        if self.climb::<M>(index, &mut registers).is_err() {
            return false;
        }
        let [element_root] = registers;

        committed_root(self.element_count, &element_root) == root
    }

    /// Replace the `index`-th element and return the committed root of the
    /// mutated vector. The element count is unchanged.
    pub fn update<M>(
        &self,
        root: Digest,
        index: u32,
        element: &Element,
        new_element: &Element,
    ) -> Result<Digest, ProofError>
    where
        M: PairingScheme,
    {
        if root.is_zero() != (self.element_count == 0) || self.element_count == 0 {
            return Err(ProofError::EmptyTree);
        }

        let mut registers = [leaf_hash(element), leaf_hash(new_element)];
        self.climb::<M>(index, &mut registers)?;
        let [element_root, new_element_root] = registers;

        if committed_root(self.element_count, &element_root) != root {
            return Err(ProofError::InvalidProof);
        }

        Ok(committed_root(self.element_count, &new_element_root))
    }
}
