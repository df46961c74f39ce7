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
use crate::vector::element_root_from_leaf_digests;

/// Witness for growing the vector at the end: the element count plus the
/// roots of the perfect subtrees on the right frontier, largest subtree
/// first. There are `element_count.count_ones()` of them, and none at all
/// for the empty vector.
///
/// Folding the frontier right to left reproduces the old element root;
/// replaying the appended leaves against the same frontier produces the new
/// one. Appends never touch anything left of the frontier, which is why this
/// witness stays logarithmic no matter how many elements are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Arbitrary)]
pub struct AppendProof {
    element_count: u32,
    decommitments: Vec<Digest>,
}

impl AppendProof {
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
        let element_count = count_from_word(count)?;
        if decommitments.len() != element_count.count_ones() as usize {
            return Err(ProofError::InvalidProof);
        }

        Ok(Self {
            element_count,
            decommitments: decommitments.to_vec(),
        })
    }

    /// Append a single element and return the committed root of the grown
    /// vector.
    pub fn append_one<M>(&self, root: Digest, element: &Element) -> Result<Digest, ProofError>
    where
        M: PairingScheme,
    {
        if root.is_zero() != (self.element_count == 0) {
            return Err(ProofError::InvalidTree);
        }
        if self.element_count == 0 {
            return Ok(committed_root(1, &leaf_hash(element)));
        }
        let new_count = self
            .element_count
            .checked_add(1)
            .ok_or(ProofError::InvalidProof)?;

        let (element_root, new_element_root) = self.single_append_roots::<M>(leaf_hash(element))?;
        if committed_root(self.element_count, &element_root) != root {
            return Err(ProofError::InvalidProof);
        }

        Ok(committed_root(new_count, &new_element_root))
    }

    /// Append any number of elements and return the committed root of the
    /// grown vector. Appending nothing verifies the witness and returns the
    /// root unchanged.
    pub fn append_many<M>(&self, root: Digest, elements: &[Element]) -> Result<Digest, ProofError>
    where
        M: PairingScheme,
    {
        if root.is_zero() != (self.element_count == 0) {
            return Err(ProofError::InvalidTree);
        }

        if self.element_count == 0 {
            if elements.is_empty() {
                return Ok(Digest::ZERO);
            }
            let leaf_digests: Vec<_> = elements.iter().map(leaf_hash).collect();
            let element_root = element_root_from_leaf_digests::<M>(&leaf_digests);
            return Ok(committed_root(elements.len() as u32, &element_root));
        }

        if elements.is_empty() {
            let element_root = self.fold_element_root::<M>()?;
            if committed_root(self.element_count, &element_root) != root {
                return Err(ProofError::InvalidProof);
            }
            return Ok(root);
        }

        let new_count = (self.element_count as u64)
            .checked_add(elements.len() as u64)
            .filter(|&count| u32::try_from(count).is_ok())
            .ok_or(ProofError::InvalidProof)? as u32;

        let leaf_digests: Vec<_> = elements.iter().map(leaf_hash).collect();
        let (element_root, new_element_root) = self.multi_append_roots::<M>(&leaf_digests)?;
        if committed_root(self.element_count, &element_root) != root {
            return Err(ProofError::InvalidProof);
        }

        Ok(committed_root(new_count, &new_element_root))
    }

    /// Fold the frontier right to left into the element root it represents.
    pub(crate) fn fold_element_root<M>(&self) -> Result<Digest, ProofError>
    where
        M: PairingScheme,
    {
        let frontier_size = self.element_count.count_ones() as usize;
        if frontier_size == 0 || self.decommitments.len() != frontier_size {
            return Err(ProofError::InvalidProof);
        }

        let mut element_root = self.decommitments[frontier_size - 1];
        for decommitment in self.decommitments[..frontier_size - 1].iter().rev() {
            element_root = M::combine(decommitment, &element_root);
        }

        Ok(element_root)
    }

    /// Reconstruct the old element root and compute the new one with one
    /// leaf appended. The new leaf starts at the deepest frontier subtree
    /// and absorbs every frontier root on its way to the top; the old root
    /// is folded from the same digests one position behind.
    fn single_append_roots<M>(&self, leaf: Digest) -> Result<(Digest, Digest), ProofError>
    where
        M: PairingScheme,
    {
        let frontier_size = self.element_count.count_ones() as usize;
        if frontier_size == 0 || self.decommitments.len() != frontier_size {
            return Err(ProofError::InvalidProof);
        }

        let mut new_element_root = leaf;
        let mut element_root = self.decommitments[frontier_size - 1];
        for position in (0..frontier_size).rev() {
            new_element_root = M::combine(&self.decommitments[position], &new_element_root);
            if position > 0 {
                element_root = M::combine(&self.decommitments[position - 1], &element_root);
            }
        }

        Ok((element_root, new_element_root))
    }

    /// Reconstruct the old element root and compute the new one with all of
    /// `leaf_digests` appended, by simulating the levels of the grown tree.
    ///
    /// Positions `element_count >> level` through `(element_count +
    /// appended - 1) >> level` of each level are materialized in a small
    /// pending buffer. A level whose left-most pending node sits at an odd
    /// position joins it with the frontier root to its left; everything
    /// further right pairs up inside the buffer; a lone tail node is carried
    /// up unchanged.
    pub(crate) fn multi_append_roots<M>(
        &self,
        leaf_digests: &[Digest],
    ) -> Result<(Digest, Digest), ProofError>
    where
        M: PairingScheme,
    {
        let frontier_size = self.element_count.count_ones() as usize;
        if frontier_size == 0 || self.decommitments.len() != frontier_size {
            return Err(ProofError::InvalidProof);
        }
        debug_assert!(!leaf_digests.is_empty());

        let mut pending = leaf_digests.to_vec();
        let mut read = 0;
        let mut write = 0;

        let mut offset = self.element_count as u64;
        let mut index = offset;
        let mut upper = offset + leaf_digests.len() as u64 - 1;

        // walks the frontier from the deepest subtree outwards
        let mut frontier = frontier_size;
        let mut element_root = self.decommitments[frontier - 1];

        while upper > 0 {
            if write == 0 && index & 1 == 1 {
                let joined = M::combine(&self.decommitments[frontier - 1], &pending[read]);
                pending[0] = joined;

                if frontier > 1 {
                    frontier -= 1;
                    element_root = M::combine(&self.decommitments[frontier - 1], &element_root);
                }

                write = 1;
                read += 1;
                index += 1;
            } else if index < upper {
                let merged = M::combine(&pending[read], &pending[read + 1]);
                pending[write] = merged;
                write += 1;
                read += 2;
                index += 2;
            }

            if index >= upper {
                if index == upper {
                    // lone tail node, no right sibling
                    pending[write] = pending[read];
                }
                read = 0;
                write = 0;
                offset >>= 1;
                index = offset;
                upper >>= 1;
            }
        }

        Ok((element_root, pending[0]))
    }
}
