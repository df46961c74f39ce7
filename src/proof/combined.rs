use arbitrary::Arbitrary;
use serde::Deserialize;
use serde::Serialize;

use super::multi::MultiProof;
use crate::digest::Digest;
use crate::digest::Element;
use crate::error::ProofError;
use crate::hashing::committed_root;
use crate::hashing::leaf_hash;
use crate::hashing::SortedPair;

/// A multi witness that doubles as an append witness.
///
/// When the proven indices reach into the deepest frontier subtree (see
/// [`minimum_combined_index`][min]), the multi replay passes through the
/// right-most node of every level, and the frontier roots an append witness
/// would list can be skimmed off along the way. One witness then authorizes
/// membership, replacement, *and* growth in a single pass.
///
/// The derived frontier is bound back to the reconstructed element root
/// before any appending happens, so an index set that silently fails the
/// precondition is rejected rather than trusted.
///
/// [min]: crate::bits::minimum_combined_index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Arbitrary)]
pub struct CombinedProof {
    multi: MultiProof,
}

impl CombinedProof {
    pub fn multi(&self) -> &MultiProof {
        &self.multi
    }

    pub fn element_count(&self) -> u32 {
        self.multi.element_count()
    }

    pub fn to_words(&self) -> Vec<Digest> {
        self.multi.to_words()
    }

    pub fn from_words(words: &[Digest]) -> Result<Self, ProofError> {
        MultiProof::from_words(words).map(Self::from)
    }

    /// Check membership of `elements` (strictly decreasing index order),
    /// then append `append_elements` and return the committed root of the
    /// grown vector.
    pub fn verify_and_append(
        &self,
        root: Digest,
        elements: &[Element],
        append_elements: &[Element],
    ) -> Result<Digest, ProofError> {
        let leaf_digests = elements.iter().map(leaf_hash).collect();
        let replay = self.multi.replay(leaf_digests, None, true)?;

        let element_count = self.multi.element_count();
        if committed_root(element_count, &replay.element_root) != root {
            return Err(ProofError::InvalidProof);
        }
        let Some(frontier) = replay.frontier else {
            return Err(ProofError::InvalidProof);
        };

        if append_elements.is_empty() {
            if frontier.fold_element_root::<SortedPair>()? != replay.element_root {
                return Err(ProofError::InvalidProof);
            }
            return Ok(root);
        }

        let new_count = (element_count as u64)
            .checked_add(append_elements.len() as u64)
            .filter(|&count| u32::try_from(count).is_ok())
            .ok_or(ProofError::InvalidProof)? as u32;

        let append_leaf_digests: Vec<_> = append_elements.iter().map(leaf_hash).collect();
        let (folded_root, new_element_root) =
            frontier.multi_append_roots::<SortedPair>(&append_leaf_digests)?;
        if folded_root != replay.element_root {
            return Err(ProofError::InvalidProof);
        }

        Ok(committed_root(new_count, &new_element_root))
    }

    /// Replace the proven elements, then append `append_elements` to the
    /// updated vector, all against one witness. Returns the committed root
    /// after both mutations.
    ///
    /// The frontier is skimmed from the shadow queue, so the appended leaves
    /// attach to the vector as it looks *after* the replacements.
    pub fn update_and_append(
        &self,
        root: Digest,
        elements: &[Element],
        new_elements: &[Element],
        append_elements: &[Element],
    ) -> Result<Digest, ProofError> {
        if elements.len() != new_elements.len() {
            return Err(ProofError::LengthMismatch {
                expected: elements.len(),
                actual: new_elements.len(),
            });
        }

        let leaf_digests = elements.iter().map(leaf_hash).collect();
        let new_leaf_digests = new_elements.iter().map(leaf_hash).collect();
        let replay = self.multi.replay(leaf_digests, Some(new_leaf_digests), true)?;

        let element_count = self.multi.element_count();
        if committed_root(element_count, &replay.element_root) != root {
            return Err(ProofError::InvalidProof);
        }
        let Some(frontier) = replay.frontier else {
            return Err(ProofError::InvalidProof);
        };
        let Some(new_element_root) = replay.new_element_root else {
            return Err(ProofError::InvalidProof);
        };

        if append_elements.is_empty() {
            if frontier.fold_element_root::<SortedPair>()? != new_element_root {
                return Err(ProofError::InvalidProof);
            }
            return Ok(committed_root(element_count, &new_element_root));
        }

        let new_count = (element_count as u64)
            .checked_add(append_elements.len() as u64)
            .filter(|&count| u32::try_from(count).is_ok())
            .ok_or(ProofError::InvalidProof)? as u32;

        let append_leaf_digests: Vec<_> = append_elements.iter().map(leaf_hash).collect();
        let (folded_root, final_element_root) =
            frontier.multi_append_roots::<SortedPair>(&append_leaf_digests)?;
        if folded_root != new_element_root {
            return Err(ProofError::InvalidProof);
        }

        Ok(committed_root(new_count, &final_element_root))
    }
}

impl From<MultiProof> for CombinedProof {
    fn from(multi: MultiProof) -> Self {
        Self { multi }
    }
}
