use arbitrary::Arbitrary;
use arbitrary::Unstructured;
use primitive_types::U256;
use serde::Deserialize;
use serde::Serialize;

use super::append::AppendProof;
use super::bitmap_from_word;
use super::bitmap_to_word;
use super::count_from_word;
use super::MAX_REPLAY_STEPS;
use crate::digest::Digest;
use crate::digest::Element;
use crate::error::ProofError;
use crate::hashing::committed_root;
use crate::hashing::count_word;
use crate::hashing::leaf_hash;
use crate::hashing::pair_hash;

/// Witness for several elements at once: the element count, two 256-bit step
/// bitmaps, and the sibling digests the verifier cannot derive on its own.
///
/// The replay works over a ring queue of exactly as many slots as there are
/// proven elements, seeded with their leaf digests in strictly decreasing
/// index order. Bit `j` of `flags` and `skips` steers step `j`:
///
/// | `skips` | `flags` | step |
/// |---|---|---|
/// | 0 | 0 | merge the next queue entry with a witness digest |
/// | 0 | 1 | merge the next two queue entries with each other |
/// | 1 | 0 | carry the next queue entry up unchanged (no right sibling) |
/// | 1 | 1 | done; the most recently written entry is the element root |
///
/// Merging is [`pair_hash`], which is oblivious to sibling order. That is
/// the only reason one bit per step suffices, and the reason this proof kind
/// exists exclusively for sorted-pair vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiProof {
    element_count: u32,
    flags: U256,
    skips: U256,
    decommitments: Vec<Digest>,
}

/// What a full replay produced.
pub(crate) struct Replay {
    pub element_root: Digest,
    pub new_element_root: Option<Digest>,
    pub frontier: Option<AppendProof>,
}

/// Bookkeeping for deriving an append witness while the replay runs: the
/// ring slot currently holding the right-most node of the level, and the
/// element count shifted down once per completed level. Whenever the shifted
/// count is odd, the right-most node touches a perfect frontier subtree and
/// one digest is captured.
struct FrontierTracker {
    level_count: u32,
    ring_position: usize,
    captures: Vec<Digest>,
}

impl FrontierTracker {
    fn new(element_count: u32) -> Self {
        Self {
            level_count: element_count,
            ring_position: 0,
            captures: Vec::with_capacity(element_count.count_ones() as usize),
        }
    }

    /// Record the sibling of the right-most node if this level crosses a set
    /// bit of the element count, then move one level up. `sibling` is
    /// evaluated lazily since merge steps look the sibling up in the queue.
    fn advance(&mut self, sibling: impl FnOnce() -> Digest, next_ring_position: usize) {
        if self.level_count & 1 == 1 {
            self.captures.push(sibling());
        }
        self.level_count >>= 1;
        self.ring_position = next_ring_position;
    }
}

impl MultiProof {
    pub fn new(element_count: u32, flags: U256, skips: U256, decommitments: Vec<Digest>) -> Self {
        Self {
            element_count,
            flags,
            skips,
            decommitments,
        }
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn flags(&self) -> U256 {
        self.flags
    }

    pub fn skips(&self) -> U256 {
        self.skips
    }

    pub fn decommitments(&self) -> &[Digest] {
        &self.decommitments
    }

    pub fn to_words(&self) -> Vec<Digest> {
        let mut words = Vec::with_capacity(3 + self.decommitments.len());
        words.push(count_word(self.element_count));
        words.push(bitmap_to_word(&self.flags));
        words.push(bitmap_to_word(&self.skips));
        words.extend_from_slice(&self.decommitments);

        words
    }

    pub fn from_words(words: &[Digest]) -> Result<Self, ProofError> {
        let [count, flags, skips, decommitments @ ..] = words else {
            return Err(ProofError::InvalidProof);
        };

        Ok(Self {
            element_count: count_from_word(count)?,
            flags: bitmap_from_word(flags),
            skips: bitmap_from_word(skips),
            decommitments: decommitments.to_vec(),
        })
    }

    /// Whether `elements`, in strictly decreasing index order, are all
    /// members of the vector committed to by `root`.
    pub fn verify(&self, root: Digest, elements: &[Element]) -> bool {
        if self.element_count == 0 {
            return false;
        }
        let leaf_digests = elements.iter().map(leaf_hash).collect();
        let Ok(replay) = self.replay(leaf_digests, None, false) else {
            return false;
        };

        committed_root(self.element_count, &replay.element_root) == root
    }

    /// Replace all proven elements at once and return the committed root of
    /// the mutated vector. One witness covers every replacement because both
    /// queues — the one reconstructing the old root and the one building the
    /// new root — consume the very same siblings.
    pub fn update(
        &self,
        root: Digest,
        elements: &[Element],
        new_elements: &[Element],
    ) -> Result<Digest, ProofError> {
        if elements.len() != new_elements.len() {
            return Err(ProofError::LengthMismatch {
                expected: elements.len(),
                actual: new_elements.len(),
            });
        }
        if root.is_zero() != (self.element_count == 0) || self.element_count == 0 {
            return Err(ProofError::EmptyTree);
        }

        let leaf_digests = elements.iter().map(leaf_hash).collect();
        let new_leaf_digests = new_elements.iter().map(leaf_hash).collect();
        let replay = self.replay(leaf_digests, Some(new_leaf_digests), false)?;

        if committed_root(self.element_count, &replay.element_root) != root {
            return Err(ProofError::InvalidProof);
        }
        let Some(new_element_root) = replay.new_element_root else {
            return Err(ProofError::InvalidProof);
        };

        Ok(committed_root(self.element_count, &new_element_root))
    }

    /// Run the witness over `queue` (leaf digests in decreasing index
    /// order). With a `shadow` queue, every operation is mirrored onto it,
    /// yielding the element root after all replacements. With
    /// `derive_frontier`, the replay additionally collects the append
    /// witness of the (possibly updated) vector; it fails unless the proven
    /// indices expose every frontier subtree root.
    pub(crate) fn replay(
        &self,
        mut queue: Vec<Digest>,
        mut shadow: Option<Vec<Digest>>,
        derive_frontier: bool,
    ) -> Result<Replay, ProofError> {
        let slots = queue.len();
        if slots == 0 {
            return Err(ProofError::InvalidProof);
        }
        if let Some(shadow) = &shadow {
            debug_assert_eq!(slots, shadow.len());
        }

        let mut tracker = derive_frontier.then(|| FrontierTracker::new(self.element_count));
        let mut decommitments = self.decommitments.iter();
        let mut read = 0;
        let mut write = 0;

        for step in 0..MAX_REPLAY_STEPS {
            let skip = self.skips.bit(step);
            let flag = self.flags.bit(step);

            if skip && flag {
                // replayed down to a single digest: the element root
                if decommitments.next().is_some() {
                    return Err(ProofError::InvalidProof);
                }
                if !higher_bits_are_clear(&self.flags, step)
                    || !higher_bits_are_clear(&self.skips, step)
                {
                    return Err(ProofError::InvalidProof);
                }
                let last = if write == 0 { slots } else { write } - 1;

                let frontier = match tracker {
                    None => None,
                    Some(mut tracker) => {
                        if tracker.level_count & 1 == 1 {
                            let source = shadow.as_ref().unwrap_or(&queue);
                            tracker.captures.push(source[last]);
                        }
                        if tracker.captures.len() != self.element_count.count_ones() as usize {
                            return Err(ProofError::InvalidProof);
                        }
                        tracker.captures.reverse();
                        Some(AppendProof::new(self.element_count, tracker.captures))
                    }
                };

                return Ok(Replay {
                    element_root: queue[last],
                    new_element_root: shadow.map(|shadow| shadow[last]),
                    frontier,
                });
            }

            if skip {
                // right-most node of an unbalanced level: carried up as-is
                if let Some(tracker) = tracker.as_mut() {
                    if read == tracker.ring_position {
                        let carried = shadow.as_ref().unwrap_or(&queue)[read];
                        tracker.advance(|| carried, write);
                    }
                }
                queue[write] = queue[read];
                if let Some(shadow) = shadow.as_mut() {
                    shadow[write] = shadow[read];
                }
                read = (read + 1) % slots;
            } else if flag {
                // the sibling is itself in the queue
                let second = (read + 1) % slots;
                if let Some(tracker) = tracker.as_mut() {
                    if read == tracker.ring_position {
                        let sibling = shadow.as_ref().unwrap_or(&queue)[second];
                        tracker.advance(|| sibling, write);
                    }
                }
                let merged = pair_hash(&queue[read], &queue[second]);
                queue[write] = merged;
                if let Some(shadow) = shadow.as_mut() {
                    let merged = pair_hash(&shadow[read], &shadow[second]);
                    shadow[write] = merged;
                }
                read = (read + 2) % slots;
            } else {
                // the sibling comes from the witness
                let decommitment = *decommitments.next().ok_or(ProofError::InvalidProof)?;
                if let Some(tracker) = tracker.as_mut() {
                    if read == tracker.ring_position {
                        tracker.advance(|| decommitment, write);
                    }
                }
                let merged = pair_hash(&decommitment, &queue[read]);
                queue[write] = merged;
                if let Some(shadow) = shadow.as_mut() {
                    let merged = pair_hash(&decommitment, &shadow[read]);
                    shadow[write] = merged;
                }
                read = (read + 1) % slots;
            }

            write = (write + 1) % slots;
        }

        // the bitmaps never signalled termination
        Err(ProofError::InvalidProof)
    }
}

fn higher_bits_are_clear(bits: &U256, step: usize) -> bool {
    ((step + 1)..MAX_REPLAY_STEPS).all(|position| !bits.bit(position))
}

impl<'a> Arbitrary<'a> for MultiProof {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self {
            element_count: u.arbitrary()?,
            flags: U256::from_big_endian(&u.arbitrary::<[u8; 32]>()?),
            skips: U256::from_big_endian(&u.arbitrary::<[u8; 32]>()?),
            decommitments: u.arbitrary()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use proptest::collection::vec;
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;
    use test_strategy::proptest;

    use super::*;
    use crate::hashing::SortedPair;
    use crate::test_shared::corrupt_digest;
    use crate::test_shared::corrupt_element;
    use crate::test_shared::seeded_elements;
    use crate::vector::MerkleVector;

    fn select(elements: &[Element], indices: &[u32]) -> Vec<Element> {
        indices.iter().map(|&i| elements[i as usize]).collect()
    }

    #[test]
    fn four_of_twelve_elements_verify() {
        let elements = seeded_elements(12, 0xff);
        let vector = MerkleVector::<SortedPair>::from_elements(&elements);
        let indices = [11, 8, 3, 2];
        let proof = vector.prove_multi(&indices);

        assert!(proof.verify(vector.root(), &select(&elements, &indices)));
    }

    #[test]
    fn update_of_four_of_twelve_elements_matches_rebuilt_root() {
        let elements = seeded_elements(12, 0xff);
        let vector = MerkleVector::<SortedPair>::from_elements(&elements);
        let indices = [11, 8, 3, 2];
        let proof = vector.prove_multi(&indices);

        let replacements = seeded_elements(indices.len(), 0x11);
        let new_root = proof
            .update(
                vector.root(),
                &select(&elements, &indices),
                &replacements,
            )
            .unwrap();

        let mut mutated = elements.clone();
        for (&index, &replacement) in indices.iter().zip(&replacements) {
            mutated[index as usize] = replacement;
        }
        let rebuilt = MerkleVector::<SortedPair>::from_elements(&mutated);
        assert_eq!(rebuilt.root(), new_root);
    }

    #[test]
    fn every_full_and_singleton_index_set_verifies() {
        for count in 1..=10_u32 {
            let elements = seeded_elements(count as usize, 0xff);
            let vector = MerkleVector::<SortedPair>::from_elements(&elements);
            let root = vector.root();

            let all = (0..count).rev().collect_vec();
            let proof = vector.prove_multi(&all);
            assert!(proof.verify(root, &select(&elements, &all)));

            for index in 0..count {
                let proof = vector.prove_multi(&[index]);
                assert!(
                    proof.verify(root, &[elements[index as usize]]),
                    "index {index} of {count} must verify"
                );
            }
        }
    }

    #[proptest]
    fn arbitrary_index_sets_verify_and_update(
        #[strategy(vec(arb::<Element>(), 1..40))] elements: Vec<Element>,
        #[strategy(vec(any::<bool>(), #elements.len()))] mask: Vec<bool>,
    ) {
        let indices = (0..elements.len() as u32)
            .rev()
            .filter(|&i| mask[i as usize])
            .collect_vec();
        prop_assume!(!indices.is_empty());

        let vector = MerkleVector::<SortedPair>::from_elements(&elements);
        let proof = vector.prove_multi(&indices);
        let selected = select(&elements, &indices);
        prop_assert!(proof.verify(vector.root(), &selected));

        let replacements = seeded_elements(indices.len(), 0x11);
        let new_root = proof.update(vector.root(), &selected, &replacements).unwrap();

        let mut mutated = elements.clone();
        for (&index, &replacement) in indices.iter().zip(&replacements) {
            mutated[index as usize] = replacement;
        }
        let rebuilt = MerkleVector::<SortedPair>::from_elements(&mutated);
        prop_assert_eq!(rebuilt.root(), new_root);
    }

    #[test]
    fn tampering_is_rejected() {
        let elements = seeded_elements(12, 0xff);
        let vector = MerkleVector::<SortedPair>::from_elements(&elements);
        let root = vector.root();
        let indices = [11, 8, 3, 2];
        let proof = vector.prove_multi(&indices);
        let selected = select(&elements, &indices);

        assert!(proof.verify(root, &selected));

        // corrupt root
        assert!(!proof.verify(corrupt_digest(root), &selected));

        // corrupt one proven element
        let mut bad_elements = selected.clone();
        bad_elements[2] = corrupt_element(bad_elements[2]);
        assert!(!proof.verify(root, &bad_elements));

        // elements in the wrong order
        let reversed = selected.iter().copied().rev().collect_vec();
        assert!(!proof.verify(root, &reversed));

        // no elements at all
        assert!(!proof.verify(root, &[]));

        // flip one bit in the flags
        let flipped_flags = MultiProof::new(
            proof.element_count(),
            proof.flags() ^ U256::one(),
            proof.skips(),
            proof.decommitments().to_vec(),
        );
        assert!(!flipped_flags.verify(root, &selected));

        // flip one bit in the skips
        let flipped_skips = MultiProof::new(
            proof.element_count(),
            proof.flags(),
            proof.skips() ^ (U256::one() << 1),
            proof.decommitments().to_vec(),
        );
        assert!(!flipped_skips.verify(root, &selected));

        // a set bit above the termination step
        let trailing_garbage = MultiProof::new(
            proof.element_count(),
            proof.flags() | (U256::one() << 200),
            proof.skips(),
            proof.decommitments().to_vec(),
        );
        assert!(!trailing_garbage.verify(root, &selected));

        // corrupt each witness digest in turn
        for position in 0..proof.decommitments().len() {
            let mut decommitments = proof.decommitments().to_vec();
            decommitments[position] = corrupt_digest(decommitments[position]);
            let tampered = MultiProof::new(
                proof.element_count(),
                proof.flags(),
                proof.skips(),
                decommitments,
            );
            assert!(!tampered.verify(root, &selected));
        }

        // truncated witness digests
        let truncated = MultiProof::new(
            proof.element_count(),
            proof.flags(),
            proof.skips(),
            proof.decommitments()[..3].to_vec(),
        );
        assert!(!truncated.verify(root, &selected));

        // surplus witness digest
        let mut padded = proof.decommitments().to_vec();
        padded.push(Digest::ZERO);
        let padded =
            MultiProof::new(proof.element_count(), proof.flags(), proof.skips(), padded);
        assert!(!padded.verify(root, &selected));
    }

    #[test]
    fn a_witness_that_never_terminates_is_rejected() {
        let elements = seeded_elements(4, 0xff);
        let vector = MerkleVector::<SortedPair>::from_elements(&elements);

        // all-skip bitmaps loop the queue without ever reducing it
        let endless = MultiProof::new(4, U256::zero(), U256::MAX, vec![]);
        assert!(!endless.verify(vector.root(), &select(&elements, &[3, 2, 1, 0])));

        // all-zero bitmaps demand a witness digest at every step
        let starved = MultiProof::new(4, U256::zero(), U256::zero(), vec![]);
        assert!(!starved.verify(vector.root(), &select(&elements, &[3, 2, 1, 0])));
    }

    #[test]
    fn update_argument_errors() {
        let elements = seeded_elements(6, 0xff);
        let vector = MerkleVector::<SortedPair>::from_elements(&elements);
        let proof = vector.prove_multi(&[4, 1]);
        let selected = select(&elements, &[4, 1]);

        assert_eq!(
            Err(ProofError::LengthMismatch {
                expected: 2,
                actual: 1
            }),
            proof.update(vector.root(), &selected, &selected[..1])
        );

        assert_eq!(
            Err(ProofError::EmptyTree),
            proof.update(Digest::ZERO, &selected, &selected)
        );

        let empty_claim = MultiProof::new(0, U256::one(), U256::one(), vec![]);
        assert_eq!(
            Err(ProofError::EmptyTree),
            empty_claim.update(vector.root(), &selected, &selected)
        );
    }

    #[proptest]
    fn witness_words_roundtrip(#[strategy(arb())] proof: MultiProof) {
        prop_assert_eq!(
            proof.clone(),
            MultiProof::from_words(&proof.to_words()).unwrap()
        );
    }

    #[test]
    fn witness_words_layout() {
        let elements = seeded_elements(12, 0xff);
        let vector = MerkleVector::<SortedPair>::from_elements(&elements);
        let proof = vector.prove_multi(&[11, 8, 3, 2]);
        let words = proof.to_words();

        assert_eq!(3 + proof.decommitments().len(), words.len());
        assert_eq!(count_from_word(&words[0]).unwrap(), 12);
        assert_eq!(bitmap_from_word(&words[1]), proof.flags());
        assert_eq!(bitmap_from_word(&words[2]), proof.skips());
        assert!(MultiProof::from_words(&words[..2]).is_err());
    }
}
