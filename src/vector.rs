//! The prover-side vector: all tree levels held in memory, roots and
//! witnesses derived from them.
//!
//! Verifiers never see this type. They work from the quadruple
//! `(root, witness, inputs)` alone; see the [`proof`](crate::proof) module.

use std::marker::PhantomData;

use arbitrary::Arbitrary;
use arbitrary::Unstructured;
use itertools::Itertools;
use primitive_types::U256;
use rayon::iter::IntoParallelRefIterator;
use rayon::iter::ParallelIterator;

use crate::bits::minimum_combined_index;
use crate::bits::round_up_to_power_of_two;
use crate::config;
use crate::digest::Digest;
use crate::digest::Element;
use crate::hashing::committed_root;
use crate::hashing::leaf_hash;
use crate::hashing::PairingScheme;
use crate::hashing::SortedPair;
use crate::proof::append::AppendProof;
use crate::proof::combined::CombinedProof;
use crate::proof::multi::MultiProof;
use crate::proof::single::SingleProof;
use crate::proof::MAX_REPLAY_STEPS;

/// An append-only vector of 32-byte elements, authenticated by a Merkle tree
/// over the leaf digests.
///
/// The tree is *unbalanced*: a node without a right sibling is carried up
/// one level unchanged instead of being paired with a phantom. The committed
/// [`root`](Self::root) binds the element count together with the element
/// tree root, so every witness is checked against both.
#[derive(Debug, Clone)]
pub struct MerkleVector<M>
where
    M: PairingScheme,
{
    // levels[0] holds the leaf digests, the last level the element root
    levels: Vec<Vec<Digest>>,
    _scheme: PhantomData<M>,
}

impl<M> MerkleVector<M>
where
    M: PairingScheme,
{
    pub fn from_elements(elements: &[Element]) -> Self {
        assert!(
            u32::try_from(elements.len()).is_ok(),
            "vector length must fit in 32 bits"
        );

        let leaf_digests = if elements.len() >= config::leaf_hashing_parallelization_cutoff() {
            elements.par_iter().map(leaf_hash).collect()
        } else {
            elements.iter().map(leaf_hash).collect()
        };

        Self::from_leaf_digests(leaf_digests)
    }

    fn from_leaf_digests(leaf_digests: Vec<Digest>) -> Self {
        let _scheme = PhantomData;
        if leaf_digests.is_empty() {
            return Self {
                levels: vec![],
                _scheme,
            };
        }

        let mut levels = vec![leaf_digests];
        while levels.last().unwrap().len() > 1 {
            let parents = reduce_level::<M>(levels.last().unwrap());
            levels.push(parents);
        }

        Self { levels, _scheme }
    }

    pub fn num_elements(&self) -> u32 {
        self.levels.first().map_or(0, |leaves| leaves.len() as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The number of levels above the leaves; 0 for vectors of at most one
    /// element.
    pub fn height(&self) -> u32 {
        self.levels.len().saturating_sub(1) as u32
    }

    /// The root of the Merkle tree over the leaf digests alone, without the
    /// element count bound in. The zero digest for the empty vector.
    pub fn element_root(&self) -> Digest {
        match self.levels.last() {
            Some(top) => top[0],
            None => Digest::ZERO,
        }
    }

    /// The committed root: the element count hashed together with the
    /// element root. The zero digest for the empty vector.
    pub fn root(&self) -> Digest {
        if self.is_empty() {
            return Digest::ZERO;
        }
        committed_root(self.num_elements(), &self.element_root())
    }

    /// The smallest element index that a combined proof over this vector
    /// must cover. See [`bits::minimum_combined_index`][min].
    ///
    /// [min]: crate::bits::minimum_combined_index
    pub fn minimum_combined_index(&self) -> u32 {
        minimum_combined_index(self.num_elements())
    }

    pub(crate) fn node(&self, level: usize, index: usize) -> Digest {
        self.levels[level][index]
    }

    /// Generate the witness for membership of the element at `index`.
    ///
    /// The witness lists one sibling digest per level, deepest first; levels
    /// where the climbing node has no right sibling contribute none.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn prove_single(&self, index: u32) -> SingleProof {
        let element_count = self.num_elements();
        assert!(
            index < element_count,
            "index {index} out of bounds for vector of {element_count} elements"
        );

        let max_depth = round_up_to_power_of_two(element_count).trailing_zeros();
        let mut decommitments = Vec::with_capacity(max_depth as usize);
        let mut idx = index;
        let mut upper = element_count - 1;
        let mut level = 0;
        while upper > 0 {
            if idx != upper || idx & 1 == 1 {
                decommitments.push(self.node(level, (idx ^ 1) as usize));
            }
            idx >>= 1;
            upper >>= 1;
            level += 1;
        }

        SingleProof::new(element_count, decommitments)
    }

    /// Generate the witness for appending to this vector: the roots of the
    /// perfect subtrees on the right frontier, largest first. There are
    /// `count_ones` of them; none for the empty vector.
    pub fn prove_append(&self) -> AppendProof {
        let element_count = self.num_elements();
        let mut decommitments = Vec::with_capacity(element_count.count_ones() as usize);
        let mut consumed = 0_u32;
        for height in (0..u32::BITS).rev() {
            if element_count & (1 << height) != 0 {
                decommitments.push(self.node(height as usize, (consumed >> height) as usize));
                consumed += 1 << height;
            }
        }

        AppendProof::new(element_count, decommitments)
    }
}

impl MerkleVector<SortedPair> {
    /// Generate the witness for membership of several elements at once.
    ///
    /// `indices` must be strictly decreasing, which is also the order in
    /// which the proven elements are later handed to the verifier. The
    /// witness encodes the replay as two 256-bit step bitmaps plus the
    /// sibling digests that cannot be derived from the proven elements
    /// themselves.
    ///
    /// Only defined for sorted-pair vectors: a one-bit-per-step witness
    /// cannot express sibling positions, so position must not matter.
    ///
    /// # Panics
    ///
    /// Panics if `indices` is empty, not strictly decreasing, out of bounds,
    /// or if the witness would exceed the 256-step bitmap.
    pub fn prove_multi(&self, indices: &[u32]) -> MultiProof {
        let element_count = self.num_elements();
        assert!(!indices.is_empty(), "at least one index must be proven");
        assert!(
            indices.iter().tuple_windows().all(|(a, b)| a > b),
            "indices must be strictly decreasing"
        );
        assert!(indices[0] < element_count, "indices must be in bounds");

        let mut flags = U256::zero();
        let mut skips = U256::zero();
        let mut decommitments = vec![];
        let mut step = 0;

        // Walk the levels bottom-up, each level right to left, mirroring the
        // order in which the verifier's ring queue consumes its entries.
        let mut known = indices.to_vec();
        for level in 0..self.height() as usize {
            let upper = (self.levels[level].len() - 1) as u32;
            let mut parents = Vec::with_capacity(known.len());
            let mut i = 0;
            while i < known.len() {
                let index = known[i];
                assert!(
                    step < MAX_REPLAY_STEPS - 1,
                    "witness exceeds the {MAX_REPLAY_STEPS}-step bitmap"
                );
                if index == upper && index & 1 == 0 {
                    // no right sibling: the node is carried up unchanged
                    skips = skips | (U256::one() << step);
                    i += 1;
                } else if index & 1 == 1 && i + 1 < known.len() && known[i + 1] == index - 1 {
                    // the sibling is itself being proven
                    flags = flags | (U256::one() << step);
                    i += 2;
                } else {
                    decommitments.push(self.node(level, (index ^ 1) as usize));
                    i += 1;
                }
                parents.push(index >> 1);
                step += 1;
            }
            known = parents;
        }
        debug_assert_eq!([0_u32], *known);

        // both bits set: the replay is done
        flags = flags | (U256::one() << step);
        skips = skips | (U256::one() << step);

        MultiProof::new(element_count, flags, skips, decommitments)
    }

    /// Generate a witness that proves membership *and* carries enough
    /// information for the verifier to derive the append frontier, so that
    /// one witness authorizes an update plus an append.
    ///
    /// # Panics
    ///
    /// Panics if the largest index falls short of
    /// [`minimum_combined_index`](Self::minimum_combined_index), in addition
    /// to everything [`prove_multi`](Self::prove_multi) panics on.
    pub fn prove_combined(&self, indices: &[u32]) -> CombinedProof {
        let minimum = self.minimum_combined_index();
        assert!(
            indices.first().is_some_and(|&largest| largest >= minimum),
            "index set must reach into the deepest frontier subtree \
             (largest index must be at least {minimum})"
        );

        CombinedProof::from(self.prove_multi(indices))
    }
}

impl<'a, M> Arbitrary<'a> for MerkleVector<M>
where
    M: PairingScheme,
{
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let elements = u.arbitrary::<Vec<Element>>()?;
        Ok(Self::from_elements(&elements))
    }
}

fn reduce_level<M>(nodes: &[Digest]) -> Vec<Digest>
where
    M: PairingScheme,
{
    let mut parents = Vec::with_capacity(nodes.len().div_ceil(2));
    let mut pairs = nodes.chunks_exact(2);
    for pair in pairs.by_ref() {
        parents.push(M::combine(&pair[0], &pair[1]));
    }
    if let [lone] = pairs.remainder() {
        parents.push(*lone);
    }

    parents
}

/// The element root of a non-empty sequence of leaf digests, computed
/// without materializing the intermediate levels.
pub(crate) fn element_root_from_leaf_digests<M>(leaf_digests: &[Digest]) -> Digest
where
    M: PairingScheme,
{
    assert!(!leaf_digests.is_empty());
    let mut level = leaf_digests.to_vec();
    while level.len() > 1 {
        level = reduce_level::<M>(&level);
    }

    level[0]
}
