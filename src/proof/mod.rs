//! The proof engine: pure verifiers and transformers for every witness
//! variant.
//!
//! All state is caller-supplied. Each operation takes `(root, witness,
//! inputs)`, replays the witness, and either compares the reconstructed
//! committed root against the claimed one or derives the committed root of
//! the mutated vector. Nothing here ever sees the tree itself.
//!
//! # Wire format
//!
//! Every witness serializes to a dense sequence of 32-byte words. Word 0 is
//! always the element count as a big-endian 256-bit integer. Multi (and
//! combined) witnesses follow with the `flags` and `skips` step bitmaps;
//! all remaining words are decommitment digests in the order the replay
//! consumes them. There is no variant tag — callers that multiplex proof
//! kinds over one channel must prepend their own.

pub mod append;
pub mod combined;
pub mod multi;
pub mod single;

use primitive_types::U256;

use crate::digest::Digest;
use crate::error::ProofError;

/// The `flags`/`skips` bitmaps hold one bit per replay step, so no witness
/// can describe a longer replay.
pub(crate) const MAX_REPLAY_STEPS: usize = 256;

/// Parse word 0 of a witness. The count occupies the low 4 bytes of the
/// big-endian word; anything in the upper 28 bytes makes the witness
/// malformed.
pub(crate) fn count_from_word(word: &Digest) -> Result<u32, ProofError> {
    let bytes = word.as_bytes();
    if bytes[..Digest::BYTES - 4].iter().any(|&byte| byte != 0) {
        return Err(ProofError::InvalidProof);
    }
    let mut tail = [0; 4];
    tail.copy_from_slice(&bytes[Digest::BYTES - 4..]);

    Ok(u32::from_be_bytes(tail))
}

pub(crate) fn bitmap_to_word(bits: &U256) -> Digest {
    Digest::new(bits.to_big_endian())
}

pub(crate) fn bitmap_from_word(word: &Digest) -> U256 {
    U256::from_big_endian(word.as_bytes())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::hashing::count_word;

    #[proptest]
    fn count_word_roundtrip(count: u32) {
        prop_assert_eq!(count, count_from_word(&count_word(count)).unwrap());
    }

    #[test]
    fn count_word_with_high_bytes_is_rejected() {
        let mut bytes = [0; Digest::BYTES];
        bytes[0] = 1;
        let word = Digest::new(bytes);
        assert_eq!(Err(ProofError::InvalidProof), count_from_word(&word));
    }

    #[proptest]
    fn bitmap_word_roundtrip(bytes: [u8; Digest::BYTES]) {
        let bits = U256::from_big_endian(&bytes);
        prop_assert_eq!(bits, bitmap_from_word(&bitmap_to_word(&bits)));
    }

    #[test]
    fn bitmap_bit_zero_lives_in_the_last_byte() {
        let word = bitmap_to_word(&U256::one());
        assert_eq!(1, word.as_bytes()[Digest::BYTES - 1]);
    }
}
