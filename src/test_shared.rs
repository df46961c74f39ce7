//! Helpers shared between the unit tests of several modules.

use sha3::Digest as _;
use sha3::Keccak256;

use crate::digest::Digest;
use crate::digest::Element;

/// Deterministic test elements: a running Keccak-256 chain seeded with a
/// single byte. Distinct seeds give disjoint-looking sequences.
pub(crate) fn seeded_elements(count: usize, seed: u8) -> Vec<Element> {
    let mut state: [u8; 32] = Keccak256::digest([seed]).into();
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        elements.push(Element::new(state));
        state = Keccak256::digest(state).into();
    }

    elements
}

/// Flip one bit of a digest, for tests that must not verify.
pub(crate) fn corrupt_digest(digest: Digest) -> Digest {
    let mut bytes = *digest.as_bytes();
    bytes[0] ^= 1;

    Digest::new(bytes)
}

/// Flip one bit of an element, for tests that must not verify.
pub(crate) fn corrupt_element(element: Element) -> Element {
    let mut bytes = *element.as_bytes();
    bytes[0] ^= 1;

    Element::new(bytes)
}
