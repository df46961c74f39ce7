use core::fmt;
use std::str::FromStr;

use arbitrary::Arbitrary;
use rand::distr::Distribution;
use rand::distr::StandardUniform;
use rand::Rng;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::TryFromDigestError;
use crate::error::TryFromHexDigestError;

/// The result of hashing with the fixed 256-bit hash function. Sometimes
/// called a “hash”.
///
/// The derived ordering compares digests as big-endian unsigned integers,
/// which is the order the sorted-pair hash relies on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Arbitrary)]
pub struct Digest(pub(crate) [u8; Digest::BYTES]);

impl Digest {
    /// The number of bytes in a digest.
    pub const BYTES: usize = 32;

    /// The all-zero digest. Doubles as the committed root of the empty vector
    /// and as the domain separator prefix of leaf hashes.
    pub const ZERO: Digest = Digest([0; Self::BYTES]);

    pub const fn new(bytes: [u8; Self::BYTES]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The digest as 64 lowercase hex characters.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parse a digest from 64 hex characters, in either case.
    pub fn try_from_hex(hex_string: impl AsRef<[u8]>) -> Result<Self, TryFromHexDigestError> {
        let bytes = hex::decode(hex_string)?;
        let digest = Self::try_from(bytes.as_slice())?;

        Ok(digest)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; Digest::BYTES]> for Digest {
    fn from(bytes: [u8; Digest::BYTES]) -> Self {
        Self(bytes)
    }
}

impl From<Digest> for [u8; Digest::BYTES] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = TryFromDigestError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let array = <[u8; Self::BYTES]>::try_from(slice)
            .map_err(|_| TryFromDigestError::InvalidLength(slice.len()))?;
        Ok(Self(array))
    }
}

impl FromStr for Digest {
    type Err = TryFromHexDigestError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        Self::try_from_hex(string)
    }
}

impl Distribution<Digest> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Digest {
        Digest(rng.random())
    }
}

// Hand-written serde: text formats carry the hex form, binary formats the
// raw 32 bytes.
impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match serializer.is_human_readable() {
            true => serializer.collect_str(self),
            false => self.0.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if !deserializer.is_human_readable() {
            return <[u8; Self::BYTES]>::deserialize(deserializer).map(Self);
        }
        let hex_string = String::deserialize(deserializer)?;
        Self::try_from_hex(hex_string).map_err(serde::de::Error::custom)
    }
}

/// A 32-byte value supplied by the caller of the vector. Deliberately a
/// distinct type from [`Digest`]: elements are raw payload, digests are
/// internal tree nodes, and the leaf hash keeps the two domains apart.
///
/// Callers with larger payloads hash them down to 32 bytes first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Arbitrary)]
pub struct Element(pub(crate) [u8; Element::BYTES]);

impl Element {
    /// The number of bytes in an element.
    pub const BYTES: usize = 32;

    pub const fn new(bytes: [u8; Self::BYTES]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn try_from_hex(hex_string: impl AsRef<[u8]>) -> Result<Self, TryFromHexDigestError> {
        let bytes = hex::decode(hex_string)?;
        match <[u8; Self::BYTES]>::try_from(bytes.as_slice()) {
            Ok(array) => Ok(Self(array)),
            Err(_) => Err(TryFromDigestError::InvalidLength(bytes.len()).into()),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Element {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; Element::BYTES]> for Element {
    fn from(bytes: [u8; Element::BYTES]) -> Self {
        Self(bytes)
    }
}

impl From<Element> for [u8; Element::BYTES] {
    fn from(element: Element) -> Self {
        element.0
    }
}

impl Distribution<Element> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Element {
        Element(rng.random())
    }
}

// same serde split as for `Digest`: hex in text formats, bytes otherwise
impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match serializer.is_human_readable() {
            true => serializer.collect_str(self),
            false => self.0.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if !deserializer.is_human_readable() {
            return <[u8; Self::BYTES]>::deserialize(deserializer).map(Self);
        }
        let hex_string = String::deserialize(deserializer)?;
        Self::try_from_hex(hex_string).map_err(serde::de::Error::custom)
    }
}
