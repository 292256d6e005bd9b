//! # Content Digests
//!
//! `ContentDigest` is the 32-byte, algorithm-tagged hash used for deletion
//! certificate identities, proof statement hashes and output hashes.
//!
//! ## Security Invariant
//!
//! [`sha256_digest()`] accepts only `&CanonicalBytes`. Hashing raw bytes is
//! reserved for [`Sha256Accumulator`], whose call sites are limited to:
//!
//! - resonance commitments (little-endian `f64` bytes),
//! - structure hashes of material being destroyed,
//! - synthesized output hashes and entropy fingerprints (outputs carry
//!   floats, which canonical JSON rejects),
//! - proof witness hashes,
//! - class-label codes in the classification loss,
//! - Merkle leaf and node hashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// The hash algorithm that produced a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-addressed digest with its algorithm tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        crate::hex::encode(&self.bytes)
    }

    /// Parse a SHA-256 digest from 64 lowercase hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = crate::hex::decode_array::<32>(s).ok()?;
        Some(Self::new(DigestAlgorithm::Sha256, bytes))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let mut acc = Sha256Accumulator::new();
    acc.update(data.as_bytes());
    acc.finalize()
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// Incremental SHA-256 over raw bytes.
///
/// Only for the raw-byte exceptions listed in the module docs. Structured
/// values go through [`sha256_digest()`].
#[derive(Clone, Default)]
pub struct Sha256Accumulator {
    hasher: Sha256,
}

impl Sha256Accumulator {
    /// Start a new accumulator.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Feed bytes into the hash.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(data);
        self
    }

    /// Feed a sequence of `f64` as IEEE-754 little-endian bytes.
    pub fn update_f64s(&mut self, values: &[f64]) -> &mut Self {
        for v in values {
            self.hasher.update(v.to_le_bytes());
        }
        self
    }

    /// Consume the accumulator and produce a tagged digest.
    pub fn finalize(self) -> ContentDigest {
        let hash = self.hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        ContentDigest::new(DigestAlgorithm::Sha256, bytes)
    }

    /// Consume the accumulator and produce a lowercase hex string.
    pub fn finalize_hex(self) -> String {
        self.finalize().to_hex()
    }
}

impl std::fmt::Debug for Sha256Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Sha256Accumulator")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256_of_empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(
            sha256_hex(&cb),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_accumulator_matches_one_shot() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let mut acc = Sha256Accumulator::new();
        acc.update(&cb.as_bytes()[..3]).update(&cb.as_bytes()[3..]);
        assert_eq!(acc.finalize(), sha256_digest(&cb));
    }

    #[test]
    fn test_accumulator_empty_input_is_sha256_of_nothing() {
        assert_eq!(
            Sha256Accumulator::new().finalize_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_f64_feed_is_little_endian() {
        let mut a = Sha256Accumulator::new();
        a.update_f64s(&[1.0, -0.5]);
        let mut b = Sha256Accumulator::new();
        b.update(&1.0f64.to_le_bytes()).update(&(-0.5f64).to_le_bytes());
        assert_eq!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_display_has_algorithm_prefix() {
        let d = Sha256Accumulator::new().finalize();
        let s = d.to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn test_from_hex_roundtrip_and_rejects_uppercase() {
        let d = Sha256Accumulator::new().finalize();
        assert_eq!(ContentDigest::from_hex(&d.to_hex()), Some(d));
        assert!(ContentDigest::from_hex(&d.to_hex().to_uppercase()).is_none());
    }
}
