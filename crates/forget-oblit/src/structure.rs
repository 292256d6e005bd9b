//! # Correlated Structure Enumeration
//!
//! Lists every in-memory representation that is correlated with a source and
//! must be destroyed with it. Enumeration is conservative: for text it
//! includes case and whitespace variants and word-order permutations, for
//! every source the source hash and a metadata record.
//!
//! ## Security Invariant
//!
//! The enumerator consumes the [`SourceMaterial`]. The `Original` structure
//! of a text or binary source is the caller's own allocation, moved into a
//! [`SecureBuffer`] without copying, so erasing that buffer erases the bytes
//! the caller handed in. Every derived copy is wrapped in a `SecureBuffer`
//! the moment it is created.

use forget_core::{
    CanonicalBytes, CanonicalizationError, Sha256Accumulator, SourceMaterial, SourceType, Timestamp,
};
use forget_crypto::SecureBuffer;
use serde::{Deserialize, Serialize};

/// What a structure is, relative to the source it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Original,
    Lowercase,
    Uppercase,
    WhitespaceNormalized,
    WordsJoined,
    WordsReversed,
    WordsSorted,
    Reversed,
    Sorted,
    Keys,
    Values,
    KeyValueText,
    SourceHash,
    Metadata,
}

impl StructureKind {
    /// Stable identifier, also used as AEAD associated data.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::WhitespaceNormalized => "whitespace_normalized",
            Self::WordsJoined => "words_joined",
            Self::WordsReversed => "words_reversed",
            Self::WordsSorted => "words_sorted",
            Self::Reversed => "reversed",
            Self::Sorted => "sorted",
            Self::Keys => "keys",
            Self::Values => "values",
            Self::KeyValueText => "key_value_text",
            Self::SourceHash => "source_hash",
            Self::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sensitive representation awaiting destruction.
#[derive(Debug)]
pub struct CorrelatedStructure {
    pub kind: StructureKind,
    pub data: SecureBuffer,
}

impl CorrelatedStructure {
    fn new(kind: StructureKind, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            data: SecureBuffer::from_vec(bytes),
        }
    }
}

fn le_bytes<'a>(values: impl Iterator<Item = &'a f64>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

#[derive(Serialize)]
struct SourceMetadata<'a> {
    #[serde(rename = "type")]
    source_type: SourceType,
    size: u64,
    hash: &'a str,
    timestamp: Timestamp,
}

/// Consume `source` and return every correlated structure, `Original` first,
/// `SourceHash` and `Metadata` last.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] if a canonical rendering (structured
/// original, metadata record) cannot be produced. Structures built before
/// the failure are zeroized on drop.
pub fn enumerate_structures(
    source: SourceMaterial,
) -> Result<Vec<CorrelatedStructure>, CanonicalizationError> {
    let source_type = source.source_type();
    let size = source.byte_size();
    let mut derived = Vec::new();
    let mut leading = None;

    match &source {
        SourceMaterial::Text(s) => {
            derived.push(CorrelatedStructure::new(StructureKind::Lowercase, s.to_lowercase().into_bytes()));
            derived.push(CorrelatedStructure::new(StructureKind::Uppercase, s.to_uppercase().into_bytes()));
            let mut words: Vec<&str> = s.split_whitespace().collect();
            derived.push(CorrelatedStructure::new(
                StructureKind::WhitespaceNormalized,
                words.join(" ").into_bytes(),
            ));
            if !words.is_empty() {
                derived.push(CorrelatedStructure::new(StructureKind::WordsJoined, words.concat().into_bytes()));
                words.reverse();
                derived.push(CorrelatedStructure::new(StructureKind::WordsReversed, words.join(" ").into_bytes()));
                words.sort_unstable();
                derived.push(CorrelatedStructure::new(StructureKind::WordsSorted, words.join(" ").into_bytes()));
            }
        }
        SourceMaterial::Numeric(values) => {
            derived.push(CorrelatedStructure::new(StructureKind::Reversed, le_bytes(values.iter().rev())));
            let mut sorted: Vec<&f64> = values.iter().collect();
            sorted.sort_by(|a, b| a.total_cmp(b));
            derived.push(CorrelatedStructure::new(StructureKind::Sorted, le_bytes(sorted.into_iter())));
        }
        SourceMaterial::Structured(pairs) => {
            let canonical = CanonicalBytes::new(pairs)?;
            leading = Some(CorrelatedStructure::new(StructureKind::Original, canonical.into_bytes()));
            let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
            let values: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();
            derived.push(CorrelatedStructure::new(StructureKind::Keys, keys.join("\n").into_bytes()));
            derived.push(CorrelatedStructure::new(StructureKind::Values, values.join("\n").into_bytes()));
        }
        SourceMaterial::Binary(bytes) => {
            derived.push(CorrelatedStructure::new(
                StructureKind::Reversed,
                bytes.iter().rev().copied().collect(),
            ));
        }
    }

    // Text and binary hand over their own allocation here.
    let own_kind = if source_type == SourceType::Structured {
        StructureKind::KeyValueText
    } else {
        StructureKind::Original
    };
    let own = CorrelatedStructure::new(own_kind, source.into_bytes());
    let mut acc = Sha256Accumulator::new();
    acc.update(own.data.as_slice());
    let hash = acc.finalize_hex();

    let mut structures = Vec::with_capacity(derived.len() + 4);
    match leading {
        Some(original) => {
            structures.push(original);
            structures.append(&mut derived);
            structures.push(own);
        }
        None => {
            structures.push(own);
            structures.append(&mut derived);
        }
    }

    let metadata = CanonicalBytes::new(&SourceMetadata {
        source_type,
        size,
        hash: &hash,
        timestamp: Timestamp::now(),
    })?;
    structures.push(CorrelatedStructure::new(StructureKind::SourceHash, hash.into_bytes()));
    structures.push(CorrelatedStructure::new(StructureKind::Metadata, metadata.into_bytes()));
    Ok(structures)
}
