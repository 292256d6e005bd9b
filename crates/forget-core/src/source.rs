//! # Source Material
//!
//! The data to be forgotten. `SourceMaterial` is not `Clone`:
//! Extraction borrows it, Obliteration takes it by value, and its buffers
//! are zeroized when the last owner lets go.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroize;

use crate::error::ValidationError;

/// The kind of source material, used in metadata records and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// UTF-8 text.
    Text,
    /// A sequence of floating point values.
    Numeric,
    /// Ordered key/value pairs.
    Structured,
    /// Opaque bytes.
    Binary,
}

impl SourceType {
    /// Stable string tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Structured => "structured",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The input whose information content is to be forgotten.
pub enum SourceMaterial {
    /// UTF-8 text.
    Text(String),
    /// Numeric array.
    Numeric(Vec<f64>),
    /// Ordered key/value record.
    Structured(Vec<(String, String)>),
    /// Opaque bytes.
    Binary(Vec<u8>),
}

impl SourceMaterial {
    /// Build a source from a JSON value.
    ///
    /// Strings become text, arrays of numbers become numeric sources, and
    /// objects become structured records with their values rendered as
    /// strings. Anything else is rejected.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(s) => Ok(Self::Text(s)),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_f64().ok_or_else(|| ValidationError::InvalidRequirement {
                        field: "source".to_string(),
                        reason: format!("array element {v} is not a number"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Numeric),
            Value::Object(map) => Ok(Self::Structured(
                map.into_iter()
                    .map(|(k, v)| {
                        let rendered = match v {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, rendered)
                    })
                    .collect(),
            )),
            Value::Null => Err(ValidationError::MissingSource),
            other => Err(ValidationError::InvalidRequirement {
                field: "source".to_string(),
                reason: format!("unsupported source value {other}"),
            }),
        }
    }

    /// The source's kind.
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Text(_) => SourceType::Text,
            Self::Numeric(_) => SourceType::Numeric,
            Self::Structured(_) => SourceType::Structured,
            Self::Binary(_) => SourceType::Binary,
        }
    }

    /// Size in bytes as checked against the configured ceiling.
    ///
    /// Text and binary count their bytes; numeric sources count eight bytes
    /// per value; structured records count key and value bytes.
    pub fn byte_size(&self) -> u64 {
        let n = match self {
            Self::Text(s) => s.len(),
            Self::Numeric(v) => v.len().saturating_mul(8),
            Self::Structured(pairs) => pairs.iter().map(|(k, v)| k.len() + v.len()).sum(),
            Self::Binary(b) => b.len(),
        };
        n as u64
    }

    /// True if the source carries no content.
    pub fn is_empty(&self) -> bool {
        self.byte_size() == 0
    }

    /// Serialize the content to a byte string without consuming it.
    ///
    /// Text and binary return their bytes; numeric values are little-endian
    /// `f64`; structured records are `key=value` lines. The caller owns the
    /// copy and is responsible for erasing it.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.as_bytes().to_vec(),
            Self::Binary(b) => b.clone(),
            Self::Numeric(v) => numeric_bytes(v),
            Self::Structured(pairs) => structured_lines(pairs).into_bytes(),
        }
    }

    /// Consume the source and hand over its byte representation.
    ///
    /// Text and binary sources move their existing allocation out, so the
    /// buffer the caller receives is the one that held the content. Numeric
    /// and structured sources are serialized as in [`Self::to_bytes`] and
    /// their own storage is zeroized on drop.
    pub fn into_bytes(mut self) -> Vec<u8> {
        match &mut self {
            Self::Text(s) => std::mem::take(s).into_bytes(),
            Self::Binary(b) => std::mem::take(b),
            Self::Numeric(v) => numeric_bytes(v),
            Self::Structured(pairs) => structured_lines(pairs).into_bytes(),
        }
    }
}

fn numeric_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn structured_lines(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Drop for SourceMaterial {
    fn drop(&mut self) {
        match self {
            Self::Text(s) => s.zeroize(),
            Self::Numeric(v) => v.zeroize(),
            Self::Structured(pairs) => {
                for (k, v) in pairs.iter_mut() {
                    k.zeroize();
                    v.zeroize();
                }
                pairs.clear();
            }
            Self::Binary(b) => b.zeroize(),
        }
    }
}

impl std::fmt::Debug for SourceMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SourceMaterial::{}(<redacted, {} bytes>)",
            self.source_type(),
            self.byte_size()
        )
    }
}
