//! # Error Types
//!
//! Shared error hierarchy for the forgetting protocol. Every error derives
//! `thiserror::Error`; phase crates define their own enums and compose these
//! with `#[from]`.
//!
//! - Validation errors carry the offending field and the bound it violated.
//! - Cryptographic errors fail loudly with context but never include key or
//!   plaintext material.

use thiserror::Error;

/// Top-level error for operations spanning several core concerns.
#[derive(Error, Debug)]
pub enum ForgetError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Input or configuration validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A cryptographic primitive failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Content integrity violation.
    #[error("integrity error: {0}")]
    Integrity(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Input and configuration validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// No source material was supplied.
    #[error("source material is required")]
    MissingSource,

    /// No functional requirements were supplied.
    #[error("functional requirements are required")]
    MissingRequirements,

    /// Source exceeds the configured size ceiling.
    #[error("source material is {size} bytes, exceeding the maximum of {max} bytes")]
    SourceTooLarge {
        /// Size of the rejected source in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        max: u64,
    },

    /// The requirements map was present but empty.
    #[error("functional requirements must not be empty")]
    EmptyRequirements,

    /// The requirements named a task type outside the closed set.
    #[error("unknown task type: {0:?}")]
    UnknownTaskType(String),

    /// A requirements field had the wrong type or an illegal value.
    #[error("invalid requirement {field}: {reason}")]
    InvalidRequirement {
        /// Field name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration parameter is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Malformed hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Malformed or non-UTC timestamp.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Authenticated encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// The OS entropy source failed.
    #[error("entropy source error: {0}")]
    Entropy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_too_large_message_names_both_sizes() {
        let e = ValidationError::SourceTooLarge { size: 11, max: 10 };
        let msg = e.to_string();
        assert!(msg.contains("11"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_validation_error_converts_into_forget_error() {
        let e: ForgetError = ValidationError::EmptyRequirements.into();
        assert!(matches!(e, ForgetError::Validation(ValidationError::EmptyRequirements)));
    }

    #[test]
    fn test_canonicalization_error_converts_into_forget_error() {
        let e: ForgetError = CanonicalizationError::FloatRejected(0.5).into();
        assert!(e.to_string().contains("0.5"));
    }
}
