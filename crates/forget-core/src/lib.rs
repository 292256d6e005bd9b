//! # forget-core: Foundational Types for Cryptographic Forgetting
//!
//! The leaf of the workspace DAG. Defines the data model shared by the four
//! protocol phases (Extraction, Obliteration, Synthesis, Proof) and the
//! primitives every digest and signature flows through.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every digest over structured data flows
//!    through `CanonicalBytes::new()`. Raw-byte hashing is confined to the
//!    documented exceptions routed through [`Sha256Accumulator`].
//!
//! 2. **Closed task enumeration.** [`TaskSpec`] is an enum; an unknown task
//!    type is a validation error, never a silent fallback.
//!
//! 3. **Source material is consumed.** [`SourceMaterial`] is not `Clone`.
//!    Obliteration takes it by value and nothing that survives Obliteration
//!    can refer back to it.
//!
//! 4. **UTC-only timestamps** with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `forget-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod budget;
pub mod canonical;
pub mod config;
pub mod digest;
pub mod error;
pub mod hex;
pub mod requirements;
pub mod resonance;
pub mod source;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use budget::{Budget, CancellationToken};
pub use canonical::CanonicalBytes;
pub use config::{SecurityLevel, SecurityParameters};
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm, Sha256Accumulator};
pub use error::{CanonicalizationError, CryptoError, ForgetError, ValidationError};
pub use requirements::{
    ClassificationParams, FunctionalRequirements, GenericOutputType, GenericParams,
    Regularization, TaskSpec, TextGenerationParams, TextStyle, TextTone, TranslationParams,
};
pub use resonance::ResonanceVector;
pub use source::{SourceMaterial, SourceType};
pub use temporal::Timestamp;
