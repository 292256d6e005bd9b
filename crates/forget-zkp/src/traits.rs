//! # Proof System Trait (Sealed)
//!
//! The abstraction every deletion proof backend implements.
//!
//! ## Sealed Trait
//!
//! `ProofSystem` is **sealed**: only implementations defined within
//! `forget-zkp` can exist. A verifier holding a `ProofSystem` therefore knows
//! which constraint semantics the proofs it accepts were checked against.

use forget_core::CanonicalizationError;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::statement::PublicInputs;

/// Error during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The statement or witness could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The proof could not be serialized.
    #[error("proof serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The circuit inputs are unusable.
    #[error("invalid circuit inputs: {0}")]
    InvalidInputs(String),
}

/// Reason a proof was rejected.
///
/// Every variant is a rejection; callers at the protocol boundary collapse
/// them into `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The proof bytes do not parse.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// The proof parses but is not in its canonical encoding.
    #[error("proof is not canonically encoded")]
    NonCanonicalEncoding,

    /// Proof format version not understood by this verifier.
    #[error("unsupported proof version {0}")]
    UnsupportedVersion(u32),

    /// The proof was signed by a key other than the verifying key.
    #[error("proof signer does not match the verifying key")]
    UnknownSigner,

    /// The signature does not verify over the proof body.
    #[error("proof signature is invalid: {0}")]
    BadSignature(String),

    /// The public inputs in the proof differ from the expected ones.
    #[error("public inputs do not match")]
    PublicInputMismatch,

    /// The statement hash does not recompute from the public statement.
    #[error("statement hash does not match")]
    StatementMismatch,

    /// A constraint is missing, unknown, or false.
    #[error("constraint {0} is not satisfied")]
    ConstraintUnsatisfied(String),

    /// The proof is older than the freshness window or too far in the future.
    #[error("proof age {age_secs}s is outside the freshness window")]
    Stale {
        /// Seconds between issuance and verification (negative if issued
        /// in the future).
        age_secs: i64,
    },
}

mod private {
    pub trait Sealed {}
}

/// Sealed trait defining the interface for a deletion proof system.
///
/// Each implementation provides its own proof, key, and circuit types via
/// associated types.
pub trait ProofSystem: private::Sealed + Send + Sync {
    /// The proof artifact produced by `prove()`.
    type Proof: Serialize + DeserializeOwned + Clone + std::fmt::Debug;
    /// The key used to verify proofs.
    type VerifyingKey: Clone;
    /// The key used to generate proofs.
    type ProvingKey;
    /// Statement plus witness.
    type Circuit;

    /// Evaluate the circuit constraints and produce a proof binding them.
    ///
    /// # Errors
    ///
    /// [`ProofError`] if the proof cannot be constructed. Unsatisfied
    /// constraints are not an error: they are recorded in the proof, which
    /// will then fail verification.
    fn prove(&self, pk: &Self::ProvingKey, circuit: &Self::Circuit)
        -> Result<Self::Proof, ProofError>;

    /// Verify a proof against public inputs.
    ///
    /// # Errors
    ///
    /// [`VerifyError`] naming the first check that rejected the proof.
    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        public_inputs: &PublicInputs,
    ) -> Result<(), VerifyError>;
}

impl private::Sealed for crate::signed::SignedDeletionProofSystem {}
