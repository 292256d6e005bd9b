//! # forget-zkp: Proof Phase
//!
//! Binds a protocol run's resonance, deletion certificates and output into a
//! single signed proof a third party can check without the source or the
//! witness.
//!
//! ## Architecture
//!
//! - [`traits`]: the sealed [`ProofSystem`] trait and its error types.
//! - [`statement`]: public inputs, statement, witness, constraint
//!   evaluation.
//! - [`signed`]: [`SignedDeletionProofSystem`], the Ed25519-signed
//!   implementation, and the [`DeletionProof`] wire form.
//! - [`generator`]: [`DeletionProofGenerator`], the entry point the
//!   protocol uses.
//!
//! ## Not a zero-knowledge circuit
//!
//! The constraints are evaluated by the prover and attested by signature.
//! A verifier trusts the signer's evaluation; it does not re-run it.

pub mod generator;
pub mod signed;
pub mod statement;
pub mod traits;

pub use generator::{verify_proof_bytes, DeletionProofGenerator};
pub use signed::{DeletionCircuit, DeletionProof, ProofBody, SignedDeletionProofSystem};
pub use statement::{
    evaluate, statement_hash, Constraint, ConstraintContext, ProofStatement, ProofWitness,
    PublicInputs, DEFAULT_MAX_RESONANCE_DIMS, PROOF_VERSION,
};
pub use traits::{ProofError, ProofSystem, VerifyError};
