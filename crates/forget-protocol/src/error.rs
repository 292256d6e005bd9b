//! Errors surfaced to protocol callers.

use forget_core::ValidationError;
use forget_oblit::ObliterationError;
use forget_zkp::ProofError;
use thiserror::Error;

/// Everything that can stop a protocol run.
///
/// Destruction failures are not here: they are recorded in the deletion
/// certificates and surface as an unverifiable proof.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Configuration or request rejected before any phase ran.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("obliteration failed: {0}")]
    Obliteration(#[from] ObliterationError),

    #[error("proof generation failed: {0}")]
    Proof(#[from] ProofError),
}
