//! # forget-crypto: Cryptographic Primitives for Forgetting
//!
//! Everything that touches key material, randomness or memory sanitization.
//!
//! - **Ed25519** ([`ed25519`]): signing and verification of proof bodies.
//!   Signing input must be `&CanonicalBytes`.
//! - **Entropy** ([`entropy`]): OS CSPRNG bytes and vectors.
//! - **Secure buffers** ([`buffer`]): the only container sensitive plaintext
//!   lives in between allocation and erasure.
//! - **Sealing** ([`aead`]): ephemeral keys sized to the security level and
//!   AES-GCM encryption under them.
//! - **Erasure** ([`erase`]): the [`SecureEraser`] capability with software
//!   and enclave-backed implementations, selected by probing.
//! - **Certificate tree** ([`merkle`]): domain-separated Merkle root over
//!   deletion certificate digests.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - Key material and plaintext never appear in `Debug` output or logs.

pub mod aead;
pub mod buffer;
pub mod ed25519;
pub mod entropy;
pub mod erase;
pub mod merkle;

pub use aead::{open, seal, EphemeralKey, Sealed};
pub use buffer::{overwrite_multipass, SecureBuffer, DELETION_PATTERNS};
pub use ed25519::{verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use erase::{
    select_eraser, AttestationRecord, EnclaveEraser, EraseError, EraseReceipt, EraserBackend,
    SecureEraser, SoftwareEraser,
};
pub use merkle::{verify_inclusion, CertificateTree, InclusionProof, Side};
