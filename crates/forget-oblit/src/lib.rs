//! # forget-oblit: Obliteration Phase
//!
//! Takes ownership of a source, enumerates every representation correlated
//! with it, destroys each one through an ephemeral-key seal and multi-pass
//! erasure, and returns one [`DeletionCertificate`] per structure plus a
//! closing sweep certificate.
//!
//! ## Invariant
//!
//! `certificates.len() == structures.len() + 1`, in enumeration order, with
//! the sweep certificate last.

pub mod certificate;
pub mod lifecycle;
pub mod obliterator;
pub mod structure;

pub use certificate::{
    is_fresh, verify_certificates, CertificateScope, DeletionCertificate, DeletionMethod,
    ObliterationSummary, DEFAULT_FRESHNESS_SECS, MAX_FUTURE_SKEW_SECS,
};
pub use lifecycle::{DestructionLifecycle, LifecycleError, LifecycleStage};
pub use obliterator::{ObliterationError, Obliterator, ObliteratorConfig};
pub use structure::{enumerate_structures, CorrelatedStructure, StructureKind};
