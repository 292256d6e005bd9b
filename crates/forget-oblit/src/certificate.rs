//! # Deletion Certificates
//!
//! One certificate per destroyed structure plus one sweep certificate for
//! the backend-wide sanitization that closes the phase. Certificates carry
//! only digests, counts, and timestamps; they contain no floating point
//! values, so their canonical digest is always defined.

use forget_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, Timestamp};
use forget_crypto::{AttestationRecord, EraserBackend};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::structure::StructureKind;

/// Default freshness window for certificate timestamps, in seconds.
pub const DEFAULT_FRESHNESS_SECS: u64 = 3600;
/// Tolerated clock skew for timestamps in the future, in seconds.
pub const MAX_FUTURE_SKEW_SECS: u64 = 60;

/// What a certificate covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "kind")]
pub enum CertificateScope {
    /// A single enumerated structure.
    Structure(StructureKind),
    /// The final backend-wide sanitization.
    Sweep,
}

/// How the covered data was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionMethod {
    /// Seal, multi-pass overwrite, key erasure.
    CryptographicErasure,
    /// Backend-wide cleanup after all structures.
    FinalSanitization,
}

/// Attestation that one structure (or the sweep) was destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletionCertificate {
    pub certificate_id: Uuid,
    pub scope: CertificateScope,
    /// SHA-256 of the structure before destruction (lowercase hex). For the
    /// sweep, the Merkle root over the structure certificates.
    pub structure_hash: String,
    pub method: DeletionMethod,
    pub backend: EraserBackend,
    /// Overwrite passes written to the plaintext, including random and zero.
    pub passes: u32,
    /// SHA-256 of the sealed ciphertext before it was overwritten.
    pub ciphertext_digest: Option<String>,
    /// SHA-256 of the plaintext residue after erasure.
    pub verification_hash: String,
    pub success: bool,
    pub failure_reason: Option<String>,
    /// Present on the sweep certificate when an enclave backend is active.
    pub attestation: Option<AttestationRecord>,
    pub issued_at: Timestamp,
}

impl DeletionCertificate {
    /// Canonical digest of the whole certificate.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(self)?))
    }

    pub fn is_sweep(&self) -> bool {
        self.scope == CertificateScope::Sweep
    }
}

/// Aggregate counts over a certificate set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObliterationSummary {
    pub total_certificates: usize,
    pub successful: usize,
    pub success_rate: f64,
    pub backend: Option<EraserBackend>,
}

impl ObliterationSummary {
    pub fn from_certificates(certs: &[DeletionCertificate]) -> Self {
        let successful = certs.iter().filter(|c| c.success).count();
        Self {
            total_certificates: certs.len(),
            successful,
            success_rate: if certs.is_empty() {
                0.0
            } else {
                successful as f64 / certs.len() as f64
            },
            backend: certs.last().map(|c| c.backend),
        }
    }
}

/// Whether `issued_at` lies within `window_secs` before `now`, allowing
/// [`MAX_FUTURE_SKEW_SECS`] into the future.
pub fn is_fresh(issued_at: Timestamp, now: Timestamp, window_secs: u64) -> bool {
    let age = issued_at.age_secs(now);
    age <= window_secs as i64 && age >= -(MAX_FUTURE_SKEW_SECS as i64)
}

/// True iff the set is non-empty, every certificate succeeded, and every
/// timestamp is fresh.
pub fn verify_certificates(certs: &[DeletionCertificate], now: Timestamp, window_secs: u64) -> bool {
    !certs.is_empty() && certs.iter().all(|c| c.success && is_fresh(c.issued_at, now, window_secs))
}
