//! # Obliterator
//!
//! Destroys every structure correlated with a source and certifies each
//! destruction.
//!
//! Per structure: generate an ephemeral key, seal the plaintext under it
//! (structure kind as associated data), erase the plaintext, erase the key,
//! overwrite the ciphertext, check the residue, certify. After all
//! structures, the backend's final sanitization runs and a sweep certificate
//! closes the set.
//!
//! ## Failure Policy
//!
//! A primary-backend failure falls back to the software eraser and is
//! logged at `warn`. A certificate reports `success = false` only when both
//! fail (or a lifecycle step could not be completed); the reason is
//! recorded. The phase never aborts on a destruction failure.

use forget_core::{sha256_digest, CanonicalBytes, CanonicalizationError, SecurityLevel, SourceMaterial, Timestamp};
use forget_crypto::{
    overwrite_multipass, seal, select_eraser, CertificateTree, EphemeralKey, EraseReceipt,
    SecureBuffer, SecureEraser, SoftwareEraser,
};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::certificate::{CertificateScope, DeletionCertificate, DeletionMethod};
use crate::lifecycle::{DestructionLifecycle, LifecycleStage};
use crate::structure::{enumerate_structures, CorrelatedStructure};

/// Errors that stop Obliteration before any certificate is issued.
#[derive(Error, Debug)]
pub enum ObliterationError {
    /// A canonical rendering needed for enumeration or certification failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Obliterator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ObliteratorConfig {
    /// Determines the ephemeral key size.
    pub security_level: SecurityLevel,
    /// Prefer an enclave backend when one is present.
    pub use_secure_erase: bool,
    /// Fixed-pattern passes per erase.
    pub deletion_passes: u32,
    /// Structures processed concurrently; `<= 1` is sequential.
    pub workers: usize,
}

impl Default for ObliteratorConfig {
    fn default() -> Self {
        Self {
            security_level: SecurityLevel::High,
            use_secure_erase: true,
            deletion_passes: 7,
            workers: 1,
        }
    }
}

fn advance_or_record(lifecycle: &mut DestructionLifecycle, to: LifecycleStage, failures: &mut Vec<String>) {
    if let Err(e) = lifecycle.advance(to) {
        failures.push(e.to_string());
    }
}

#[derive(Serialize)]
struct SweepOutcome {
    structures: u64,
    successful: u64,
    sanitized: bool,
}

/// Destroys sources and issues deletion certificates.
pub struct Obliterator {
    config: ObliteratorConfig,
    eraser: Box<dyn SecureEraser>,
    fallback: Box<dyn SecureEraser>,
}

impl std::fmt::Debug for Obliterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obliterator")
            .field("config", &self.config)
            .field("backend", &self.eraser.backend())
            .finish()
    }
}

impl Obliterator {
    /// Probe for an erase backend and build an obliterator around it.
    pub fn new(config: ObliteratorConfig) -> Self {
        let eraser = select_eraser(config.use_secure_erase, config.deletion_passes);
        Self::with_eraser(config, eraser)
    }

    /// Use an explicit primary backend; the software eraser is the fallback.
    pub fn with_eraser(config: ObliteratorConfig, eraser: Box<dyn SecureEraser>) -> Self {
        let fallback = Box::new(SoftwareEraser::new(config.deletion_passes));
        Self {
            config,
            eraser,
            fallback,
        }
    }

    /// Replace the fallback backend.
    pub fn with_fallback(mut self, fallback: Box<dyn SecureEraser>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn config(&self) -> &ObliteratorConfig {
        &self.config
    }

    /// The primary erase backend.
    pub fn eraser(&self) -> &dyn SecureEraser {
        self.eraser.as_ref()
    }

    /// Consume `source`, destroy every correlated structure, and return one
    /// certificate per structure followed by the sweep certificate.
    ///
    /// # Errors
    ///
    /// Only canonicalization failures; destruction failures are recorded in
    /// the certificates.
    pub fn obliterate(&self, source: SourceMaterial) -> Result<Vec<DeletionCertificate>, ObliterationError> {
        let structures = enumerate_structures(source)?;
        let count = structures.len();
        tracing::info!(
            structures = count,
            backend = %self.eraser.backend(),
            workers = self.config.workers,
            "obliteration started"
        );

        let mut certificates = self.destroy_all(structures);

        let sweep = self.sweep(&certificates)?;
        certificates.push(sweep);
        let successful = certificates.iter().filter(|c| c.success).count();
        tracing::info!(certificates = certificates.len(), successful, "obliteration complete");
        Ok(certificates)
    }

    fn destroy_all(&self, structures: Vec<CorrelatedStructure>) -> Vec<DeletionCertificate> {
        if self.config.workers > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(self.config.workers).build() {
                Ok(pool) => {
                    return pool.install(|| structures.into_par_iter().map(|s| self.destroy(s)).collect());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "obliteration pool unavailable, running sequentially");
                }
            }
        }
        structures.into_iter().map(|s| self.destroy(s)).collect()
    }

    fn erase(&self, buf: &mut SecureBuffer) -> Result<EraseReceipt, String> {
        match self.eraser.erase(buf) {
            Ok(receipt) => Ok(receipt),
            Err(primary) => {
                tracing::warn!(
                    backend = %self.eraser.backend(),
                    error = %primary,
                    "erase backend failed, falling back"
                );
                self.fallback
                    .erase(buf)
                    .map_err(|fallback| format!("{primary}; fallback: {fallback}"))
            }
        }
    }

    /// Final sanitization with the same fallback discipline as [`Self::erase`].
    /// Returns the backend that completed it.
    fn sanitize(&self) -> Result<&dyn SecureEraser, String> {
        match self.eraser.final_sanitization() {
            Ok(()) => Ok(self.eraser.as_ref()),
            Err(primary) => {
                tracing::warn!(
                    backend = %self.eraser.backend(),
                    error = %primary,
                    "final sanitization failed, falling back"
                );
                self.fallback
                    .final_sanitization()
                    .map(|()| self.fallback.as_ref())
                    .map_err(|fallback| format!("{primary}; fallback: {fallback}"))
            }
        }
    }

    fn destroy(&self, structure: CorrelatedStructure) -> DeletionCertificate {
        let CorrelatedStructure { kind, mut data } = structure;
        let mut lifecycle = DestructionLifecycle::new(kind);
        let mut failures: Vec<String> = Vec::new();
        let structure_hash = data.digest().to_hex();

        let mut key = EphemeralKey::generate(self.config.security_level);
        let mut sealed = match seal(&key, data.as_slice(), kind.as_str().as_bytes()) {
            Ok(sealed) => {
                advance_or_record(&mut lifecycle, LifecycleStage::Encrypted, &mut failures);
                Some(sealed)
            }
            Err(e) => {
                failures.push(format!("seal: {e}"));
                None
            }
        };

        let mut backend = self.eraser.backend();
        let mut passes = 0;
        match self.erase(&mut data) {
            Ok(receipt) => {
                backend = receipt.backend;
                passes = receipt.passes_written;
                advance_or_record(&mut lifecycle, LifecycleStage::Overwritten, &mut failures);
            }
            Err(reason) => failures.push(format!("plaintext erase: {reason}")),
        }

        match self.erase(key.material_mut()) {
            Ok(_) if key.is_erased() => advance_or_record(&mut lifecycle, LifecycleStage::KeyErased, &mut failures),
            Ok(_) => failures.push("key erase: residue detected".into()),
            Err(reason) => failures.push(format!("key erase: {reason}")),
        }

        let ciphertext_digest = sealed.as_mut().map(|s| {
            let digest = s.ciphertext.digest().to_hex();
            overwrite_multipass(s.ciphertext.as_mut_slice(), self.config.deletion_passes);
            if !s.ciphertext.is_zeroed() {
                failures.push("ciphertext overwrite: residue detected".into());
            }
            digest
        });

        if !data.is_zeroed() {
            failures.push("plaintext residue detected".into());
        }
        let verification_hash = data.digest().to_hex();
        advance_or_record(&mut lifecycle, LifecycleStage::Certified, &mut failures);

        let success = failures.is_empty();
        if success {
            tracing::debug!(kind = %kind, backend = %backend, "structure destroyed");
        } else {
            tracing::warn!(kind = %kind, failures = failures.len(), "structure destruction incomplete");
        }
        DeletionCertificate {
            certificate_id: Uuid::new_v4(),
            scope: CertificateScope::Structure(kind),
            structure_hash,
            method: DeletionMethod::CryptographicErasure,
            backend,
            passes,
            ciphertext_digest,
            verification_hash,
            success,
            failure_reason: (!success).then(|| failures.join("; ")),
            attestation: None,
            issued_at: Timestamp::now(),
        }
    }

    fn sweep(&self, structures: &[DeletionCertificate]) -> Result<DeletionCertificate, ObliterationError> {
        let digests = structures
            .iter()
            .map(DeletionCertificate::digest)
            .collect::<Result<Vec<_>, _>>()?;
        let root = CertificateTree::build(&digests).root();
        let all_structures_ok = structures.iter().all(|c| c.success);

        let sanitization = self.sanitize();
        let outcome = SweepOutcome {
            structures: structures.len() as u64,
            successful: structures.iter().filter(|c| c.success).count() as u64,
            sanitized: sanitization.is_ok(),
        };
        let verification = sha256_digest(&CanonicalBytes::new(&outcome)?);

        let mut reasons = Vec::new();
        if !all_structures_ok {
            reasons.push(format!(
                "{} of {} structures not destroyed",
                outcome.structures - outcome.successful,
                outcome.structures
            ));
        }
        let sanitizer = match sanitization {
            Ok(eraser) => Some(eraser),
            Err(e) => {
                reasons.push(format!("final sanitization: {e}"));
                None
            }
        };
        let success = reasons.is_empty();
        Ok(DeletionCertificate {
            certificate_id: Uuid::new_v4(),
            scope: CertificateScope::Sweep,
            structure_hash: root.to_hex(),
            method: DeletionMethod::FinalSanitization,
            backend: sanitizer.map_or(self.eraser.backend(), |e| e.backend()),
            passes: 0,
            ciphertext_digest: None,
            verification_hash: verification.to_hex(),
            success,
            failure_reason: (!success).then(|| reasons.join("; ")),
            attestation: sanitizer.and_then(|e| e.attest()),
            issued_at: Timestamp::now(),
        })
    }
}
