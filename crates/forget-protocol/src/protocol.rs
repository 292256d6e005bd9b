//! # The Forgetting Protocol
//!
//! [`CryptographicForgetting`] runs the four phases strictly in order:
//!
//! 1. **Extraction** borrows the source and produces the resonance vector.
//! 2. **Obliteration** takes the source by value and returns certificates.
//! 3. **Synthesis** renders the output from the resonance plus fresh entropy.
//! 4. **Proof** binds resonance, certificates and output under a signature.
//!
//! Ownership enforces the order of the first two phases: once the source
//! is moved into the obliterator nothing can extract from it again.

use std::collections::BTreeMap;

use forget_core::{Budget, SecurityParameters};
use forget_crypto::{Ed25519KeyPair, Ed25519PublicKey, EraserBackend, SecureEraser};
use forget_extract::{ExtractionRecord, Extractor, ExtractorConfig};
use forget_oblit::{DeletionCertificate, ObliterationSummary, Obliterator, ObliteratorConfig};
use forget_synth::{SynthesizedOutput, Synthesizer, SynthesizerConfig};
use forget_zkp::{DeletionProofGenerator, PublicInputs, SignedDeletionProofSystem};

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::metrics::{Phase, PerformanceMetrics};
use crate::request::ForgetRequest;

/// Fixed overhead in [`CryptographicForgetting::estimate_memory_usage`].
const BASE_MEMORY_BYTES: u64 = 1024 * 1024;

/// Everything a protocol run produces.
#[derive(Debug, Clone)]
pub struct ForgettingResult {
    pub output: SynthesizedOutput,
    /// Serialized deletion proof.
    pub proof: Vec<u8>,
    /// Inputs a verifier checks the proof against.
    pub public_inputs: PublicInputs,
    pub deletion_certificates: Vec<DeletionCertificate>,
    pub performance_metrics: PerformanceMetrics,
    pub security_parameters: SecurityParameters,
    pub extraction: ExtractionRecord,
}

impl ForgettingResult {
    pub fn obliteration_summary(&self) -> ObliterationSummary {
        ObliterationSummary::from_certificates(&self.deletion_certificates)
    }
}

/// The protocol orchestrator.
#[derive(Debug)]
pub struct CryptographicForgetting {
    config: ProtocolConfig,
    security: SecurityParameters,
    extractor: Extractor,
    obliterator: Obliterator,
    synthesizer: Synthesizer,
    prover: DeletionProofGenerator,
}

impl CryptographicForgetting {
    /// Validate `config`, probe for an erase backend and generate a fresh
    /// signing key.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Validation`] for an out-of-range parameter.
    pub fn new(config: ProtocolConfig) -> Result<Self, ProtocolError> {
        Self::with_signing_key(config, Ed25519KeyPair::generate())
    }

    /// As [`Self::new`] with a caller-supplied proof signing key.
    pub fn with_signing_key(
        config: ProtocolConfig,
        signing_key: Ed25519KeyPair,
    ) -> Result<Self, ProtocolError> {
        Self::build(config, signing_key, Obliterator::new)
    }

    /// As [`Self::with_signing_key`], erasing through `primary` and falling
    /// back to `fallback` instead of probing for a backend.
    pub fn with_erasers(
        config: ProtocolConfig,
        signing_key: Ed25519KeyPair,
        primary: Box<dyn SecureEraser>,
        fallback: Box<dyn SecureEraser>,
    ) -> Result<Self, ProtocolError> {
        Self::build(config, signing_key, |oblit| {
            Obliterator::with_eraser(oblit, primary).with_fallback(fallback)
        })
    }

    fn build(
        config: ProtocolConfig,
        signing_key: Ed25519KeyPair,
        obliterator: impl FnOnce(ObliteratorConfig) -> Obliterator,
    ) -> Result<Self, ProtocolError> {
        let security = config.validate()?;
        let extractor = Extractor::new(ExtractorConfig {
            target_dims: config.target_dims,
            mutual_info_penalty: security.mutual_info_penalty(),
            ..ExtractorConfig::default()
        });
        let obliterator = obliterator(ObliteratorConfig {
            security_level: security.security_level(),
            use_secure_erase: security.use_secure_erase(),
            deletion_passes: security.deletion_passes(),
            workers: config.obliteration_workers,
        });
        let synthesizer = Synthesizer::new(SynthesizerConfig::for_entropy_bits(security.entropy_bits()));
        let prover = DeletionProofGenerator::with_system(signing_key, SignedDeletionProofSystem::default());

        tracing::info!(
            security_level = %security.security_level(),
            eraser = %obliterator.eraser().backend(),
            target_dims = config.target_dims,
            signer = %prover.verifying_key(),
            "forgetting protocol initialized"
        );
        Ok(Self {
            config,
            security,
            extractor,
            obliterator,
            synthesizer,
            prover,
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn security_parameters(&self) -> &SecurityParameters {
        &self.security
    }

    /// Backend the obliterator erases through.
    pub fn eraser_backend(&self) -> EraserBackend {
        self.obliterator.eraser().backend()
    }

    /// Run the protocol with the configured extraction timeout.
    ///
    /// # Errors
    ///
    /// See [`Self::forget_with_budget`].
    pub fn forget(&self, request: ForgetRequest) -> Result<ForgettingResult, ProtocolError> {
        let budget = match self.config.extraction_timeout {
            Some(timeout) => Budget::with_timeout(timeout),
            None => Budget::unbounded(),
        };
        self.forget_with_budget(request, &budget)
    }

    /// Run the protocol, bounding extraction by `budget`.
    ///
    /// An exhausted budget does not fail the run: extraction returns its
    /// best iterate and the remaining phases proceed.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Validation`] before any phase runs for a missing
    /// source, missing or invalid requirements, or an oversize source.
    /// [`ProtocolError::Obliteration`] and [`ProtocolError::Proof`] for
    /// canonicalization failures.
    pub fn forget_with_budget(
        &self,
        request: ForgetRequest,
        budget: &Budget,
    ) -> Result<ForgettingResult, ProtocolError> {
        let (source, requirements) = request.validate(self.config.max_source_bytes)?;
        let mut metrics = PerformanceMetrics::default();
        let started = std::time::Instant::now();
        tracing::info!(
            source_type = source.source_type().as_str(),
            source_size = source.byte_size(),
            task = requirements.task.name(),
            "forgetting started"
        );

        let extraction = metrics.time(Phase::Extraction, || {
            self.extractor.extract(&source, &requirements, budget)
        });
        let deletion_certificates =
            metrics.time(Phase::Obliteration, || self.obliterator.obliterate(source))?;
        let output = metrics.time(Phase::Synthesis, || {
            self.synthesizer.synthesize(&extraction.resonance, &requirements)
        });
        let proof = metrics.time(Phase::ProofGeneration, || {
            self.prover
                .generate(&extraction.resonance, &deletion_certificates, &output)
        })?;
        metrics.total = started.elapsed();

        let summary = ObliterationSummary::from_certificates(&deletion_certificates);
        tracing::info!(
            certificates = summary.total_certificates,
            successful = summary.successful,
            converged = extraction.record.converged,
            total = ?metrics.total,
            "forgetting complete"
        );

        Ok(ForgettingResult {
            public_inputs: proof.public_inputs().clone(),
            proof: proof.to_bytes()?,
            output,
            deletion_certificates,
            performance_metrics: metrics,
            security_parameters: self.security.clone(),
            extraction: extraction.record,
        })
    }

    /// Verify a serialized deletion proof issued by this instance.
    pub fn verify_deletion_proof(&self, proof: &[u8], public_inputs: &PublicInputs) -> bool {
        self.prover.verify(proof, public_inputs)
    }

    /// Public key deletion proofs verify under.
    pub fn verifying_key(&self) -> Ed25519PublicKey {
        self.prover.verifying_key()
    }

    /// Rough peak memory for a source of `source_size` bytes: a fixed base,
    /// the resonance, two working copies of the source, and one more when
    /// erasing through an enclave.
    pub fn estimate_memory_usage(&self, source_size: u64) -> u64 {
        let resonance = (self.config.target_dims as u64 * 8).max(source_size / 1000);
        let working = source_size.saturating_mul(2);
        let enclave = match self.eraser_backend() {
            EraserBackend::Enclave => source_size,
            EraserBackend::Software => 0,
        };
        BASE_MEMORY_BYTES
            .saturating_add(resonance)
            .saturating_add(working)
            .saturating_add(enclave)
    }

    /// The guarantees this instance provides, keyed by name.
    pub fn security_guarantees(&self) -> BTreeMap<&'static str, &'static str> {
        let memory = match self.eraser_backend() {
            EraserBackend::Enclave => "Enclave-backed erasure with attested operation log",
            EraserBackend::Software => "Multi-pass software overwrite of process memory",
        };
        BTreeMap::from([
            ("source_unrecoverability", "Output is synthesized from a penalized low-information resonance mixed with fresh entropy"),
            ("trace_elimination", "Every enumerated representation of the source is sealed and overwritten"),
            ("verifiable_deletion", "Signed proof binding resonance commitment, certificate root and output hash"),
            ("forward_security", "Ephemeral sealing keys are erased; later key compromise exposes nothing"),
            ("memory_protection", memory),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forget_core::{FunctionalRequirements, SourceMaterial};

    fn protocol() -> CryptographicForgetting {
        CryptographicForgetting::new(ProtocolConfig {
            use_secure_erase: false,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = CryptographicForgetting::new(ProtocolConfig {
            security_parameter: 100,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
    }

    #[test]
    fn test_memory_estimate() {
        let p = protocol();
        assert_eq!(p.eraser_backend(), EraserBackend::Software);
        assert_eq!(p.estimate_memory_usage(0), BASE_MEMORY_BYTES + 512);
        assert_eq!(
            p.estimate_memory_usage(1_000_000),
            BASE_MEMORY_BYTES + 1000 + 2_000_000
        );
    }

    #[test]
    fn test_security_guarantees_name_backend() {
        let g = protocol().security_guarantees();
        assert_eq!(g.len(), 5);
        assert!(g["memory_protection"].contains("software"));
    }

    #[test]
    fn test_forget_with_fixed_key() {
        let key = Ed25519KeyPair::from_seed(&[3u8; 32]);
        let expected = key.public_key();
        let p = CryptographicForgetting::with_signing_key(
            ProtocolConfig {
                use_secure_erase: false,
                ..Default::default()
            },
            key,
        )
        .unwrap();
        assert_eq!(p.verifying_key(), expected);
        let result = p
            .forget(
                ForgetRequest::new()
                    .source(SourceMaterial::Numeric(vec![1.0, 2.0, 3.0]))
                    .requirements(FunctionalRequirements::classification(3)),
            )
            .unwrap();
        assert_eq!(result.deletion_certificates.len(), 6);
        assert!(p.verify_deletion_proof(&result.proof, &result.public_inputs));
        assert_eq!(result.obliteration_summary().success_rate, 1.0);
    }
}
