//! # Deletion Statement, Witness and Constraints
//!
//! The statement is what a verifier sees: the public inputs and the names of
//! the constraints the prover claims. The witness is everything the prover
//! used to evaluate those constraints and never leaves the prover.
//!
//! ## Constraints
//!
//! | Name | Holds when |
//! |---|---|
//! | `resonance_commitment_valid` | the witness resonance recommits to the public commitment |
//! | `deletion_certificates_valid` | certificates non-empty, all successful, all fresh, hashes and root recompute |
//! | `output_synthesis_correct` | output hash and entropy fingerprint recompute, output is well formed |
//! | `source_unrecoverable` | resonance dimension within ceiling, set closed by a successful sweep |

use std::collections::BTreeMap;

use forget_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, ResonanceVector,
    Sha256Accumulator, Timestamp,
};
use forget_crypto::CertificateTree;
use forget_oblit::{is_fresh, DeletionCertificate};
use forget_synth::SynthesizedOutput;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Proof body format version.
pub const PROOF_VERSION: u32 = 1;

/// Largest resonance dimension a proof will vouch for.
pub const DEFAULT_MAX_RESONANCE_DIMS: usize = 1000;

/// Values a verifier supplies and the proof must match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicInputs {
    /// Hex SHA-256 over the resonance's little-endian `f64` bytes.
    pub resonance_commitment: String,
    /// Hex Merkle root over the certificate digests.
    pub certificate_root: String,
    pub certificate_count: usize,
    /// Hex [`SynthesizedOutput::digest`].
    pub output_hash: String,
}

/// The named constraints of a deletion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constraint {
    ResonanceCommitmentValid,
    DeletionCertificatesValid,
    OutputSynthesisCorrect,
    SourceUnrecoverable,
}

impl Constraint {
    /// Every constraint, in evaluation order.
    pub const ALL: [Constraint; 4] = [
        Self::ResonanceCommitmentValid,
        Self::DeletionCertificatesValid,
        Self::OutputSynthesisCorrect,
        Self::SourceUnrecoverable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResonanceCommitmentValid => "resonance_commitment_valid",
            Self::DeletionCertificatesValid => "deletion_certificates_valid",
            Self::OutputSynthesisCorrect => "output_synthesis_correct",
            Self::SourceUnrecoverable => "source_unrecoverable",
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The public statement of a deletion proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStatement {
    pub public_inputs: PublicInputs,
    /// Canonical digest of each certificate, in order. Committed to the
    /// verifier through `public_inputs.certificate_root`.
    pub certificate_hashes: Vec<ContentDigest>,
    pub issued_at: Timestamp,
}

impl ProofStatement {
    /// Derive the statement for a protocol run.
    ///
    /// # Errors
    ///
    /// [`CanonicalizationError`] if a certificate cannot be canonicalized.
    pub fn new(
        resonance: &ResonanceVector,
        certificates: &[DeletionCertificate],
        output: &SynthesizedOutput,
        issued_at: Timestamp,
    ) -> Result<Self, CanonicalizationError> {
        let certificate_hashes = certificates
            .iter()
            .map(DeletionCertificate::digest)
            .collect::<Result<Vec<_>, _>>()?;
        let public_inputs = PublicInputs {
            resonance_commitment: resonance.commitment().to_hex(),
            certificate_root: CertificateTree::build(&certificate_hashes).root().to_hex(),
            certificate_count: certificate_hashes.len(),
            output_hash: output.digest().to_hex(),
        };
        Ok(Self {
            public_inputs,
            certificate_hashes,
            issued_at,
        })
    }

    /// Hash of the verifier-visible statement.
    pub fn hash(&self) -> Result<ContentDigest, CanonicalizationError> {
        statement_hash(PROOF_VERSION, &self.public_inputs, self.issued_at)
    }
}

/// Canonical SHA-256 of `{version, public_inputs, constraints, issued_at}`.
///
/// A verifier recomputes this from its own public inputs and the proof's
/// timestamp.
pub fn statement_hash(
    version: u32,
    public_inputs: &PublicInputs,
    issued_at: Timestamp,
) -> Result<ContentDigest, CanonicalizationError> {
    #[derive(Serialize)]
    struct StatementView<'a> {
        version: u32,
        public_inputs: &'a PublicInputs,
        constraints: Vec<&'static str>,
        issued_at: Timestamp,
    }
    let view = StatementView {
        version,
        public_inputs,
        constraints: Constraint::ALL.iter().map(Constraint::as_str).collect(),
        issued_at,
    };
    Ok(sha256_digest(&CanonicalBytes::new(&view)?))
}

/// Private inputs of a deletion proof.
///
/// The resonance zeroizes itself on drop; the remaining sensitive fields are
/// cleared by this type's `Drop`.
pub struct ProofWitness {
    pub resonance: ResonanceVector,
    pub certificates: Vec<DeletionCertificate>,
    pub output: SynthesizedOutput,
    pub entropy_fingerprint: ContentDigest,
}

impl ProofWitness {
    pub fn new(
        resonance: &ResonanceVector,
        certificates: &[DeletionCertificate],
        output: &SynthesizedOutput,
    ) -> Self {
        Self {
            resonance: resonance.clone(),
            certificates: certificates.to_vec(),
            output: output.clone(),
            entropy_fingerprint: output.entropy_fingerprint(),
        }
    }

    /// Domain-separated hash over the witness.
    pub fn hash(&self) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        acc.update(b"forget:witness:v1")
            .update(&(self.resonance.dim() as u64).to_le_bytes())
            .update_f64s(self.resonance.values())
            .update(&(self.certificates.len() as u64).to_le_bytes());
        for cert in &self.certificates {
            acc.update(cert.certificate_id.as_bytes())
                .update(cert.structure_hash.as_bytes())
                .update(cert.verification_hash.as_bytes());
        }
        acc.update(&self.output.digest().bytes)
            .update(&self.entropy_fingerprint.bytes);
        acc.finalize()
    }
}

impl Drop for ProofWitness {
    fn drop(&mut self) {
        self.entropy_fingerprint.bytes.zeroize();
        match &mut self.output {
            SynthesizedOutput::Text { text } | SynthesizedOutput::Translation { text, .. } => {
                text.zeroize()
            }
            SynthesizedOutput::Numeric { values } => values.zeroize(),
            SynthesizedOutput::Structured(s) => s.features.zeroize(),
            SynthesizedOutput::Classification(c) => c.class_probabilities.zeroize(),
        }
    }
}

impl std::fmt::Debug for ProofWitness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofWitness")
            .field("resonance_dims", &self.resonance.dim())
            .field("certificates", &self.certificates.len())
            .field("output", &self.output.kind())
            .finish_non_exhaustive()
    }
}

/// Environment the constraints are evaluated in.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintContext {
    pub now: Timestamp,
    pub freshness_secs: u64,
    pub max_resonance_dims: usize,
}

/// Evaluate every constraint against a statement and its witness.
pub fn evaluate(
    statement: &ProofStatement,
    witness: &ProofWitness,
    ctx: &ConstraintContext,
) -> BTreeMap<String, bool> {
    Constraint::ALL
        .iter()
        .map(|c| {
            let holds = match c {
                Constraint::ResonanceCommitmentValid => resonance_commitment_valid(statement, witness),
                Constraint::DeletionCertificatesValid => {
                    deletion_certificates_valid(statement, witness, ctx)
                }
                Constraint::OutputSynthesisCorrect => output_synthesis_correct(statement, witness),
                Constraint::SourceUnrecoverable => source_unrecoverable(witness, ctx),
            };
            (c.as_str().to_string(), holds)
        })
        .collect()
}

fn hex_matches(expected_hex: &str, actual: &ContentDigest) -> bool {
    match ContentDigest::from_hex(expected_hex) {
        Some(expected) => expected.bytes[..].ct_eq(&actual.bytes[..]).into(),
        None => false,
    }
}

fn resonance_commitment_valid(statement: &ProofStatement, witness: &ProofWitness) -> bool {
    witness.resonance.is_finite()
        && hex_matches(
            &statement.public_inputs.resonance_commitment,
            &witness.resonance.commitment(),
        )
}

fn deletion_certificates_valid(
    statement: &ProofStatement,
    witness: &ProofWitness,
    ctx: &ConstraintContext,
) -> bool {
    let certs = &witness.certificates;
    if certs.is_empty() || certs.len() != statement.public_inputs.certificate_count {
        return false;
    }
    if !certs.iter().all(|c| c.success && is_fresh(c.issued_at, ctx.now, ctx.freshness_secs)) {
        return false;
    }
    let recomputed = match certs.iter().map(DeletionCertificate::digest).collect::<Result<Vec<_>, _>>() {
        Ok(d) => d,
        Err(_) => return false,
    };
    recomputed == statement.certificate_hashes
        && hex_matches(
            &statement.public_inputs.certificate_root,
            &CertificateTree::build(&recomputed).root(),
        )
}

fn output_synthesis_correct(statement: &ProofStatement, witness: &ProofWitness) -> bool {
    hex_matches(&statement.public_inputs.output_hash, &witness.output.digest())
        && witness.output.entropy_fingerprint() == witness.entropy_fingerprint
        && witness.output.check_structure().is_ok()
}

fn source_unrecoverable(witness: &ProofWitness, ctx: &ConstraintContext) -> bool {
    let certs = &witness.certificates;
    let Some((sweep, structures)) = certs.split_last() else {
        return false;
    };
    witness.resonance.dim() <= ctx.max_resonance_dims
        && sweep.is_sweep()
        && sweep.success
        && !structures.is_empty()
        && structures.iter().all(|c| !c.is_sweep())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use forget_core::SourceMaterial;
    use forget_oblit::{Obliterator, ObliteratorConfig};

    pub(crate) fn fixture() -> (ResonanceVector, Vec<DeletionCertificate>, SynthesizedOutput) {
        let resonance = ResonanceVector::new((0..64).map(|i| i as f64 / 64.0).collect());
        let obliterator = Obliterator::new(ObliteratorConfig {
            use_secure_erase: false,
            ..Default::default()
        });
        let certs = obliterator
            .obliterate(SourceMaterial::Text("hello world".into()))
            .unwrap();
        let output = SynthesizedOutput::Text {
            text: "lorem ipsum".into(),
        };
        (resonance, certs, output)
    }

    fn ctx() -> ConstraintContext {
        ConstraintContext {
            now: Timestamp::now(),
            freshness_secs: 3600,
            max_resonance_dims: DEFAULT_MAX_RESONANCE_DIMS,
        }
    }

    fn build() -> (ProofStatement, ProofWitness) {
        let (r, certs, out) = fixture();
        let statement = ProofStatement::new(&r, &certs, &out, Timestamp::now()).unwrap();
        let witness = ProofWitness::new(&r, &certs, &out);
        (statement, witness)
    }

    #[test]
    fn test_all_constraints_hold_for_honest_run() {
        let (statement, witness) = build();
        let result = evaluate(&statement, &witness, &ctx());
        assert_eq!(result.len(), 4);
        assert!(result.values().all(|v| *v), "{result:?}");
        assert_eq!(statement.public_inputs.certificate_count, 10);
    }

    #[test]
    fn test_tampered_resonance_fails_commitment() {
        let (statement, mut witness) = build();
        witness.resonance = ResonanceVector::new(vec![0.0; 64]);
        let result = evaluate(&statement, &witness, &ctx());
        assert!(!result["resonance_commitment_valid"]);
        assert!(result["source_unrecoverable"]);
    }

    #[test]
    fn test_failed_certificate_fails_deletion_constraint() {
        let (statement, mut witness) = build();
        witness.certificates[0].success = false;
        let result = evaluate(&statement, &witness, &ctx());
        assert!(!result["deletion_certificates_valid"]);
    }

    #[test]
    fn test_stale_certificates_fail() {
        let (statement, witness) = build();
        let later = ConstraintContext {
            now: Timestamp::from_epoch_secs(Timestamp::now().epoch_secs() + 7200).unwrap(),
            ..ctx()
        };
        assert!(!evaluate(&statement, &witness, &later)["deletion_certificates_valid"]);
    }

    #[test]
    fn test_missing_sweep_fails_unrecoverable() {
        let (statement, mut witness) = build();
        witness.certificates.pop();
        let result = evaluate(&statement, &witness, &ctx());
        assert!(!result["source_unrecoverable"]);
        assert!(!result["deletion_certificates_valid"]);
    }

    #[test]
    fn test_oversized_resonance_fails_unrecoverable() {
        let (_, mut witness) = build();
        witness.resonance = ResonanceVector::new(vec![0.0; 1001]);
        assert!(!source_unrecoverable(&witness, &ctx()));
    }

    #[test]
    fn test_swapped_output_fails_synthesis() {
        let (statement, mut witness) = build();
        witness.output = SynthesizedOutput::Text { text: "other".into() };
        assert!(!evaluate(&statement, &witness, &ctx())["output_synthesis_correct"]);
    }

    #[test]
    fn test_malformed_output_fails_synthesis_even_when_hash_matches() {
        let (r, certs, _) = fixture();
        let bad = SynthesizedOutput::Text { text: " ".into() };
        let statement = ProofStatement::new(&r, &certs, &bad, Timestamp::now()).unwrap();
        let witness = ProofWitness::new(&r, &certs, &bad);
        assert!(!evaluate(&statement, &witness, &ctx())["output_synthesis_correct"]);
    }

    #[test]
    fn test_statement_hash_depends_on_inputs_and_time() {
        let (statement, _) = build();
        let mut other = statement.clone();
        other.public_inputs.certificate_count += 1;
        assert_ne!(statement.hash().unwrap(), other.hash().unwrap());
        let mut later = statement.clone();
        later.issued_at = Timestamp::from_epoch_secs(statement.issued_at.epoch_secs() + 1).unwrap();
        assert_ne!(statement.hash().unwrap(), later.hash().unwrap());
    }

    #[test]
    fn test_witness_debug_is_redacted() {
        let (_, witness) = build();
        let dbg = format!("{witness:?}");
        assert!(dbg.contains("resonance_dims: 64"));
        assert!(!dbg.contains("lorem"));
    }
}
