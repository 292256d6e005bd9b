//! Proof generation and byte-level verification for the protocol.

use forget_core::{ResonanceVector, Timestamp};
use forget_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use forget_oblit::DeletionCertificate;
use forget_synth::SynthesizedOutput;

use crate::signed::{DeletionCircuit, DeletionProof, SignedDeletionProofSystem};
use crate::statement::{ProofStatement, ProofWitness, PublicInputs};
use crate::traits::{ProofError, ProofSystem};

/// Issues deletion proofs under a single signing key.
#[derive(Debug)]
pub struct DeletionProofGenerator {
    system: SignedDeletionProofSystem,
    signing_key: Ed25519KeyPair,
}

impl DeletionProofGenerator {
    pub fn new(signing_key: Ed25519KeyPair) -> Self {
        Self::with_system(signing_key, SignedDeletionProofSystem::default())
    }

    pub fn with_system(signing_key: Ed25519KeyPair, system: SignedDeletionProofSystem) -> Self {
        Self {
            system,
            signing_key,
        }
    }

    pub fn system(&self) -> &SignedDeletionProofSystem {
        &self.system
    }

    /// Public key proofs from this generator verify under.
    pub fn verifying_key(&self) -> Ed25519PublicKey {
        self.signing_key.public_key()
    }

    /// Build the statement and witness for a run and prove them.
    ///
    /// The witness is dropped, and its contents cleared, before this
    /// returns.
    ///
    /// # Errors
    ///
    /// [`ProofError`] if the statement cannot be canonicalized or the proof
    /// cannot be constructed.
    pub fn generate(
        &self,
        resonance: &ResonanceVector,
        certificates: &[DeletionCertificate],
        output: &SynthesizedOutput,
    ) -> Result<DeletionProof, ProofError> {
        let circuit = DeletionCircuit {
            statement: ProofStatement::new(resonance, certificates, output, Timestamp::now())?,
            witness: ProofWitness::new(resonance, certificates, output),
        };
        let proof = self.system.prove(&self.signing_key, &circuit)?;
        tracing::debug!(
            certificates = certificates.len(),
            statement_hash = %proof.body.statement_hash,
            satisfied = proof.all_satisfied(),
            "deletion proof generated"
        );
        Ok(proof)
    }

    /// Verify serialized proof bytes against public inputs under this
    /// generator's key.
    pub fn verify(&self, proof_bytes: &[u8], public_inputs: &PublicInputs) -> bool {
        verify_proof_bytes(&self.system, &self.verifying_key(), proof_bytes, public_inputs)
    }
}

/// Verify serialized proof bytes. Every failure, including a parse failure,
/// yields `false`.
pub fn verify_proof_bytes(
    system: &SignedDeletionProofSystem,
    verifying_key: &Ed25519PublicKey,
    proof_bytes: &[u8],
    public_inputs: &PublicInputs,
) -> bool {
    let result = DeletionProof::from_bytes(proof_bytes)
        .and_then(|proof| system.verify(verifying_key, &proof, public_inputs));
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "deletion proof rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::tests::fixture;

    fn generated() -> (DeletionProofGenerator, Vec<u8>, PublicInputs) {
        let generator = DeletionProofGenerator::new(Ed25519KeyPair::generate());
        let (r, certs, out) = fixture();
        let proof = generator.generate(&r, &certs, &out).unwrap();
        let inputs = proof.public_inputs().clone();
        (generator, proof.to_bytes().unwrap(), inputs)
    }

    #[test]
    fn test_generated_proof_verifies() {
        let (generator, bytes, inputs) = generated();
        assert!(generator.verify(&bytes, &inputs));
    }

    #[test]
    fn test_every_byte_flip_is_rejected() {
        let (generator, bytes, inputs) = generated();
        for i in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[i] ^= 0x01;
            assert!(!generator.verify(&tampered, &inputs), "flip at byte {i} accepted");
        }
    }

    #[test]
    fn test_truncated_and_empty_bytes_are_rejected() {
        let (generator, bytes, inputs) = generated();
        assert!(!generator.verify(&bytes[..bytes.len() - 1], &inputs));
        assert!(!generator.verify(&[], &inputs));
    }

    #[test]
    fn test_other_generator_rejects() {
        let (_, bytes, inputs) = generated();
        let other = DeletionProofGenerator::new(Ed25519KeyPair::generate());
        assert!(!other.verify(&bytes, &inputs));
    }

    #[test]
    fn test_two_proofs_of_same_run_differ() {
        let generator = DeletionProofGenerator::new(Ed25519KeyPair::generate());
        let (r, certs, out) = fixture();
        let a = generator.generate(&r, &certs, &out).unwrap();
        let b = generator.generate(&r, &certs, &out).unwrap();
        assert_ne!(a.body.nonce, b.body.nonce);
        assert_eq!(a.public_inputs(), b.public_inputs());
    }
}
