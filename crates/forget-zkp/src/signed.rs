//! # Signed Deletion Proof System
//!
//! The proof is a constant-shape JSON document:
//!
//! ```text
//! {"body":{"version","statement_hash","witness_hash","public_inputs",
//!          "constraints","nonce","issued_at","signer"},
//!  "signature"}
//! ```
//!
//! The signature is Ed25519 over the canonical bytes of `body`. A proof is
//! accepted only in the exact compact encoding `serde_json` produces for it,
//! so no two byte strings verify as the same proof.

use std::collections::BTreeMap;

use forget_core::{hex, CanonicalBytes, Timestamp};
use forget_crypto::{entropy, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use forget_oblit::{is_fresh, DEFAULT_FRESHNESS_SECS};
use serde::{Deserialize, Serialize};

use crate::statement::{
    evaluate, statement_hash, Constraint, ConstraintContext, ProofStatement, ProofWitness,
    PublicInputs, DEFAULT_MAX_RESONANCE_DIMS, PROOF_VERSION,
};
use crate::traits::{ProofError, ProofSystem, VerifyError};

/// The signed portion of a deletion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProofBody {
    pub version: u32,
    pub statement_hash: String,
    pub witness_hash: String,
    pub public_inputs: PublicInputs,
    /// Constraint name to evaluation result.
    pub constraints: BTreeMap<String, bool>,
    /// 128-bit random hex.
    pub nonce: String,
    pub issued_at: Timestamp,
    pub signer: Ed25519PublicKey,
}

/// A signed deletion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletionProof {
    pub body: ProofBody,
    pub signature: Ed25519Signature,
}

impl DeletionProof {
    /// Compact JSON encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProofError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a proof, rejecting any encoding other than [`Self::to_bytes`]'s.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        let proof: Self = serde_json::from_slice(bytes)
            .map_err(|e| VerifyError::MalformedProof(e.to_string()))?;
        let reencoded =
            serde_json::to_vec(&proof).map_err(|e| VerifyError::MalformedProof(e.to_string()))?;
        if reencoded != bytes {
            return Err(VerifyError::NonCanonicalEncoding);
        }
        Ok(proof)
    }

    pub fn public_inputs(&self) -> &PublicInputs {
        &self.body.public_inputs
    }

    /// True iff every constraint is present and satisfied.
    pub fn all_satisfied(&self) -> bool {
        first_unsatisfied(&self.body.constraints).is_none()
    }
}

/// Statement and witness for one protocol run.
#[derive(Debug)]
pub struct DeletionCircuit {
    pub statement: ProofStatement,
    pub witness: ProofWitness,
}

/// Name of the first constraint that is missing, unknown, or false.
fn first_unsatisfied(constraints: &BTreeMap<String, bool>) -> Option<String> {
    if let Some(c) = Constraint::ALL
        .iter()
        .find(|c| constraints.get(c.as_str()) != Some(&true))
    {
        return Some(c.as_str().to_string());
    }
    constraints
        .keys()
        .find(|k| !Constraint::ALL.iter().any(|c| c.as_str() == k.as_str()))
        .cloned()
}

/// Ed25519-signed deletion proofs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedDeletionProofSystem {
    /// Maximum proof and certificate age accepted.
    pub freshness_secs: u64,
    pub max_resonance_dims: usize,
}

impl Default for SignedDeletionProofSystem {
    fn default() -> Self {
        Self {
            freshness_secs: DEFAULT_FRESHNESS_SECS,
            max_resonance_dims: DEFAULT_MAX_RESONANCE_DIMS,
        }
    }
}

impl SignedDeletionProofSystem {
    /// Verify as of `now`.
    pub fn verify_at(
        &self,
        vk: &Ed25519PublicKey,
        proof: &DeletionProof,
        public_inputs: &PublicInputs,
        now: Timestamp,
    ) -> Result<(), VerifyError> {
        let body = &proof.body;
        if body.version != PROOF_VERSION {
            return Err(VerifyError::UnsupportedVersion(body.version));
        }
        if body.signer != *vk {
            return Err(VerifyError::UnknownSigner);
        }
        let signed =
            CanonicalBytes::new(body).map_err(|e| VerifyError::MalformedProof(e.to_string()))?;
        forget_crypto::verify(&signed, &proof.signature, vk)
            .map_err(|e| VerifyError::BadSignature(e.to_string()))?;

        if body.public_inputs != *public_inputs {
            return Err(VerifyError::PublicInputMismatch);
        }
        let expected = statement_hash(body.version, public_inputs, body.issued_at)
            .map_err(|e| VerifyError::MalformedProof(e.to_string()))?;
        if expected.to_hex() != body.statement_hash {
            return Err(VerifyError::StatementMismatch);
        }
        if let Some(name) = first_unsatisfied(&body.constraints) {
            return Err(VerifyError::ConstraintUnsatisfied(name));
        }
        if !is_fresh(body.issued_at, now, self.freshness_secs) {
            return Err(VerifyError::Stale {
                age_secs: body.issued_at.age_secs(now),
            });
        }
        Ok(())
    }
}

impl ProofSystem for SignedDeletionProofSystem {
    type Proof = DeletionProof;
    type VerifyingKey = Ed25519PublicKey;
    type ProvingKey = Ed25519KeyPair;
    type Circuit = DeletionCircuit;

    fn prove(
        &self,
        pk: &Ed25519KeyPair,
        circuit: &DeletionCircuit,
    ) -> Result<DeletionProof, ProofError> {
        let statement = &circuit.statement;
        let ctx = ConstraintContext {
            now: statement.issued_at,
            freshness_secs: self.freshness_secs,
            max_resonance_dims: self.max_resonance_dims,
        };
        let constraints = evaluate(statement, &circuit.witness, &ctx);
        if let Some(name) = first_unsatisfied(&constraints) {
            tracing::warn!(constraint = %name, "deletion proof issued with unsatisfied constraint");
        }

        let body = ProofBody {
            version: PROOF_VERSION,
            statement_hash: statement.hash()?.to_hex(),
            witness_hash: circuit.witness.hash().to_hex(),
            public_inputs: statement.public_inputs.clone(),
            constraints,
            nonce: hex::encode(&entropy::random_array::<16>()),
            issued_at: statement.issued_at,
            signer: pk.public_key(),
        };
        let signature = pk.sign(&CanonicalBytes::new(&body)?);
        Ok(DeletionProof { body, signature })
    }

    fn verify(
        &self,
        vk: &Ed25519PublicKey,
        proof: &DeletionProof,
        public_inputs: &PublicInputs,
    ) -> Result<(), VerifyError> {
        self.verify_at(vk, proof, public_inputs, Timestamp::now())
    }
}
