//! # Erase Backend Failures
//!
//! Runs with an injected erase backend. A failing primary backend is
//! absorbed by the software fallback and the proof still verifies; when the
//! fallback fails too, the certificates record it and the proof does not.

use forget_crypto::{
    AttestationRecord, Ed25519KeyPair, EraseError, EraseReceipt, EraserBackend, SecureBuffer,
    SecureEraser, SoftwareEraser,
};
use forget_protocol::{
    CryptographicForgetting, ForgetRequest, FunctionalRequirements, ProtocolConfig, SourceMaterial,
};

/// A backend that reports itself available and then fails every operation.
struct BrokenEnclave;

impl SecureEraser for BrokenEnclave {
    fn backend(&self) -> EraserBackend {
        EraserBackend::Enclave
    }
    fn is_available(&self) -> bool {
        true
    }
    fn erase(&self, _buf: &mut SecureBuffer) -> Result<EraseReceipt, EraseError> {
        Err(EraseError::Backend("enclave unreachable".into()))
    }
    fn final_sanitization(&self) -> Result<(), EraseError> {
        Err(EraseError::Backend("enclave unreachable".into()))
    }
    fn attest(&self) -> Option<AttestationRecord> {
        None
    }
}

fn protocol(fallback: Box<dyn SecureEraser>) -> CryptographicForgetting {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    CryptographicForgetting::with_erasers(
        ProtocolConfig::default(),
        Ed25519KeyPair::generate(),
        Box::new(BrokenEnclave),
        fallback,
    )
    .unwrap()
}

fn hello_world() -> ForgetRequest {
    ForgetRequest::new()
        .source(SourceMaterial::Text("hello world".into()))
        .requirements(FunctionalRequirements::text_generation(10))
}

#[test]
fn failing_backend_with_working_fallback_still_verifies() {
    let p = protocol(Box::new(SoftwareEraser::new(7)));
    assert_eq!(p.eraser_backend(), EraserBackend::Enclave);

    let result = p.forget(hello_world()).unwrap();
    assert_eq!(result.deletion_certificates.len(), 10);
    assert!(result.deletion_certificates.iter().all(|c| c.success));
    assert!(result
        .deletion_certificates
        .iter()
        .all(|c| c.backend == EraserBackend::Software));

    let sweep = result.deletion_certificates.last().unwrap();
    assert!(sweep.is_sweep());
    assert!(sweep.failure_reason.is_none());
    assert_eq!(result.obliteration_summary().success_rate, 1.0);
    assert!(p.verify_deletion_proof(&result.proof, &result.public_inputs));
}

#[test]
fn failing_backend_and_fallback_yield_unverifiable_proof() {
    let p = protocol(Box::new(BrokenEnclave));
    let result = p.forget(hello_world()).unwrap();

    assert_eq!(result.deletion_certificates.len(), 10);
    assert!(result.deletion_certificates.iter().all(|c| !c.success));
    for c in &result.deletion_certificates {
        let reason = c.failure_reason.as_deref().unwrap();
        assert!(reason.contains("fallback"), "{reason}");
    }
    assert_eq!(result.obliteration_summary().successful, 0);
    assert!(!p.verify_deletion_proof(&result.proof, &result.public_inputs));
}
