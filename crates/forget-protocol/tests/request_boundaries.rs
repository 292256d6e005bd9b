//! # Request Boundaries and Budgets
//!
//! Inputs rejected before any phase runs, and runs bounded by a caller
//! budget.

use std::time::Duration;

use forget_core::{ClassificationParams, TaskSpec, ValidationError};
use forget_protocol::{
    Budget, CancellationToken, CryptographicForgetting, ForgetRequest, FunctionalRequirements,
    ProtocolConfig, ProtocolError, SourceMaterial,
};
use serde_json::{json, Map, Value};

fn protocol(max_source_bytes: u64) -> CryptographicForgetting {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    CryptographicForgetting::new(ProtocolConfig {
        use_secure_erase: false,
        max_source_bytes,
        ..Default::default()
    })
    .unwrap()
}

fn text_request(source: SourceMaterial) -> ForgetRequest {
    ForgetRequest::new()
        .source(source)
        .requirements(FunctionalRequirements::text_generation(5))
}

fn validation(err: ProtocolError) -> ValidationError {
    match err {
        ProtocolError::Validation(v) => v,
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn source_at_limit_succeeds() {
    let p = protocol(64);
    let result = p.forget(text_request(SourceMaterial::Text("a".repeat(64))));
    assert!(result.is_ok());
}

#[test]
fn source_one_byte_over_limit_is_rejected() {
    let p = protocol(64);
    let err = p
        .forget(text_request(SourceMaterial::Text("a".repeat(65))))
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::SourceTooLarge { size: 65, max: 64 });
}

#[test]
fn empty_requirements_map_is_rejected() {
    let p = protocol(1024);
    let err = p
        .forget(
            ForgetRequest::new()
                .source(SourceMaterial::Text("x".into()))
                .requirements_map(Map::new()),
        )
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::EmptyRequirements);
}

#[test]
fn missing_source_is_rejected() {
    let p = protocol(1024);
    let err = p
        .forget(ForgetRequest::new().requirements(FunctionalRequirements::text_generation(5)))
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::MissingSource);
}

#[test]
fn missing_requirements_are_rejected() {
    let p = protocol(1024);
    let err = p
        .forget(ForgetRequest::new().source(SourceMaterial::Text("x".into())))
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::MissingRequirements);
}

#[test]
fn unknown_task_type_is_rejected() {
    let p = protocol(1024);
    let mut m = Map::new();
    m.insert("task_type".into(), Value::String("summarize".into()));
    let err = p
        .forget(
            ForgetRequest::new()
                .source(SourceMaterial::Text("x".into()))
                .requirements_map(m),
        )
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::UnknownTaskType("summarize".into()));
}

#[test]
fn invalid_requirement_field_is_rejected() {
    let p = protocol(1024);
    let m = match json!({"task_type": "classification", "num_classes": 0}) {
        Value::Object(m) => m,
        _ => unreachable!(),
    };
    let err = p
        .forget(
            ForgetRequest::new()
                .source(SourceMaterial::Text("x".into()))
                .requirements_map(m),
        )
        .unwrap_err();
    assert!(matches!(validation(err), ValidationError::InvalidRequirement { .. }));
}

#[test]
fn out_of_range_typed_requirements_are_rejected() {
    let p = protocol(1024);
    let nan_threshold = FunctionalRequirements::new(TaskSpec::Classification(ClassificationParams {
        confidence_threshold: f64::NAN,
        ..ClassificationParams::default()
    }));
    let cases = [
        FunctionalRequirements::text_generation(0),
        FunctionalRequirements::classification(10_000_000),
        nan_threshold,
    ];
    for requirements in cases {
        let err = p
            .forget(
                ForgetRequest::new()
                    .source(SourceMaterial::Text("hello world".into()))
                    .requirements(requirements),
            )
            .unwrap_err();
        assert!(matches!(validation(err), ValidationError::InvalidRequirement { .. }));
    }
}

#[test]
fn cancelled_budget_still_completes_run() {
    let p = protocol(1024);
    let token = CancellationToken::new();
    token.cancel();
    let budget = Budget::unbounded().with_token(token);
    let result = p
        .forget_with_budget(text_request(SourceMaterial::Text("hello world".into())), &budget)
        .unwrap();
    assert!(!result.extraction.converged);
    assert_eq!(result.extraction.target_dims, 64);
    assert!(p.verify_deletion_proof(&result.proof, &result.public_inputs));
}

#[test]
fn configured_timeout_bounds_extraction() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let p = CryptographicForgetting::new(ProtocolConfig {
        use_secure_erase: false,
        extraction_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    })
    .unwrap();
    let result = p
        .forget(text_request(SourceMaterial::Text("hello world".into())))
        .unwrap();
    assert!(result.performance_metrics.extraction < Duration::from_secs(31));
}

#[test]
fn parallel_obliteration_preserves_certificate_order() {
    let p = CryptographicForgetting::new(ProtocolConfig {
        use_secure_erase: false,
        obliteration_workers: 4,
        ..Default::default()
    })
    .unwrap();
    let result = p
        .forget(text_request(SourceMaterial::Text("hello world".into())))
        .unwrap();
    assert_eq!(result.deletion_certificates.len(), 10);
    assert!(result.deletion_certificates.last().unwrap().is_sweep());
    assert!(p.verify_deletion_proof(&result.proof, &result.public_inputs));
}
