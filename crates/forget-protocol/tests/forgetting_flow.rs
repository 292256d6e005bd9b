//! # End-to-End Forgetting Runs
//!
//! Full protocol runs through the public API: every phase executes and the
//! resulting proof is checked the way an external verifier would.

use forget_oblit::CertificateScope;
use forget_protocol::{
    CryptographicForgetting, ForgetRequest, ProtocolConfig, PublicInputs, SourceMaterial,
};
use forget_synth::SynthesizedOutput;
use serde_json::{json, Map, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn protocol() -> CryptographicForgetting {
    init_tracing();
    CryptographicForgetting::new(ProtocolConfig {
        use_secure_erase: false,
        ..Default::default()
    })
    .unwrap()
}

fn map(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        other => panic!("not an object: {other}"),
    }
}

fn hello_world() -> ForgetRequest {
    ForgetRequest::new()
        .source(SourceMaterial::Text("hello world".into()))
        .requirements_map(map(json!({"task_type": "text_generation", "target_length": 10})))
}

#[test]
fn hello_world_scenario() {
    let p = protocol();
    let result = p.forget(hello_world()).unwrap();

    assert_eq!(result.extraction.target_dims, 64);
    assert_eq!(result.deletion_certificates.len(), 10);
    assert!(result.deletion_certificates.iter().all(|c| c.success));
    let last = result.deletion_certificates.last().unwrap();
    assert_eq!(last.scope, CertificateScope::Sweep);

    let text = result.output.text().unwrap();
    assert!(!text.trim().is_empty());
    assert_eq!(text.split(' ').filter(|w| *w != "." && *w != ",").count(), 10);

    assert_eq!(result.public_inputs.certificate_count, 10);
    assert!(p.verify_deletion_proof(&result.proof, &result.public_inputs));
}

#[test]
fn every_proof_byte_flip_is_rejected() {
    let p = protocol();
    let result = p.forget(hello_world()).unwrap();
    for i in 0..result.proof.len() {
        let mut tampered = result.proof.clone();
        tampered[i] ^= 0x01;
        assert!(
            !p.verify_deletion_proof(&tampered, &result.public_inputs),
            "flip at byte {i} accepted"
        );
    }
}

#[test]
fn wrong_public_inputs_are_rejected() {
    let p = protocol();
    let result = p.forget(hello_world()).unwrap();
    let other = p.forget(hello_world()).unwrap();

    let variants: Vec<PublicInputs> = vec![
        PublicInputs {
            certificate_count: 9,
            ..result.public_inputs.clone()
        },
        PublicInputs {
            output_hash: other.public_inputs.output_hash.clone(),
            ..result.public_inputs.clone()
        },
        PublicInputs {
            resonance_commitment: other.public_inputs.resonance_commitment.clone(),
            ..result.public_inputs.clone()
        },
        PublicInputs {
            certificate_root: other.public_inputs.certificate_root.clone(),
            ..result.public_inputs.clone()
        },
    ];
    for inputs in &variants {
        assert!(!p.verify_deletion_proof(&result.proof, inputs));
    }
    assert!(!p.verify_deletion_proof(&result.proof, &other.public_inputs));
}

#[test]
fn proof_from_another_instance_is_rejected() {
    let a = protocol();
    let b = protocol();
    let result = a.forget(hello_world()).unwrap();
    assert!(!b.verify_deletion_proof(&result.proof, &result.public_inputs));
}

#[test]
fn two_runs_differ_and_both_verify() {
    let p = protocol();
    let first = p.forget(hello_world()).unwrap();
    let second = p.forget(hello_world()).unwrap();

    assert_ne!(first.output, second.output);
    assert_ne!(first.proof, second.proof);
    assert_ne!(
        first.deletion_certificates[0].certificate_id,
        second.deletion_certificates[0].certificate_id
    );
    for r in [&first, &second] {
        assert!(r.output.check_structure().is_ok());
        assert!(p.verify_deletion_proof(&r.proof, &r.public_inputs));
    }
}

#[test]
fn classification_probabilities_sum_to_one() {
    let p = protocol();
    let result = p
        .forget(
            ForgetRequest::new()
                .source(SourceMaterial::Text("the quick brown fox".into()))
                .requirements_map(map(json!({"task_type": "classification", "num_classes": 5}))),
        )
        .unwrap();
    match &result.output {
        SynthesizedOutput::Classification(c) => {
            assert_eq!(c.class_probabilities.len(), 5);
            let sum: f64 = c.class_probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        other => panic!("unexpected output {other:?}"),
    }
    assert!(p.verify_deletion_proof(&result.proof, &result.public_inputs));
}

#[test]
fn every_source_type_runs_end_to_end() {
    let p = protocol();
    let sources = [
        (SourceMaterial::Numeric(vec![0.5, -1.5, 3.25, 8.0]), 6),
        (
            SourceMaterial::Structured(vec![
                ("name".into(), "ada".into()),
                ("role".into(), "engineer".into()),
            ]),
            7,
        ),
        (SourceMaterial::Binary(vec![1, 2, 3, 4, 5]), 5),
    ];
    for (source, certs) in sources {
        let result = p
            .forget(
                ForgetRequest::new()
                    .source(source)
                    .requirements_map(map(json!({"task_type": "generic", "output_type": "structured"}))),
            )
            .unwrap();
        assert_eq!(result.deletion_certificates.len(), certs);
        assert_eq!(result.extraction.target_dims, 64);
        assert!(p.verify_deletion_proof(&result.proof, &result.public_inputs));
    }
}

#[test]
fn translation_keeps_target_language() {
    let p = protocol();
    let result = p
        .forget(
            ForgetRequest::new()
                .source(SourceMaterial::Text("bonjour tout le monde".into()))
                .requirements_map(map(json!({"task_type": "translation", "target_language": "de"}))),
        )
        .unwrap();
    assert!(matches!(
        result.output,
        SynthesizedOutput::Translation { ref target_language, .. } if target_language == "de"
    ));
}

#[test]
fn metrics_cover_every_phase() {
    let p = protocol();
    let result = p.forget(hello_world()).unwrap();
    let m = &result.performance_metrics;
    assert!(m.total >= m.phase_sum());
    assert!(m.extraction > std::time::Duration::ZERO);
}
