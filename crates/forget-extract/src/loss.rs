//! Task-specific functional losses.
//!
//! Each loss compares a few structural statistics of the source (from its
//! [`SourceProfile`]) with a projection of the resonance vector. The
//! comparisons are coarse: they keep enough of the source's
//! shape for the declared task without pulling in its content.

use forget_core::{
    ClassificationParams, FunctionalRequirements, Regularization, Sha256Accumulator, TaskSpec,
};

use crate::profile::{SourceProfile, SEMANTIC_FEATURES};

const REGULARIZATION_WEIGHT: f64 = 0.01;

/// Summary statistics of a resonance candidate.
#[derive(Debug, Clone, Copy)]
struct Moments {
    dim: f64,
    mean: f64,
    std: f64,
    norm: f64,
}

fn moments(r: &[f64]) -> Moments {
    let dim = r.len() as f64;
    if r.is_empty() {
        return Moments {
            dim,
            mean: 0.0,
            std: 0.0,
            norm: 0.0,
        };
    }
    let mean = r.iter().sum::<f64>() / dim;
    let std = (r.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / dim).sqrt();
    let norm = r.iter().map(|v| v * v).sum::<f64>().sqrt();
    Moments { dim, mean, std, norm }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Stable numeric code in `[0, 1)` for a class label.
pub fn class_code(label: &str) -> f64 {
    let mut acc = Sha256Accumulator::new();
    acc.update(label.as_bytes());
    let digest = acc.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.bytes[..8]);
    (u64::from_le_bytes(head) % 1000) as f64 / 1000.0
}

/// Functional loss plus regularization for a resonance candidate.
pub fn functional_loss(profile: &SourceProfile, r: &[f64], req: &FunctionalRequirements) -> f64 {
    let m = moments(r);
    let task = match &req.task {
        TaskSpec::TextGeneration(_) if profile.is_text => text_loss(profile, m),
        TaskSpec::Classification(ClassificationParams {
            target_class: Some(label),
            ..
        }) => classification_loss(profile, m, label),
        TaskSpec::Translation(_) => translation_loss(profile, r),
        TaskSpec::TextGeneration(_) | TaskSpec::Classification(_) | TaskSpec::Generic(_) => {
            generic_loss(profile, m)
        }
    };
    let reg = match req.regularization {
        None => 0.0,
        Some(Regularization::L2) => REGULARIZATION_WEIGHT * m.norm * m.norm,
        Some(Regularization::L1) => REGULARIZATION_WEIGHT * r.iter().map(|v| v.abs()).sum::<f64>(),
    };
    task + reg
}

fn text_loss(p: &SourceProfile, m: Moments) -> f64 {
    let length_loss = (p.length - m.norm).abs() / p.length.max(1.0);
    let semantic = if p.length == 0.0 {
        0.0
    } else {
        let structure = (p.word_count - m.norm * 10.0).abs() / p.word_count.max(1.0);
        let diversity = (p.diversity - m.std).abs() / p.diversity.max(0.1);
        structure + 0.1 * diversity
    };
    length_loss + 0.1 * semantic
}

fn classification_loss(p: &SourceProfile, m: Moments, label: &str) -> f64 {
    euclidean(
        &[p.length, p.diversity, class_code(label)],
        &[m.mean, m.std, m.norm],
    )
}

fn translation_loss(p: &SourceProfile, r: &[f64]) -> f64 {
    let mut projected = [0.0; SEMANTIC_FEATURES];
    for (dst, src) in projected.iter_mut().zip(r) {
        *dst = *src;
    }
    euclidean(&p.semantic, &projected)
}

fn generic_loss(p: &SourceProfile, m: Moments) -> f64 {
    let structure = euclidean(&p.structure, &[m.dim, m.std, m.mean, m.norm]);
    structure + 0.1 * (p.diversity - m.std).abs()
}
