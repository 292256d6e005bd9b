//! # Synthesized Outputs
//!
//! The closed set of outputs the synthesizer can produce, with the hashes
//! the proof binds them by and the structural check the proof relies on.
//!
//! ## Hashing
//!
//! Outputs carry floating point values, so they cannot go through
//! `CanonicalBytes`. [`SynthesizedOutput::digest`] hashes a tagged,
//! length-prefixed byte encoding instead: text as UTF-8, numbers as
//! little-endian `f64`, timestamps as epoch seconds.

use forget_core::{ContentDigest, Sha256Accumulator, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance on the probability sum of a classification output.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Result of a classification task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutput {
    /// Arg-max class, or `None` when the confidence is below threshold.
    pub predicted_class: Option<usize>,
    pub class_probabilities: Vec<f64>,
    /// Maximum probability.
    pub confidence: f64,
    pub uncertain: bool,
}

/// Summary statistics of a structured output's features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Result of a generic task with structured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    pub features: Vec<f64>,
    pub summary: FeatureSummary,
    pub dimensions: usize,
    pub generated_at: Timestamp,
}

/// Output of the synthesis phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SynthesizedOutput {
    Text { text: String },
    Classification(ClassificationOutput),
    Translation { text: String, target_language: String },
    Numeric { values: Vec<f64> },
    Structured(StructuredOutput),
}

/// A structural defect found by [`SynthesizedOutput::check_structure`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutputCheckError {
    #[error("text output is empty")]
    EmptyText,
    #[error("classification has no classes")]
    NoClasses,
    #[error("class probability at index {0} is outside [0, 1]")]
    ProbabilityOutOfRange(usize),
    #[error("class probabilities sum to {0}, expected 1")]
    ProbabilitySum(f64),
    #[error("confidence or prediction inconsistent with probabilities")]
    InconsistentPrediction,
    #[error("value at index {0} is outside its range")]
    ValueOutOfRange(usize),
    #[error("structured output summary or dimensions inconsistent with features")]
    InconsistentSummary,
}

impl SynthesizedOutput {
    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Classification(_) => "classification",
            Self::Translation { .. } => "translation",
            Self::Numeric { .. } => "numeric",
            Self::Structured(_) => "structured",
        }
    }

    /// Rendered text, for the text-bearing variants.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Translation { text, .. } => Some(text),
            _ => None,
        }
    }

    fn encode(&self, acc: &mut Sha256Accumulator) {
        fn str_field(acc: &mut Sha256Accumulator, s: &str) {
            acc.update(&(s.len() as u64).to_le_bytes()).update(s.as_bytes());
        }
        fn f64_field(acc: &mut Sha256Accumulator, v: &[f64]) {
            acc.update(&(v.len() as u64).to_le_bytes()).update_f64s(v);
        }
        str_field(acc, self.kind());
        match self {
            Self::Text { text } => str_field(acc, text),
            Self::Classification(c) => {
                let predicted = c.predicted_class.map_or(-1i64, |p| p as i64);
                acc.update(&predicted.to_le_bytes());
                f64_field(acc, &c.class_probabilities);
                acc.update_f64s(&[c.confidence]).update(&[u8::from(c.uncertain)]);
            }
            Self::Translation { text, target_language } => {
                str_field(acc, text);
                str_field(acc, target_language);
            }
            Self::Numeric { values } => f64_field(acc, values),
            Self::Structured(s) => {
                f64_field(acc, &s.features);
                acc.update_f64s(&[s.summary.mean, s.summary.std, s.summary.min, s.summary.max])
                    .update(&(s.dimensions as u64).to_le_bytes())
                    .update(&s.generated_at.epoch_secs().to_le_bytes());
            }
        }
    }

    /// SHA-256 over the output's tagged byte encoding.
    pub fn digest(&self) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        self.encode(&mut acc);
        acc.finalize()
    }

    /// Hash of the output's randomness profile.
    ///
    /// For text-bearing outputs this is the character histogram in
    /// first-seen order (`"{char}{count}"` concatenated); for the others it
    /// is a domain-separated hash of the byte encoding.
    pub fn entropy_fingerprint(&self) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        match self.text() {
            Some(text) => {
                let mut counts: Vec<(char, usize)> = Vec::new();
                for c in text.chars() {
                    match counts.iter_mut().find(|(seen, _)| *seen == c) {
                        Some((_, n)) => *n += 1,
                        None => counts.push((c, 1)),
                    }
                }
                for (c, n) in counts {
                    acc.update(format!("{c}{n}").as_bytes());
                }
            }
            None => {
                acc.update(b"forget:entropy-fingerprint:");
                self.encode(&mut acc);
            }
        }
        acc.finalize()
    }

    /// Validate the output's shape.
    pub fn check_structure(&self) -> Result<(), OutputCheckError> {
        match self {
            Self::Text { text } | Self::Translation { text, .. } => {
                if text.trim().is_empty() {
                    return Err(OutputCheckError::EmptyText);
                }
            }
            Self::Classification(c) => check_classification(c)?,
            Self::Numeric { values } => {
                if let Some(i) = values.iter().position(|v| !(0.0..=1.0).contains(v)) {
                    return Err(OutputCheckError::ValueOutOfRange(i));
                }
            }
            Self::Structured(s) => {
                if let Some(i) = s.features.iter().position(|v| !(-1.0..=1.0).contains(v)) {
                    return Err(OutputCheckError::ValueOutOfRange(i));
                }
                let eps = 1e-9;
                let consistent = s.dimensions == s.features.len()
                    && s.summary.min <= s.summary.mean + eps
                    && s.summary.mean <= s.summary.max + eps
                    && s.summary.std >= 0.0;
                if !consistent {
                    return Err(OutputCheckError::InconsistentSummary);
                }
            }
        }
        Ok(())
    }
}

fn check_classification(c: &ClassificationOutput) -> Result<(), OutputCheckError> {
    let probs = &c.class_probabilities;
    if probs.is_empty() {
        return Err(OutputCheckError::NoClasses);
    }
    if let Some(i) = probs.iter().position(|p| !(0.0..=1.0).contains(p)) {
        return Err(OutputCheckError::ProbabilityOutOfRange(i));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(OutputCheckError::ProbabilitySum(sum));
    }
    let max = probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let prediction_ok = match c.predicted_class {
        Some(p) => !c.uncertain && probs.get(p) == Some(&max),
        None => c.uncertain,
    };
    if c.confidence != max || !prediction_ok {
        return Err(OutputCheckError::InconsistentPrediction);
    }
    Ok(())
}
