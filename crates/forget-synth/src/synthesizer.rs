//! The synthesis entry point.

use forget_core::{FunctionalRequirements, ResonanceVector};

use crate::mixer::{entropy_len, fresh_mix, DEFAULT_MIN_ENTROPY, DEFAULT_NOISE_STD};
use crate::output::SynthesizedOutput;
use crate::render::render;

/// Synthesizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizerConfig {
    /// Lower bound on the fresh entropy vector length.
    pub min_entropy: usize,
    /// Standard deviation of the additive Gaussian noise.
    pub noise_std: f64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            min_entropy: DEFAULT_MIN_ENTROPY,
            noise_std: DEFAULT_NOISE_STD,
        }
    }
}

impl SynthesizerConfig {
    /// Entropy floor for a configured entropy budget: at least
    /// `entropy_bits / 8` values and never fewer than the default.
    pub fn for_entropy_bits(entropy_bits: u32) -> Self {
        Self {
            min_entropy: DEFAULT_MIN_ENTROPY.max(entropy_bits as usize / 8),
            ..Self::default()
        }
    }
}

/// Produces task outputs from a resonance vector and fresh entropy.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Mix the resonance with fresh entropy and render the requested task.
    /// Two calls with the same inputs produce different outputs.
    pub fn synthesize(
        &self,
        resonance: &ResonanceVector,
        requirements: &FunctionalRequirements,
    ) -> SynthesizedOutput {
        let mixed = fresh_mix(resonance.values(), self.config.min_entropy, self.config.noise_std);
        let output = render(&mixed, &requirements.task);
        tracing::debug!(
            resonance_dims = resonance.dim(),
            entropy_size = entropy_len(resonance.dim(), self.config.min_entropy),
            output = output.kind(),
            "synthesis complete"
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forget_core::{GenericOutputType, GenericParams, TaskSpec, TranslationParams};

    fn resonance() -> ResonanceVector {
        ResonanceVector::new((0..64).map(|i| (i as f64 * 0.37).sin()).collect())
    }

    #[test]
    fn test_two_syntheses_differ_and_both_check() {
        let s = Synthesizer::default();
        let req = FunctionalRequirements::text_generation(10);
        let a = s.synthesize(&resonance(), &req);
        let b = s.synthesize(&resonance(), &req);
        assert_ne!(a, b);
        assert!(a.check_structure().is_ok());
        assert!(b.check_structure().is_ok());
    }

    #[test]
    fn test_every_task_passes_structure_check() {
        let s = Synthesizer::default();
        let tasks = [
            FunctionalRequirements::text_generation(10),
            FunctionalRequirements::classification(5),
            FunctionalRequirements::new(TaskSpec::Translation(TranslationParams::default())),
            FunctionalRequirements::new(TaskSpec::Generic(GenericParams::default())),
            FunctionalRequirements::new(TaskSpec::Generic(GenericParams {
                output_type: GenericOutputType::Numeric,
            })),
            FunctionalRequirements::new(TaskSpec::Generic(GenericParams {
                output_type: GenericOutputType::Structured,
            })),
        ];
        for req in &tasks {
            let out = s.synthesize(&resonance(), req);
            assert!(out.check_structure().is_ok(), "{} failed", req.task.name());
        }
    }

    #[test]
    fn test_classification_probabilities_sum_to_one() {
        let out = Synthesizer::default().synthesize(&resonance(), &FunctionalRequirements::classification(4));
        match out {
            crate::SynthesizedOutput::Classification(c) => {
                assert_eq!(c.class_probabilities.len(), 4);
                let sum: f64 = c.class_probabilities.iter().sum();
                assert!((sum - 1.0).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_entropy_floor_from_bits() {
        assert_eq!(SynthesizerConfig::for_entropy_bits(256).min_entropy, 64);
        assert_eq!(SynthesizerConfig::for_entropy_bits(1024).min_entropy, 128);
    }

    #[test]
    fn test_empty_resonance_still_renders() {
        let out = Synthesizer::default().synthesize(
            &ResonanceVector::new(Vec::new()),
            &FunctionalRequirements::text_generation(3),
        );
        assert!(out.check_structure().is_ok());
    }
}
