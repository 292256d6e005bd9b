//! # forget-synth: Synthesis Phase
//!
//! Generates the protocol's output from the resonance vector plus fresh
//! CSPRNG entropy, so that no output is a deterministic function of the
//! resonance (and through it, of the source).
//!
//! - [`mixer`]: `tanh` mixing with entropy and Gaussian noise.
//! - [`render`]: per-task renderers, deterministic in the mixed vector.
//! - [`output`]: [`SynthesizedOutput`] with its digest, entropy fingerprint
//!   and structural check.

pub mod mixer;
pub mod output;
pub mod render;
pub mod synthesizer;

pub use output::{
    ClassificationOutput, FeatureSummary, OutputCheckError, StructuredOutput, SynthesizedOutput,
    PROBABILITY_TOLERANCE,
};
pub use synthesizer::{Synthesizer, SynthesizerConfig};
