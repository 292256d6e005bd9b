//! Per-phase wall-clock durations.

use std::time::{Duration, Instant};

use serde::Serialize;

/// A protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Extraction,
    Obliteration,
    Synthesis,
    ProofGeneration,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Self::Extraction,
        Self::Obliteration,
        Self::Synthesis,
        Self::ProofGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Obliteration => "obliteration",
            Self::Synthesis => "synthesis",
            Self::ProofGeneration => "proof_generation",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durations of one protocol run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub extraction: Duration,
    pub obliteration: Duration,
    pub synthesis: Duration,
    pub proof_generation: Duration,
    pub total: Duration,
}

impl PerformanceMetrics {
    pub fn phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Extraction => self.extraction,
            Phase::Obliteration => self.obliteration,
            Phase::Synthesis => self.synthesis,
            Phase::ProofGeneration => self.proof_generation,
        }
    }

    fn slot(&mut self, phase: Phase) -> &mut Duration {
        match phase {
            Phase::Extraction => &mut self.extraction,
            Phase::Obliteration => &mut self.obliteration,
            Phase::Synthesis => &mut self.synthesis,
            Phase::ProofGeneration => &mut self.proof_generation,
        }
    }

    /// Run `f` as `phase`, inside a tracing span, recording its duration.
    pub fn time<T>(&mut self, phase: Phase, f: impl FnOnce() -> T) -> T {
        let span = tracing::info_span!("phase", name = phase.as_str());
        let _entered = span.enter();
        let started = Instant::now();
        let out = f();
        let elapsed = started.elapsed();
        *self.slot(phase) = elapsed;
        tracing::info!(elapsed = ?elapsed, "{phase} complete");
        out
    }

    /// Sum of the phase durations.
    pub fn phase_sum(&self) -> Duration {
        Phase::ALL.iter().map(|p| self.phase(*p)).sum()
    }
}
