//! # Extractor
//!
//! Minimizes `functional_loss(profile, r, requirements) + λ·MI(source, r)`
//! over a resonance vector of fixed width.
//!
//! Optimization runs in rounds. Each round retrains the mutual-information
//! critic on the current iterate and then runs at most
//! `critic_refresh_interval` L-BFGS iterations against the frozen critic.
//! The run ends when an L-BFGS round converges, the budget is exhausted, the
//! line search stalls, or `max_iterations` is reached. The best iterate is
//! always returned; non-convergence is recorded, never raised.
//!
//! ## Security Invariant
//!
//! The source is only read while building the [`SourceProfile`]; the
//! optimizer never sees it. The resonance values are never logged.

use std::time::{Duration, Instant};

use forget_core::{Budget, FunctionalRequirements, ResonanceVector, SourceMaterial, Timestamp};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;

use crate::lbfgs::{minimize, LbfgsConfig, Termination};
use crate::loss::functional_loss;
use crate::mi::{CriticConfig, MiMethod, MutualInformation};
use crate::profile::SourceProfile;

/// Extractor settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Resonance width.
    pub target_dims: usize,
    /// Weight λ of the mutual-information penalty.
    pub mutual_info_penalty: f64,
    /// Total L-BFGS iteration ceiling across all rounds.
    pub max_iterations: usize,
    /// L-BFGS iterations per critic refresh.
    pub critic_refresh_interval: usize,
    pub critic: CriticConfig,
    /// Fixed seed for the initial draw and critic initialization.
    pub seed: Option<u64>,
    /// Optional per-coordinate box bound.
    pub bounds: Option<(f64, f64)>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            target_dims: 64,
            mutual_info_penalty: 10.0,
            max_iterations: 100,
            critic_refresh_interval: 25,
            critic: CriticConfig::default(),
            seed: None,
            bounds: None,
        }
    }
}

/// What happened during one extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRecord {
    pub source_size: u64,
    pub target_dims: usize,
    pub mutual_info_penalty: f64,
    pub final_loss: f64,
    pub functional_loss: f64,
    /// Mutual information in bits at the returned iterate.
    pub mutual_info: f64,
    pub mi_method: MiMethod,
    pub iterations: usize,
    pub termination: Termination,
    pub converged: bool,
    pub elapsed: Duration,
    pub completed_at: Timestamp,
}

/// Output of [`Extractor::extract`].
#[derive(Debug)]
pub struct Extraction {
    pub resonance: ResonanceVector,
    pub record: ExtractionRecord,
}

/// Caller-owned log of extraction records.
#[derive(Debug, Clone, Default)]
pub struct ExtractionHistory {
    records: Vec<ExtractionRecord>,
}

/// Aggregates over an [`ExtractionHistory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub total_extractions: usize,
    pub average_functional_loss: f64,
    pub average_mutual_info: f64,
    pub convergence_rate: f64,
    pub last_extraction: Option<Timestamp>,
}

impl ExtractionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ExtractionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ExtractionRecord] {
        &self.records
    }

    /// `None` when no extraction has been recorded.
    pub fn summary(&self) -> Option<ExtractionSummary> {
        if self.records.is_empty() {
            return None;
        }
        let n = self.records.len() as f64;
        let mean = |f: fn(&ExtractionRecord) -> f64| self.records.iter().map(f).sum::<f64>() / n;
        Some(ExtractionSummary {
            total_extractions: self.records.len(),
            average_functional_loss: mean(|r| r.functional_loss),
            average_mutual_info: mean(|r| r.mutual_info),
            convergence_rate: mean(|r| if r.converged { 1.0 } else { 0.0 }),
            last_extraction: self.records.last().map(|r| r.completed_at),
        })
    }
}

/// Stateless extraction engine; one instance per resonance width.
#[derive(Debug, Clone)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Minimal representation of `source` that satisfies `requirements`.
    pub fn extract(
        &self,
        source: &SourceMaterial,
        requirements: &FunctionalRequirements,
        budget: &Budget,
    ) -> Extraction {
        let started = Instant::now();
        let cfg = &self.config;
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let profile = SourceProfile::of(source);
        let mut r: Vec<f64> = (0..cfg.target_dims).map(|_| StandardNormal.sample(&mut rng)).collect();
        if let Some((lo, hi)) = cfg.bounds {
            r.iter_mut().for_each(|v| *v = v.clamp(lo, hi));
        }
        let mut mi = MutualInformation::new(&profile.sample, cfg.target_dims, cfg.critic.clone(), &mut rng);

        tracing::debug!(
            source_type = source.source_type().as_str(),
            task = requirements.task.name(),
            target_dims = cfg.target_dims,
            samples = mi.samples(),
            "extraction started"
        );

        let lambda = cfg.mutual_info_penalty;
        let mut iterations = 0;
        let mut round = 0;
        let mut termination = Termination::MaxIterations;
        let mut method = mi.method();
        while iterations < cfg.max_iterations {
            if budget.exhausted() {
                termination = Termination::Cancelled;
                break;
            }
            method = mi.refresh(&r, &mut rng, budget);
            let lbfgs = LbfgsConfig {
                max_iterations: cfg.critic_refresh_interval.min(cfg.max_iterations - iterations).max(1),
                bounds: cfg.bounds,
                ..LbfgsConfig::default()
            };
            let objective = |x: &[f64]| functional_loss(&profile, x, requirements) + lambda * mi.estimate_bits(x);
            let min = minimize(objective, std::mem::take(&mut r), &lbfgs, budget);
            r = min.x;
            iterations += min.iterations;
            round += 1;
            tracing::debug!(
                round,
                iterations = min.iterations,
                loss = min.value,
                mi_method = ?method,
                termination = ?min.termination,
                "extraction round finished"
            );
            termination = min.termination;
            if termination != Termination::MaxIterations {
                break;
            }
        }

        let functional = functional_loss(&profile, &r, requirements);
        let mutual_info = mi.estimate_bits(&r);
        let record = ExtractionRecord {
            source_size: source.byte_size(),
            target_dims: cfg.target_dims,
            mutual_info_penalty: lambda,
            final_loss: functional + lambda * mutual_info,
            functional_loss: functional,
            mutual_info,
            mi_method: method,
            iterations,
            termination,
            converged: termination == Termination::Converged,
            elapsed: started.elapsed(),
            completed_at: Timestamp::now(),
        };
        tracing::info!(
            target_dims = record.target_dims,
            iterations = record.iterations,
            termination = ?record.termination,
            functional_loss = record.functional_loss,
            mutual_info_bits = record.mutual_info,
            "extraction complete"
        );
        Extraction {
            resonance: ResonanceVector::new(r),
            record,
        }
    }
}
