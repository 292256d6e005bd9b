//! # Mutual-Information Estimation
//!
//! Estimates `I(source; resonance)` from paired samples `(s_i, r_i)`.
//!
//! ## Primary: Donsker–Varadhan critic
//!
//! A small ReLU network `T(x, y)` (2 → hidden → 1) is trained with Adam to
//! maximize
//!
//! ```text
//! E_joint[T(s_i, r_i)] - log E_marginal[exp T(s_i, r_pi(i))]
//! ```
//!
//! where `pi` is a fixed non-identity permutation. The bound is reported in
//! bits and clamped at zero. Between refreshes the critic is frozen, so the
//! estimate is a deterministic, piecewise-smooth function of the resonance.
//!
//! ## Fallback: entropy difference
//!
//! If the critic cannot be trained (too few samples, non-finite loss, budget
//! exhausted before the first epoch) the plug-in estimate
//! `H(S) + H(R) - H(S, R)` over 8 equal-width buckets per variable is used.
//!
//! ## Sample pairing
//!
//! The source sample (symbol frequencies or numeric values) is folded into at
//! most `dim` buckets by averaging contiguous runs, then standardized. The
//! resonance is standardized on every evaluation, which makes the estimate
//! invariant to the resonance's scale.

use forget_core::Budget;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;
use thiserror::Error;

/// Fewer paired samples than this and the critic is not trained.
pub const MIN_SAMPLES: usize = 4;
/// Buckets per variable in the entropy-difference fallback.
pub const HISTOGRAM_BUCKETS: usize = 8;

/// Why the neural estimator could not produce a bound.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// Not enough paired samples.
    #[error("insufficient samples for critic training: {0} < {MIN_SAMPLES}")]
    InsufficientSamples(usize),
    /// The training objective diverged.
    #[error("critic training produced a non-finite objective at epoch {0}")]
    NonFinite(usize),
    /// The budget ran out before the first epoch finished.
    #[error("critic training cancelled before the first epoch")]
    Cancelled,
}

/// Which estimator produced a mutual-information value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MiMethod {
    /// Trained Donsker–Varadhan critic.
    NeuralCritic,
    /// Histogram entropy difference.
    EntropyDifference,
}

/// Critic hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticConfig {
    /// Hidden layer width.
    pub hidden: usize,
    /// Full-batch training epochs per refresh.
    pub epochs: usize,
    /// Adam learning rate.
    pub learning_rate: f64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            hidden: 16,
            epochs: 200,
            learning_rate: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// Adam
// ---------------------------------------------------------------------------

/// Adam with bias correction over a flat parameter vector.
#[derive(Debug, Clone)]
struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    fn new(dim: usize, lr: f64) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: vec![0.0; dim],
            v: vec![0.0; dim],
            t: 0,
        }
    }

    fn step(&mut self, params: &mut [f64], gradients: &[f64]) {
        self.t += 1;
        let bc1 = 1.0 - self.beta1.powi(self.t);
        let bc2 = 1.0 - self.beta2.powi(self.t);
        for i in 0..params.len() {
            let g = gradients[i];
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = self.m[i] / bc1;
            let v_hat = self.v[i] / bc2;
            params[i] -= self.lr * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

// ---------------------------------------------------------------------------
// Critic
// ---------------------------------------------------------------------------

/// `T(x, y) = w2 . relu(W1 [x, y] + b1) + b2`, parameters stored flat as
/// `[W1 (2h) | b1 (h) | w2 (h) | b2]`.
#[derive(Debug, Clone)]
struct Critic {
    hidden: usize,
    params: Vec<f64>,
}

impl Critic {
    fn new(hidden: usize, rng: &mut StdRng) -> Self {
        let mut params = vec![0.0; 4 * hidden + 1];
        let scale_in = (1.0f64 / 2.0).sqrt();
        let scale_out = (1.0 / hidden.max(1) as f64).sqrt();
        for p in &mut params[..2 * hidden] {
            let z: f64 = StandardNormal.sample(rng);
            *p = z * scale_in;
        }
        for p in &mut params[3 * hidden..4 * hidden] {
            let z: f64 = StandardNormal.sample(rng);
            *p = z * scale_out;
        }
        Self { hidden, params }
    }

    fn score(&self, x: f64, y: f64) -> f64 {
        let h = self.hidden;
        let (w1, rest) = self.params.split_at(2 * h);
        let (b1, rest) = rest.split_at(h);
        let (w2, b2) = rest.split_at(h);
        let mut t = b2[0];
        for k in 0..h {
            let pre = w1[2 * k] * x + w1[2 * k + 1] * y + b1[k];
            if pre > 0.0 {
                t += w2[k] * pre;
            }
        }
        t
    }

    /// Donsker–Varadhan lower bound in nats.
    fn bound(&self, joint: &[(f64, f64)], marginal: &[(f64, f64)]) -> f64 {
        let n = joint.len() as f64;
        let tj: f64 = joint.iter().map(|(x, y)| self.score(*x, *y)).sum::<f64>() / n;
        let tm: Vec<f64> = marginal.iter().map(|(x, y)| self.score(*x, *y)).collect();
        tj - log_mean_exp(&tm)
    }

    /// Gradient of the negated bound with respect to the flat parameters.
    fn gradient(&self, joint: &[(f64, f64)], marginal: &[(f64, f64)]) -> Vec<f64> {
        let h = self.hidden;
        let n = joint.len() as f64;
        let tm: Vec<f64> = marginal.iter().map(|(x, y)| self.score(*x, *y)).collect();
        let max = tm.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = tm.iter().map(|t| (t - max).exp()).collect();
        let z: f64 = exps.iter().sum();

        let mut grad = vec![0.0; self.params.len()];
        let weighted = joint
            .iter()
            .map(|p| (*p, -1.0 / n))
            .chain(marginal.iter().zip(&exps).map(|(p, e)| (*p, e / z)));
        for ((x, y), w) in weighted {
            for k in 0..h {
                let pre = self.params[2 * k] * x + self.params[2 * k + 1] * y + self.params[2 * h + k];
                if pre > 0.0 {
                    let g = w * self.params[3 * h + k];
                    grad[2 * k] += g * x;
                    grad[2 * k + 1] += g * y;
                    grad[2 * h + k] += g;
                    grad[3 * h + k] += w * pre;
                }
            }
            grad[4 * h] += w;
        }
        grad
    }

    fn train(
        &mut self,
        joint: &[(f64, f64)],
        marginal: &[(f64, f64)],
        cfg: &CriticConfig,
        budget: &Budget,
    ) -> Result<f64, EstimationError> {
        let mut adam = Adam::new(self.params.len(), cfg.learning_rate);
        let mut completed = 0usize;
        for epoch in 0..cfg.epochs {
            if budget.exhausted() {
                break;
            }
            let grad = self.gradient(joint, marginal);
            if grad.iter().any(|g| !g.is_finite()) {
                return Err(EstimationError::NonFinite(epoch));
            }
            adam.step(&mut self.params, &grad);
            completed += 1;
        }
        if completed == 0 && cfg.epochs > 0 {
            return Err(EstimationError::Cancelled);
        }
        let bound = self.bound(joint, marginal);
        if !bound.is_finite() {
            return Err(EstimationError::NonFinite(completed));
        }
        Ok(bound)
    }
}

fn log_mean_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().map(|v| (v - max).exp()).sum::<f64>() / values.len() as f64;
    max + mean.ln()
}

// ---------------------------------------------------------------------------
// Sample preparation
// ---------------------------------------------------------------------------

/// Average contiguous runs of `sample` down to at most `buckets` values.
pub fn fold(sample: &[f64], buckets: usize) -> Vec<f64> {
    if sample.len() <= buckets || buckets == 0 {
        return sample.to_vec();
    }
    let mut sums = vec![0.0; buckets];
    let mut counts = vec![0usize; buckets];
    for (i, v) in sample.iter().enumerate() {
        let b = i * buckets / sample.len();
        sums[b] += v;
        counts[b] += 1;
    }
    sums.iter()
        .zip(&counts)
        .map(|(s, c)| if *c == 0 { 0.0 } else { s / *c as f64 })
        .collect()
}

/// Zero-mean, unit-variance copy; all zeros if the input is constant.
pub fn standardize(v: &[f64]) -> Vec<f64> {
    if v.is_empty() {
        return Vec::new();
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let std = (v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std < 1e-12 || !std.is_finite() {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| (x - mean) / std).collect()
}

/// Plug-in `H(X) + H(Y) - H(X, Y)` in bits over equal-width buckets.
pub fn entropy_difference_bits(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let bx = bucketize(&xs[..n]);
    let by = bucketize(&ys[..n]);
    let mut px = [0usize; HISTOGRAM_BUCKETS];
    let mut py = [0usize; HISTOGRAM_BUCKETS];
    let mut pxy = [[0usize; HISTOGRAM_BUCKETS]; HISTOGRAM_BUCKETS];
    for (a, b) in bx.iter().zip(&by) {
        px[*a] += 1;
        py[*b] += 1;
        pxy[*a][*b] += 1;
    }
    let h = |counts: &mut dyn Iterator<Item = usize>| -> f64 {
        counts
            .filter(|c| *c > 0)
            .map(|c| {
                let p = c as f64 / n as f64;
                -p * p.log2()
            })
            .sum()
    };
    let hx = h(&mut px.iter().copied());
    let hy = h(&mut py.iter().copied());
    let hxy = h(&mut pxy.iter().flat_map(|row| row.iter().copied()));
    (hx + hy - hxy).max(0.0)
}

fn bucketize(v: &[f64]) -> Vec<usize> {
    let lo = v.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = hi - lo;
    v.iter()
        .map(|x| {
            if !(width > 0.0) || !x.is_finite() {
                0
            } else {
                (((x - lo) / width * HISTOGRAM_BUCKETS as f64) as usize).min(HISTOGRAM_BUCKETS - 1)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Mutual-information estimator bound to one source and one resonance width.
#[derive(Debug, Clone)]
pub struct MutualInformation {
    xs: Vec<f64>,
    perm: Vec<usize>,
    critic: Option<Critic>,
    config: CriticConfig,
}

impl MutualInformation {
    /// Prepare paired samples for a source sample and resonance width `dim`.
    pub fn new(source_sample: &[f64], dim: usize, config: CriticConfig, rng: &mut StdRng) -> Self {
        let xs = standardize(&fold(source_sample, dim));
        let mut perm: Vec<usize> = (0..xs.len()).collect();
        perm.shuffle(rng);
        if perm.len() > 1 && perm.iter().enumerate().all(|(i, p)| i == *p) {
            perm.rotate_left(1);
        }
        Self {
            xs,
            perm,
            critic: None,
            config,
        }
    }

    /// Number of paired samples.
    pub fn samples(&self) -> usize {
        self.xs.len()
    }

    /// The estimator that [`Self::estimate_bits`] currently uses.
    pub fn method(&self) -> MiMethod {
        if self.critic.is_some() {
            MiMethod::NeuralCritic
        } else {
            MiMethod::EntropyDifference
        }
    }

    fn pairs(&self, r: &[f64]) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        let n = self.xs.len().min(r.len());
        let ys = standardize(&r[..n]);
        let joint = (0..n).map(|i| (self.xs[i], ys[i])).collect();
        let marginal = (0..n)
            .map(|i| {
                let j = self.perm[i];
                (self.xs[i], if j < n { ys[j] } else { ys[i] })
            })
            .collect();
        (joint, marginal)
    }

    /// Retrain the critic on the current resonance. On failure the estimator
    /// switches to the entropy-difference fallback until the next refresh.
    pub fn refresh(&mut self, r: &[f64], rng: &mut StdRng, budget: &Budget) -> MiMethod {
        let (joint, marginal) = self.pairs(r);
        if joint.len() < MIN_SAMPLES {
            tracing::warn!(
                error = %EstimationError::InsufficientSamples(joint.len()),
                "falling back to entropy-difference MI estimate"
            );
            self.critic = None;
            return self.method();
        }
        let mut critic = Critic::new(self.config.hidden, rng);
        match critic.train(&joint, &marginal, &self.config, budget) {
            Ok(bound) => {
                tracing::debug!(bound_bits = bound / std::f64::consts::LN_2, "critic trained");
                self.critic = Some(critic);
            }
            Err(e) => {
                tracing::warn!(error = %e, "falling back to entropy-difference MI estimate");
                self.critic = None;
            }
        }
        self.method()
    }

    /// Current estimate of `I(source; r)` in bits, never negative.
    pub fn estimate_bits(&self, r: &[f64]) -> f64 {
        match &self.critic {
            Some(critic) => {
                let (joint, marginal) = self.pairs(r);
                if joint.is_empty() {
                    return 0.0;
                }
                let bits = critic.bound(&joint, &marginal) / std::f64::consts::LN_2;
                if bits.is_finite() {
                    bits.max(0.0)
                } else {
                    0.0
                }
            }
            None => {
                let n = self.xs.len().min(r.len());
                entropy_difference_bits(&self.xs[..n], &r[..n])
            }
        }
    }
}
