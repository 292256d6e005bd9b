//! Limited-memory BFGS with box projection and Armijo backtracking.
//!
//! Gradients come from central differences, so the objective only needs to
//! be evaluable. Every accepted step strictly decreases the objective, which
//! makes the final iterate the best one seen.

use std::collections::VecDeque;

use forget_core::Budget;
use serde::Serialize;

/// Why a minimization run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Gradient or relative decrease fell below tolerance.
    Converged,
    /// The iteration ceiling was reached.
    MaxIterations,
    /// The budget expired or the caller cancelled.
    Cancelled,
    /// No step along the search direction decreased the objective.
    LineSearchFailed,
}

/// Optimizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LbfgsConfig {
    pub history: usize,
    pub max_iterations: usize,
    /// Infinity-norm gradient tolerance.
    pub gtol: f64,
    /// Relative objective decrease tolerance.
    pub ftol: f64,
    /// Central-difference step.
    pub fd_step: f64,
    /// Optional `(lower, upper)` bound applied to every coordinate.
    pub bounds: Option<(f64, f64)>,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            history: 7,
            max_iterations: 100,
            gtol: 1e-5,
            ftol: 1e-10,
            fd_step: 1e-6,
            bounds: None,
        }
    }
}

/// Result of a minimization run.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub termination: Termination,
}

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 20;
const CURVATURE_EPS: f64 = 1e-10;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn project(x: &mut [f64], bounds: Option<(f64, f64)>) {
    if let Some((lo, hi)) = bounds {
        for v in x.iter_mut() {
            *v = v.clamp(lo, hi);
        }
    }
}

fn gradient<F: FnMut(&[f64]) -> f64>(f: &mut F, x: &[f64], h: f64) -> Vec<f64> {
    let mut probe = x.to_vec();
    let mut g = vec![0.0; x.len()];
    for i in 0..x.len() {
        probe[i] = x[i] + h;
        let up = f(&probe);
        probe[i] = x[i] - h;
        let down = f(&probe);
        probe[i] = x[i];
        let d = (up - down) / (2.0 * h);
        g[i] = if d.is_finite() { d } else { 0.0 };
    }
    g
}

/// Two-loop recursion: returns `H·g` for the implicit inverse Hessian `H`.
fn two_loop(g: &[f64], memory: &VecDeque<(Vec<f64>, Vec<f64>, f64)>) -> Vec<f64> {
    let mut q = g.to_vec();
    let mut alphas = Vec::with_capacity(memory.len());
    for (s, y, rho) in memory.iter().rev() {
        let a = rho * dot(s, &q);
        for (qi, yi) in q.iter_mut().zip(y) {
            *qi -= a * yi;
        }
        alphas.push(a);
    }
    if let Some((s, y, _)) = memory.back() {
        let gamma = dot(s, y) / dot(y, y).max(f64::MIN_POSITIVE);
        q.iter_mut().for_each(|v| *v *= gamma);
    }
    for ((s, y, rho), a) in memory.iter().zip(alphas.iter().rev()) {
        let b = rho * dot(y, &q);
        for (qi, si) in q.iter_mut().zip(s) {
            *qi += (a - b) * si;
        }
    }
    q
}

/// Minimize `f` starting from `x0`.
pub fn minimize<F>(mut f: F, x0: Vec<f64>, config: &LbfgsConfig, budget: &Budget) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let mut x = x0;
    project(&mut x, config.bounds);
    let mut fx = f(&x);
    let mut g = gradient(&mut f, &x, config.fd_step);
    let mut memory: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(config.history);
    let mut iterations = 0;

    let termination = loop {
        if iterations >= config.max_iterations {
            break Termination::MaxIterations;
        }
        if budget.exhausted() {
            break Termination::Cancelled;
        }
        if g.iter().fold(0.0f64, |m, v| m.max(v.abs())) < config.gtol {
            break Termination::Converged;
        }

        let mut direction: Vec<f64> = two_loop(&g, &memory).into_iter().map(|v| -v).collect();
        if dot(&direction, &g) >= 0.0 {
            direction = g.iter().map(|v| -v).collect();
            memory.clear();
        }
        let mut step = if memory.is_empty() {
            (1.0 / dot(&g, &g).sqrt()).min(1.0)
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let mut candidate: Vec<f64> = x.iter().zip(&direction).map(|(xi, di)| xi + step * di).collect();
            project(&mut candidate, config.bounds);
            let moved: Vec<f64> = candidate.iter().zip(&x).map(|(c, xi)| c - xi).collect();
            let value = f(&candidate);
            if value.is_finite() && value <= fx + ARMIJO_C * dot(&g, &moved) && value < fx {
                accepted = Some((candidate, value, moved));
                break;
            }
            step *= 0.5;
        }
        let Some((next, value, s)) = accepted else {
            break Termination::LineSearchFailed;
        };

        let next_g = gradient(&mut f, &next, config.fd_step);
        let y: Vec<f64> = next_g.iter().zip(&g).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > CURVATURE_EPS {
            if memory.len() == config.history {
                memory.pop_front();
            }
            memory.push_back((s, y, 1.0 / sy));
        }

        let relative = (fx - value).abs() / fx.abs().max(value.abs()).max(1.0);
        x = next;
        fx = value;
        g = next_g;
        iterations += 1;
        if relative < config.ftol {
            break Termination::Converged;
        }
    };

    Minimum {
        x,
        value: fx,
        iterations,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forget_core::CancellationToken;

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn test_quadratic_converges() {
        let f = |x: &[f64]| x.iter().enumerate().map(|(i, v)| (i as f64 + 1.0) * (v - 2.0).powi(2)).sum::<f64>();
        let m = minimize(f, vec![0.0; 5], &LbfgsConfig::default(), &Budget::unbounded());
        assert_eq!(m.termination, Termination::Converged);
        for v in &m.x {
            assert!((v - 2.0).abs() < 1e-3, "{v}");
        }
    }

    #[test]
    fn test_rosenbrock_improves() {
        let cfg = LbfgsConfig {
            max_iterations: 200,
            ..Default::default()
        };
        let m = minimize(rosenbrock, vec![-1.2, 1.0], &cfg, &Budget::unbounded());
        assert!(m.value < 1e-4, "value {}", m.value);
    }

    #[test]
    fn test_bounds_are_respected() {
        let cfg = LbfgsConfig {
            bounds: Some((-1.0, 1.0)),
            ..Default::default()
        };
        let m = minimize(|x: &[f64]| (x[0] - 5.0).powi(2), vec![0.0], &cfg, &Budget::unbounded());
        assert!(m.x[0] <= 1.0);
        assert!((m.x[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cancelled_returns_start() {
        let token = CancellationToken::new();
        token.cancel();
        let budget = Budget::unbounded().with_token(token);
        let m = minimize(|x: &[f64]| x[0] * x[0], vec![3.0], &LbfgsConfig::default(), &budget);
        assert_eq!(m.termination, Termination::Cancelled);
        assert_eq!(m.iterations, 0);
        assert_eq!(m.x, vec![3.0]);
    }

    #[test]
    fn test_iteration_ceiling() {
        let cfg = LbfgsConfig {
            max_iterations: 2,
            ..Default::default()
        };
        let m = minimize(rosenbrock, vec![-1.2, 1.0], &cfg, &Budget::unbounded());
        assert_eq!(m.termination, Termination::MaxIterations);
        assert_eq!(m.iterations, 2);
        assert!(m.value < rosenbrock(&[-1.2, 1.0]));
    }

    #[test]
    fn test_flat_objective_converges_immediately() {
        let m = minimize(|_: &[f64]| 1.0, vec![0.5; 3], &LbfgsConfig::default(), &Budget::unbounded());
        assert_eq!(m.termination, Termination::Converged);
        assert_eq!(m.iterations, 0);
    }
}
