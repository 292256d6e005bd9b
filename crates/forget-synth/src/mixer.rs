//! Fresh-entropy mixing.
//!
//! `mixed_i = clip(tanh(r_i + 0.5·e_i) + n_i, -1, 1)` where `e` is CSPRNG
//! output mapped to `[-1, 1]` and `n ~ N(0, σ²)`. Both inputs are
//! zero-padded to the longer of the two.

use forget_crypto::entropy::{gaussian_vector, unit_interval_vector};

/// Weight of the entropy term inside the `tanh`.
pub const ENTROPY_WEIGHT: f64 = 0.5;
/// Default standard deviation of the additive noise.
pub const DEFAULT_NOISE_STD: f64 = 0.1;
/// Default lower bound on the entropy vector length.
pub const DEFAULT_MIN_ENTROPY: usize = 64;

/// Length of the fresh entropy vector for a resonance of width `dim`.
pub fn entropy_len(dim: usize, min_entropy: usize) -> usize {
    min_entropy.max(dim / 2)
}

/// Deterministic mix of a resonance, an entropy vector, and a noise vector.
///
/// `noise` shorter than the mixed length is treated as zero past its end.
pub fn mix(resonance: &[f64], entropy: &[f64], noise: &[f64]) -> Vec<f64> {
    let n = resonance.len().max(entropy.len());
    (0..n)
        .map(|i| {
            let r = resonance.get(i).copied().unwrap_or(0.0);
            let e = entropy.get(i).copied().unwrap_or(0.0);
            let z = noise.get(i).copied().unwrap_or(0.0);
            let v = (r + ENTROPY_WEIGHT * e).tanh() + z;
            if v.is_nan() {
                0.0
            } else {
                v.clamp(-1.0, 1.0)
            }
        })
        .collect()
}

/// Mix `resonance` with freshly drawn entropy and noise.
pub fn fresh_mix(resonance: &[f64], min_entropy: usize, noise_std: f64) -> Vec<f64> {
    let entropy = unit_interval_vector(entropy_len(resonance.len(), min_entropy));
    let n = resonance.len().max(entropy.len());
    let noise = gaussian_vector(n, noise_std);
    mix(resonance, &entropy, &noise)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_len() {
        assert_eq!(entropy_len(64, 64), 64);
        assert_eq!(entropy_len(1000, 64), 500);
        assert_eq!(entropy_len(0, 64), 64);
    }

    #[test]
    fn test_mix_pads_to_longer_input() {
        let m = mix(&[0.0; 3], &[0.0; 5], &[]);
        assert_eq!(m, vec![0.0; 5]);
        let m = mix(&[10.0; 5], &[], &[]);
        assert!(m.iter().all(|v| (*v - 10.0f64.tanh()).abs() < 1e-12));
    }

    #[test]
    fn test_mix_clips() {
        let m = mix(&[100.0, -100.0], &[1.0, -1.0], &[0.5, -0.5]);
        assert_eq!(m, vec![1.0, -1.0]);
    }

    #[test]
    fn test_mix_maps_nan_to_zero() {
        let m = mix(&[f64::NAN], &[0.0], &[0.0]);
        assert_eq!(m, vec![0.0]);
    }

    #[test]
    fn test_fresh_mix_differs_between_calls() {
        let r = vec![0.2; 64];
        let a = fresh_mix(&r, 64, DEFAULT_NOISE_STD);
        let b = fresh_mix(&r, 64, DEFAULT_NOISE_STD);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
