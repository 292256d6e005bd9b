//! OS CSPRNG helpers.
//!
//! Every draw goes through `OsRng`, which is safe to call from any thread.
//! Nothing here is seeded or reproducible.

use rand::RngCore;
use rand_core::OsRng;
use rand_distr::{Distribution, Normal};

/// `n` bytes from the OS CSPRNG.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n];
    OsRng.fill_bytes(&mut out);
    out
}

/// A fixed-size array from the OS CSPRNG.
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}

/// `n` values in `[-1, 1]`, one per random byte, mapped as `b / 255 * 2 - 1`.
pub fn unit_interval_vector(n: usize) -> Vec<f64> {
    random_bytes(n)
        .into_iter()
        .map(|b| f64::from(b) / 255.0 * 2.0 - 1.0)
        .collect()
}

/// `n` draws from `N(0, sigma^2)`. A non-finite or negative `sigma` yields zeros.
pub fn gaussian_vector(n: usize, sigma: f64) -> Vec<f64> {
    match Normal::new(0.0, sigma) {
        Ok(normal) => (0..n).map(|_| normal.sample(&mut OsRng)).collect(),
        Err(_) => vec![0.0; n],
    }
}
