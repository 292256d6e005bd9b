//! # Resonance Vector
//!
//! The compact representation produced by Extraction: enough to drive
//! Synthesis for the declared task, penalized toward zero mutual information
//! with the source. Values never leave the process in serialized form;
//! only their commitment does.

use zeroize::Zeroize;

use crate::digest::{ContentDigest, Sha256Accumulator};

/// Fixed-dimension real vector, zeroized on drop.
#[derive(Clone, PartialEq)]
pub struct ResonanceVector {
    values: Vec<f64>,
}

impl ResonanceVector {
    /// Wrap a vector of values.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Dimension.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Read-only view of the values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Euclidean norm.
    pub fn l2_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Arithmetic mean (0 for an empty vector).
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population standard deviation (0 for an empty vector).
    pub fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let m = self.mean();
        let var = self.values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / self.values.len() as f64;
        var.sqrt()
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// SHA-256 over the little-endian `f64` bytes of every component.
    pub fn commitment(&self) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        acc.update_f64s(&self.values);
        acc.finalize()
    }
}

impl Drop for ResonanceVector {
    fn drop(&mut self) {
        self.values.zeroize();
    }
}

impl std::fmt::Debug for ResonanceVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResonanceVector(dim={}, <redacted>)", self.values.len())
    }
}
