//! Source statistics computed once per extraction.
//!
//! The objective is evaluated thousands of times during optimization. None
//! of those evaluations touch the source itself; they read this profile.

use std::collections::{HashMap, HashSet};

use forget_core::SourceMaterial;
use zeroize::{Zeroize, Zeroizing};

/// Width of the character/byte frequency vector.
pub const FREQUENCY_BINS: usize = 256;
/// Width of the word-frequency semantic feature vector.
pub const SEMANTIC_FEATURES: usize = 100;

/// Precomputed statistics of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProfile {
    /// True when the source is text.
    pub is_text: bool,
    /// Length in characters (text), values (numeric) or bytes (otherwise).
    pub length: f64,
    /// Distinct symbols over length.
    pub diversity: f64,
    /// Word count (text only, 0 otherwise).
    pub word_count: f64,
    /// `[length, diversity, third, fourth]`: whitespace and uppercase ratios
    /// for symbolic sources, standard deviation and mean for numeric ones.
    pub structure: [f64; 4],
    /// Relative word frequencies in first-seen order, zero-padded.
    pub semantic: Vec<f64>,
    /// The sample the mutual-information estimators pair with the
    /// resonance: normalized symbol frequencies, or the raw numeric values.
    pub sample: Vec<f64>,
}

impl SourceProfile {
    /// Profile a source.
    pub fn of(source: &SourceMaterial) -> Self {
        match source {
            SourceMaterial::Text(s) => Self::of_text(s),
            SourceMaterial::Numeric(v) => Self::of_numeric(v),
            SourceMaterial::Binary(b) => Self::of_bytes(b),
            SourceMaterial::Structured(_) => {
                let mut bytes = source.to_bytes();
                let profile = Self::of_bytes(&bytes);
                bytes.zeroize();
                profile
            }
        }
    }

    fn of_text(s: &str) -> Self {
        let mut len = 0usize;
        let mut spaces = 0usize;
        let mut upper = 0usize;
        let mut distinct = HashSet::new();
        let mut freq = vec![0.0; FREQUENCY_BINS];
        for c in s.chars() {
            len += 1;
            if c == ' ' {
                spaces += 1;
            }
            if c.is_uppercase() {
                upper += 1;
            }
            distinct.insert(c);
            let code = c as usize;
            if code < FREQUENCY_BINS {
                freq[code] += 1.0;
            }
        }
        normalize(&mut freq);

        let words = lowercase_words(s);
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for w in words.iter() {
            let entry = counts.entry(w.as_str()).or_insert(0);
            if *entry == 0 {
                order.push(w.as_str());
            }
            *entry += 1;
        }
        let mut semantic = vec![0.0; SEMANTIC_FEATURES];
        for (slot, w) in semantic.iter_mut().zip(order.iter()) {
            *slot = counts.get(w).copied().unwrap_or(0) as f64 / words.len() as f64;
        }

        let length = len as f64;
        let ratio = |n: usize| if len == 0 { 0.0 } else { n as f64 / length };
        let diversity = ratio(distinct.len());
        Self {
            is_text: true,
            length,
            diversity,
            word_count: words.len() as f64,
            structure: [length, diversity, ratio(spaces), ratio(upper)],
            semantic,
            sample: freq,
        }
    }

    fn of_numeric(values: &[f64]) -> Self {
        let n = values.len();
        let length = n as f64;
        let distinct: HashSet<u64> = values.iter().map(|v| v.to_bits()).collect();
        let diversity = if n == 0 { 0.0 } else { distinct.len() as f64 / length };
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let m = finite.len() as f64;
        let mean = if finite.is_empty() { 0.0 } else { finite.iter().sum::<f64>() / m };
        let std = if finite.is_empty() {
            0.0
        } else {
            (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / m).sqrt()
        };
        Self {
            is_text: false,
            length,
            diversity,
            word_count: 0.0,
            structure: [length, diversity, std, mean],
            semantic: vec![0.0; SEMANTIC_FEATURES],
            sample: finite,
        }
    }

    fn of_bytes(bytes: &[u8]) -> Self {
        let mut freq = vec![0.0; FREQUENCY_BINS];
        let mut spaces = 0usize;
        let mut upper = 0usize;
        for b in bytes {
            freq[*b as usize] += 1.0;
            if *b == b' ' {
                spaces += 1;
            }
            if b.is_ascii_uppercase() {
                upper += 1;
            }
        }
        let distinct = freq.iter().filter(|c| **c > 0.0).count();
        normalize(&mut freq);
        let n = bytes.len();
        let length = n as f64;
        let ratio = |k: usize| if n == 0 { 0.0 } else { k as f64 / length };
        let diversity = ratio(distinct);
        Self {
            is_text: false,
            length,
            diversity,
            word_count: 0.0,
            structure: [length, diversity, ratio(spaces), ratio(upper)],
            semantic: vec![0.0; SEMANTIC_FEATURES],
            sample: freq,
        }
    }
}

/// Lowercased copies of the source's words, wiped when dropped.
fn lowercase_words(s: &str) -> Zeroizing<Vec<String>> {
    Zeroizing::new(s.split_whitespace().map(str::to_lowercase).collect())
}

fn normalize(v: &mut [f64]) {
    let total: f64 = v.iter().sum();
    if total > 0.0 {
        v.iter_mut().for_each(|x| *x /= total);
    }
}
