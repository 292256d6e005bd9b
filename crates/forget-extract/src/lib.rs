//! # forget-extract: Extraction Phase
//!
//! Produces a fixed-width [`ResonanceVector`](forget_core::ResonanceVector)
//! that carries what the declared task needs from a source while penalizing
//! the mutual information it keeps with that source.
//!
//! - [`profile`]: one-pass source statistics.
//! - [`loss`]: task-specific functional losses.
//! - [`mi`]: Donsker–Varadhan critic with an entropy-difference fallback.
//! - [`lbfgs`]: bounded, cancellable L-BFGS.
//! - [`extractor`]: the alternating critic/optimizer loop and its records.

pub mod extractor;
pub mod lbfgs;
pub mod loss;
pub mod mi;
pub mod profile;

pub use extractor::{
    Extraction, ExtractionHistory, ExtractionRecord, ExtractionSummary, Extractor, ExtractorConfig,
};
pub use lbfgs::{LbfgsConfig, Termination};
pub use mi::{CriticConfig, EstimationError, MiMethod};
pub use profile::SourceProfile;
