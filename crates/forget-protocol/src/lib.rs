//! # forget-protocol: Cryptographic Forgetting Orchestrator
//!
//! Takes a source and declared functional requirements and returns a
//! functionally equivalent output decorrelated from the source, deletion
//! certificates for every source-correlated representation, and a signed
//! proof binding the two.
//!
//! ```text
//! ForgetRequest ──validate──▶ Extraction ──▶ Obliteration ──▶ Synthesis ──▶ Proof
//!                               (&source)       (source)       (&resonance)
//! ```
//!
//! ## Crate Policy
//!
//! - Request validation happens before any phase runs.
//! - Destruction failures never abort a run; they are recorded in the
//!   certificates and make the proof unverifiable.

pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod request;

pub use config::{ConfigError, ProtocolConfig, DEFAULT_MAX_SOURCE_BYTES};
pub use error::ProtocolError;
pub use metrics::{PerformanceMetrics, Phase};
pub use protocol::{CryptographicForgetting, ForgettingResult};
pub use request::ForgetRequest;

pub use forget_core::{Budget, CancellationToken, FunctionalRequirements, SourceMaterial};
pub use forget_zkp::PublicInputs;
