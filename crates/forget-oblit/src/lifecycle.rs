//! # Destruction Lifecycle
//!
//! Every structure moves through five stages, strictly in order:
//!
//! Found → Encrypted → Overwritten → KeyErased → Certified
//!
//! A certificate may only claim success once its lifecycle has reached
//! `KeyErased`. Any attempt to skip or repeat a stage is rejected, and the
//! rejection is recorded as the certificate's failure reason.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::structure::StructureKind;

/// Stage of a structure's destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Enumerated, plaintext still present.
    Found,
    /// Sealed under an ephemeral key.
    Encrypted,
    /// Plaintext buffer overwritten and verified zero.
    Overwritten,
    /// Ephemeral key erased; the ciphertext is now unreadable.
    KeyErased,
    /// Certificate issued (terminal).
    Certified,
}

impl LifecycleStage {
    /// The stage that must follow this one, if any.
    pub fn next(&self) -> Option<LifecycleStage> {
        match self {
            Self::Found => Some(Self::Encrypted),
            Self::Encrypted => Some(Self::Overwritten),
            Self::Overwritten => Some(Self::KeyErased),
            Self::KeyErased => Some(Self::Certified),
            Self::Certified => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Certified)
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Found => "FOUND",
            Self::Encrypted => "ENCRYPTED",
            Self::Overwritten => "OVERWRITTEN",
            Self::KeyErased => "KEY_ERASED",
            Self::Certified => "CERTIFIED",
        };
        f.write_str(s)
    }
}

/// Rejected lifecycle transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `to` is not the successor of `from`.
    #[error("invalid destruction transition for {kind}: {from} -> {to}")]
    InvalidTransition {
        kind: StructureKind,
        from: LifecycleStage,
        to: LifecycleStage,
    },
    /// The structure is already certified.
    #[error("{kind} is already certified")]
    AlreadyCertified { kind: StructureKind },
}

/// Per-structure lifecycle tracker.
#[derive(Debug, Clone)]
pub struct DestructionLifecycle {
    kind: StructureKind,
    stage: LifecycleStage,
}

impl DestructionLifecycle {
    /// A freshly enumerated structure.
    pub fn new(kind: StructureKind) -> Self {
        Self {
            kind,
            stage: LifecycleStage::Found,
        }
    }

    pub fn kind(&self) -> StructureKind {
        self.kind
    }

    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }

    /// Move to `to`, which must be the immediate successor of the current stage.
    pub fn advance(&mut self, to: LifecycleStage) -> Result<LifecycleStage, LifecycleError> {
        match self.stage.next() {
            None => Err(LifecycleError::AlreadyCertified { kind: self.kind }),
            Some(next) if next == to => {
                tracing::trace!(kind = %self.kind, from = %self.stage, to = %to, "lifecycle advance");
                self.stage = to;
                Ok(to)
            }
            Some(_) => Err(LifecycleError::InvalidTransition {
                kind: self.kind,
                from: self.stage,
                to,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sequence() {
        let mut l = DestructionLifecycle::new(StructureKind::Original);
        for stage in [
            LifecycleStage::Encrypted,
            LifecycleStage::Overwritten,
            LifecycleStage::KeyErased,
            LifecycleStage::Certified,
        ] {
            assert_eq!(l.advance(stage).unwrap(), stage);
        }
        assert!(l.stage().is_terminal());
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut l = DestructionLifecycle::new(StructureKind::Keys);
        let err = l.advance(LifecycleStage::Overwritten).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                kind: StructureKind::Keys,
                from: LifecycleStage::Found,
                to: LifecycleStage::Overwritten,
            }
        );
        assert_eq!(l.stage(), LifecycleStage::Found);
    }

    #[test]
    fn test_repeating_a_stage_is_rejected() {
        let mut l = DestructionLifecycle::new(StructureKind::Sorted);
        l.advance(LifecycleStage::Encrypted).unwrap();
        assert!(l.advance(LifecycleStage::Encrypted).is_err());
    }

    #[test]
    fn test_no_transition_after_certified() {
        let mut l = DestructionLifecycle::new(StructureKind::Metadata);
        l.advance(LifecycleStage::Encrypted).unwrap();
        l.advance(LifecycleStage::Overwritten).unwrap();
        l.advance(LifecycleStage::KeyErased).unwrap();
        l.advance(LifecycleStage::Certified).unwrap();
        assert_eq!(
            l.advance(LifecycleStage::Found).unwrap_err(),
            LifecycleError::AlreadyCertified {
                kind: StructureKind::Metadata
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecycleStage::KeyErased.to_string(), "KEY_ERASED");
        assert!(LifecycleStage::Found < LifecycleStage::Certified);
    }
}
