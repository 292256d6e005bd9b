//! Protocol input and its validation.

use forget_core::{FunctionalRequirements, SourceMaterial, ValidationError};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
enum Requirements {
    Typed(FunctionalRequirements),
    Map(Map<String, Value>),
}

/// A request to forget a source.
///
/// Built incrementally; nothing is checked until the protocol validates it,
/// before any phase runs.
#[derive(Debug, Default)]
pub struct ForgetRequest {
    source: Option<SourceMaterial>,
    requirements: Option<Requirements>,
}

impl ForgetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: SourceMaterial) -> Self {
        self.source = Some(source);
        self
    }

    pub fn requirements(mut self, requirements: FunctionalRequirements) -> Self {
        self.requirements = Some(Requirements::Typed(requirements));
        self
    }

    /// Requirements in the loose key/value form, e.g.
    /// `{"task_type": "text_generation", "target_length": 10}`.
    pub fn requirements_map(mut self, map: Map<String, Value>) -> Self {
        self.requirements = Some(Requirements::Map(map));
        self
    }

    /// Split into a source and parsed requirements.
    ///
    /// # Errors
    ///
    /// In check order: [`ValidationError::MissingSource`],
    /// [`ValidationError::MissingRequirements`], any requirements parse
    /// error, and [`ValidationError::SourceTooLarge`].
    pub fn validate(
        self,
        max_source_bytes: u64,
    ) -> Result<(SourceMaterial, FunctionalRequirements), ValidationError> {
        let source = self.source.ok_or(ValidationError::MissingSource)?;
        let requirements = match self.requirements.ok_or(ValidationError::MissingRequirements)? {
            Requirements::Typed(r) => {
                r.validate()?;
                r
            }
            Requirements::Map(map) => FunctionalRequirements::from_map(&map)?,
        };
        let size = source.byte_size();
        if size > max_source_bytes {
            return Err(ValidationError::SourceTooLarge {
                size,
                max: max_source_bytes,
            });
        }
        Ok((source, requirements))
    }
}
