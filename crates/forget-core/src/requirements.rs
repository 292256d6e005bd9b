//! # Functional Requirements
//!
//! What the synthesized output must be able to do. Tasks form a closed
//! enumeration; each variant carries its own typed parameters and every
//! consumer dispatches with an exhaustive `match`.
//!
//! The loose key/value form accepted at the protocol boundary is parsed by
//! [`FunctionalRequirements::from_map`]:
//!
//! - an empty map is rejected,
//! - a missing `task_type` selects [`TaskSpec::Generic`],
//! - an unrecognized `task_type` is rejected,
//! - parameter fields are type-checked and range-checked.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Upper bound on `target_length` for text generation.
pub const MAX_TARGET_LENGTH: usize = 10_000;
/// Upper bound on `num_classes`; never larger than the shortest mixed vector.
pub const MAX_CLASSES: usize = 64;

/// Writing style for text generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    /// Free-form words with punctuation.
    #[default]
    Creative,
    /// Interleaves technical vocabulary.
    Technical,
    /// Fixed-width filler words.
    Generic,
}

/// Tone applied to creative text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTone {
    /// Uniform alphabet.
    #[default]
    Neutral,
    /// Alternating consonant/vowel.
    Poetic,
    /// Restricted open-vowel alphabet.
    Dramatic,
}

/// Output shape for the generic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericOutputType {
    /// 50 words of generic text.
    #[default]
    Text,
    /// The mixed vector rescaled to `[0, 1]`.
    Numeric,
    /// Features plus summary statistics.
    Structured,
}

/// Optional penalty on the resonance vector during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularization {
    /// `0.01 * ||r||_1`.
    L1,
    /// `0.01 * ||r||_2^2`.
    L2,
}

/// Parameters for [`TaskSpec::TextGeneration`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextGenerationParams {
    /// Number of words to emit.
    pub target_length: usize,
    /// Writing style.
    pub style: TextStyle,
    /// Tone for creative text.
    pub tone: TextTone,
}

impl Default for TextGenerationParams {
    fn default() -> Self {
        Self {
            target_length: 100,
            style: TextStyle::default(),
            tone: TextTone::default(),
        }
    }
}

/// Parameters for [`TaskSpec::Classification`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationParams {
    /// Number of classes in the probability vector.
    pub num_classes: usize,
    /// Below this maximum probability the prediction is reported uncertain.
    pub confidence_threshold: f64,
    /// Class whose features the extraction should preserve, if any.
    pub target_class: Option<String>,
}

impl Default for ClassificationParams {
    fn default() -> Self {
        Self {
            num_classes: 2,
            confidence_threshold: 0.5,
            target_class: None,
        }
    }
}

/// Parameters for [`TaskSpec::Translation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationParams {
    /// Language tag of the rendered output.
    pub target_language: String,
    /// Short neutral rendering when true, longer creative one otherwise.
    pub preserve_meaning: bool,
}

impl Default for TranslationParams {
    fn default() -> Self {
        Self {
            target_language: "en".to_string(),
            preserve_meaning: true,
        }
    }
}

/// Parameters for [`TaskSpec::Generic`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenericParams {
    /// Shape of the generic output.
    pub output_type: GenericOutputType,
}

/// The closed set of tasks the protocol can preserve.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskSpec {
    /// Produce text.
    TextGeneration(TextGenerationParams),
    /// Produce class probabilities.
    Classification(ClassificationParams),
    /// Produce a translated rendering.
    Translation(TranslationParams),
    /// Anything else.
    Generic(GenericParams),
}

impl TaskSpec {
    /// The wire name of the task.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TextGeneration(_) => "text_generation",
            Self::Classification(_) => "classification",
            Self::Translation(_) => "translation",
            Self::Generic(_) => "generic",
        }
    }
}

/// The declared functional requirements for one forgetting run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionalRequirements {
    /// Task and its parameters.
    pub task: TaskSpec,
    /// Optional resonance regularization.
    pub regularization: Option<Regularization>,
}

impl FunctionalRequirements {
    /// Requirements for a typed task with no regularization.
    pub fn new(task: TaskSpec) -> Self {
        Self {
            task,
            regularization: None,
        }
    }

    /// Text generation of `target_length` words with default style and tone.
    pub fn text_generation(target_length: usize) -> Self {
        Self::new(TaskSpec::TextGeneration(TextGenerationParams {
            target_length,
            ..TextGenerationParams::default()
        }))
    }

    /// Classification over `num_classes` classes with the default threshold.
    pub fn classification(num_classes: usize) -> Self {
        Self::new(TaskSpec::Classification(ClassificationParams {
            num_classes,
            ..ClassificationParams::default()
        }))
    }

    /// Attach a regularization term.
    pub fn with_regularization(mut self, reg: Regularization) -> Self {
        self.regularization = Some(reg);
        self
    }

    /// Parse the loose key/value form.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyRequirements`] for an empty map,
    /// [`ValidationError::UnknownTaskType`] for an unrecognized task, and
    /// [`ValidationError::InvalidRequirement`] for a mistyped or
    /// out-of-range field.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        if map.is_empty() {
            return Err(ValidationError::EmptyRequirements);
        }
        let task_type = match map.get("task_type") {
            None | Some(Value::Null) => "generic",
            Some(Value::String(s)) => s.as_str(),
            Some(other) => return Err(invalid("task_type", format!("expected string, got {other}"))),
        };

        let task = match task_type {
            "text_generation" => {
                let d = TextGenerationParams::default();
                TaskSpec::TextGeneration(TextGenerationParams {
                    target_length: usize_field(map, "target_length", d.target_length)?,
                    style: enum_field(map, "style", d.style, |s| match s {
                        "creative" => Some(TextStyle::Creative),
                        "technical" => Some(TextStyle::Technical),
                        "generic" => Some(TextStyle::Generic),
                        _ => None,
                    })?,
                    tone: enum_field(map, "tone", d.tone, |s| match s {
                        "neutral" => Some(TextTone::Neutral),
                        "poetic" => Some(TextTone::Poetic),
                        "dramatic" => Some(TextTone::Dramatic),
                        _ => None,
                    })?,
                })
            }
            "classification" => {
                let d = ClassificationParams::default();
                let num_classes = usize_field(map, "num_classes", d.num_classes)?;
                let confidence_threshold = match map.get("confidence_threshold") {
                    None => d.confidence_threshold,
                    Some(v) => v
                        .as_f64()
                        .ok_or_else(|| invalid("confidence_threshold", format!("expected number, got {v}")))?,
                };
                let target_class = match map.get("target_class") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                };
                TaskSpec::Classification(ClassificationParams {
                    num_classes,
                    confidence_threshold,
                    target_class,
                })
            }
            "translation" => {
                let d = TranslationParams::default();
                let target_language = match map.get("target_language") {
                    None => d.target_language,
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => return Err(invalid("target_language", format!("expected string, got {other}"))),
                };
                let preserve_meaning = match map.get("preserve_meaning") {
                    None => d.preserve_meaning,
                    Some(Value::Bool(b)) => *b,
                    Some(other) => return Err(invalid("preserve_meaning", format!("expected bool, got {other}"))),
                };
                TaskSpec::Translation(TranslationParams {
                    target_language,
                    preserve_meaning,
                })
            }
            "generic" => TaskSpec::Generic(GenericParams {
                output_type: enum_field(map, "output_type", GenericOutputType::Text, |s| match s {
                    "text" => Some(GenericOutputType::Text),
                    "numeric" => Some(GenericOutputType::Numeric),
                    "structured" => Some(GenericOutputType::Structured),
                    _ => None,
                })?,
            }),
            other => return Err(ValidationError::UnknownTaskType(other.to_string())),
        };

        let regularization = match map.get("regularization") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s == "l1" => Some(Regularization::L1),
            Some(Value::String(s)) if s == "l2" => Some(Regularization::L2),
            Some(other) => return Err(invalid("regularization", format!("expected \"l1\" or \"l2\", got {other}"))),
        };

        let requirements = Self {
            task,
            regularization,
        };
        requirements.validate()?;
        Ok(requirements)
    }

    /// Range-check the task parameters. Typed requirements built in code
    /// go through the same checks as the parsed form.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidRequirement`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.task {
            TaskSpec::TextGeneration(p) => {
                if p.target_length == 0 || p.target_length > MAX_TARGET_LENGTH {
                    return Err(invalid(
                        "target_length",
                        format!("must be in [1, {MAX_TARGET_LENGTH}], got {}", p.target_length),
                    ));
                }
            }
            TaskSpec::Classification(p) => {
                if p.num_classes == 0 || p.num_classes > MAX_CLASSES {
                    return Err(invalid(
                        "num_classes",
                        format!("must be in [1, {MAX_CLASSES}], got {}", p.num_classes),
                    ));
                }
                // NaN fails the range test.
                if !(0.0..=1.0).contains(&p.confidence_threshold) {
                    return Err(invalid(
                        "confidence_threshold",
                        format!("must be in [0, 1], got {}", p.confidence_threshold),
                    ));
                }
            }
            TaskSpec::Translation(p) => {
                if p.target_language.trim().is_empty() {
                    return Err(invalid("target_language", "must be non-empty".to_string()));
                }
            }
            TaskSpec::Generic(_) => {}
        }
        Ok(())
    }
}

impl TryFrom<&Value> for FunctionalRequirements {
    type Error = ValidationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Self::from_map(map),
            Value::Null => Err(ValidationError::MissingRequirements),
            other => Err(invalid("requirements", format!("expected object, got {other}"))),
        }
    }
}

fn invalid(field: &str, reason: String) -> ValidationError {
    ValidationError::InvalidRequirement {
        field: field.to_string(),
        reason,
    }
}

fn usize_field(map: &Map<String, Value>, field: &str, default: usize) -> Result<usize, ValidationError> {
    match map.get(field) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| invalid(field, format!("expected non-negative integer, got {v}"))),
    }
}

fn enum_field<T>(
    map: &Map<String, Value>,
    field: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ValidationError> {
    match map.get(field) {
        None => Ok(default),
        Some(Value::String(s)) => parse(s).ok_or_else(|| invalid(field, format!("unrecognized value {s:?}"))),
        Some(other) => Err(invalid(field, format!("expected string, got {other}"))),
    }
}
