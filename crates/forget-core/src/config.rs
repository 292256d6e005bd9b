//! # Security Parameters
//!
//! The validated parameter set that governs key sizes, overwrite passes and
//! the mutual-information penalty. Construction is the only validation
//! point; a `SecurityParameters` value that exists is in range.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Symmetric security level, in bits. Determines ephemeral key length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum SecurityLevel {
    /// 128-bit keys.
    Standard,
    /// 256-bit keys.
    High,
    /// 512-bit keys.
    Ultra,
}

impl SecurityLevel {
    /// Parse from a bit count. Only 128, 256 and 512 are accepted.
    pub fn from_bits(bits: u16) -> Result<Self, ValidationError> {
        match bits {
            128 => Ok(Self::Standard),
            256 => Ok(Self::High),
            512 => Ok(Self::Ultra),
            other => Err(ValidationError::InvalidParameter {
                name: "security_parameter",
                reason: format!("must be 128, 256 or 512, got {other}"),
            }),
        }
    }

    /// Bit count.
    pub fn bits(self) -> u16 {
        match self {
            Self::Standard => 128,
            Self::High => 256,
            Self::Ultra => 512,
        }
    }

    /// Ephemeral key length in bytes (`bits / 8`).
    pub fn key_bytes(self) -> usize {
        usize::from(self.bits() / 8)
    }
}

impl From<SecurityLevel> for u16 {
    fn from(level: SecurityLevel) -> u16 {
        level.bits()
    }
}

impl TryFrom<u16> for SecurityLevel {
    type Error = ValidationError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Minimum number of overwrite passes.
pub const MIN_DELETION_PASSES: u32 = 3;
/// Maximum number of overwrite passes (Gutmann).
pub const MAX_DELETION_PASSES: u32 = 35;
/// Maximum mutual-information penalty.
pub const MAX_MUTUAL_INFO_PENALTY: f64 = 100.0;
/// Minimum fresh entropy, in bits, drawn per synthesis.
pub const MIN_ENTROPY_BITS: u32 = 128;

/// Validated protocol security parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityParameters {
    security_level: SecurityLevel,
    use_secure_erase: bool,
    mutual_info_penalty: f64,
    deletion_passes: u32,
    entropy_bits: u32,
}

impl SecurityParameters {
    /// Construct and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidParameter`] when the penalty is not
    /// in `(0, 100]`, passes are outside `[3, 35]`, or entropy is below 128 bits.
    pub fn new(
        security_level: SecurityLevel,
        use_secure_erase: bool,
        mutual_info_penalty: f64,
        deletion_passes: u32,
        entropy_bits: u32,
    ) -> Result<Self, ValidationError> {
        if !mutual_info_penalty.is_finite()
            || mutual_info_penalty <= 0.0
            || mutual_info_penalty > MAX_MUTUAL_INFO_PENALTY
        {
            return Err(ValidationError::InvalidParameter {
                name: "mutual_info_penalty",
                reason: format!(
                    "must be in (0, {MAX_MUTUAL_INFO_PENALTY}], got {mutual_info_penalty}"
                ),
            });
        }
        if !(MIN_DELETION_PASSES..=MAX_DELETION_PASSES).contains(&deletion_passes) {
            return Err(ValidationError::InvalidParameter {
                name: "deletion_passes",
                reason: format!(
                    "must be in [{MIN_DELETION_PASSES}, {MAX_DELETION_PASSES}], got {deletion_passes}"
                ),
            });
        }
        if entropy_bits < MIN_ENTROPY_BITS {
            return Err(ValidationError::InvalidParameter {
                name: "entropy_bits",
                reason: format!("must be at least {MIN_ENTROPY_BITS}, got {entropy_bits}"),
            });
        }
        Ok(Self {
            security_level,
            use_secure_erase,
            mutual_info_penalty,
            deletion_passes,
            entropy_bits,
        })
    }

    /// Security level.
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    /// Whether a hardware-backed eraser should be probed for.
    pub fn use_secure_erase(&self) -> bool {
        self.use_secure_erase
    }

    /// Weight λ of the mutual-information term in the extraction objective.
    pub fn mutual_info_penalty(&self) -> f64 {
        self.mutual_info_penalty
    }

    /// Number of pattern overwrite passes.
    pub fn deletion_passes(&self) -> u32 {
        self.deletion_passes
    }

    /// Minimum fresh entropy per synthesis, in bits.
    pub fn entropy_bits(&self) -> u32 {
        self.entropy_bits
    }
}

impl Default for SecurityParameters {
    fn default() -> Self {
        Self {
            security_level: SecurityLevel::High,
            use_secure_erase: true,
            mutual_info_penalty: 10.0,
            deletion_passes: 7,
            entropy_bits: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SecurityParameters::default();
        assert_eq!(p.security_level().bits(), 256);
        assert_eq!(p.security_level().key_bytes(), 32);
        assert_eq!(p.deletion_passes(), 7);
        assert_eq!(p.mutual_info_penalty(), 10.0);
        assert!(p.use_secure_erase());
    }

    #[test]
    fn test_security_level_from_bits() {
        assert_eq!(SecurityLevel::from_bits(128).unwrap().key_bytes(), 16);
        assert_eq!(SecurityLevel::from_bits(512).unwrap().key_bytes(), 64);
        assert!(SecurityLevel::from_bits(192).is_err());
        assert!(SecurityLevel::from_bits(0).is_err());
    }

    #[test]
    fn test_security_level_serializes_as_bits() {
        assert_eq!(serde_json::to_string(&SecurityLevel::Ultra).unwrap(), "512");
        let lvl: SecurityLevel = serde_json::from_str("128").unwrap();
        assert_eq!(lvl, SecurityLevel::Standard);
        assert!(serde_json::from_str::<SecurityLevel>("100").is_err());
    }

    #[test]
    fn test_rejects_non_positive_penalty() {
        let err = SecurityParameters::new(SecurityLevel::High, false, 0.0, 7, 256).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidParameter { name: "mutual_info_penalty", .. }));
        assert!(SecurityParameters::new(SecurityLevel::High, false, -1.0, 7, 256).is_err());
        assert!(SecurityParameters::new(SecurityLevel::High, false, f64::NAN, 7, 256).is_err());
        assert!(SecurityParameters::new(SecurityLevel::High, false, 100.5, 7, 256).is_err());
    }

    #[test]
    fn test_pass_bounds() {
        assert!(SecurityParameters::new(SecurityLevel::High, false, 1.0, 2, 256).is_err());
        assert!(SecurityParameters::new(SecurityLevel::High, false, 1.0, 3, 256).is_ok());
        assert!(SecurityParameters::new(SecurityLevel::High, false, 1.0, 35, 256).is_ok());
        assert!(SecurityParameters::new(SecurityLevel::High, false, 1.0, 36, 256).is_err());
    }

    #[test]
    fn test_entropy_floor() {
        assert!(SecurityParameters::new(SecurityLevel::High, false, 1.0, 7, 127).is_err());
        assert!(SecurityParameters::new(SecurityLevel::High, false, 1.0, 7, 128).is_ok());
    }
}
