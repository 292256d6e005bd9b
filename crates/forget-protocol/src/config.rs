//! Protocol configuration.
//!
//! Defaults match the reference deployment. Override via environment
//! variables or explicit construction.

use std::time::Duration;

use forget_core::{SecurityLevel, SecurityParameters, ValidationError};
use forget_zkp::DEFAULT_MAX_RESONANCE_DIMS;

/// Largest source accepted by default (1 GiB).
pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 1024 * 1024 * 1024;

/// Configuration for a [`CryptographicForgetting`](crate::CryptographicForgetting)
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    /// Symmetric security parameter in bits: 128, 256 or 512.
    pub security_parameter: u16,
    /// Probe for an enclave-backed eraser.
    pub use_secure_erase: bool,
    /// Weight λ of the mutual-information term, in `(0, 100]`.
    pub mutual_info_penalty: f64,
    /// Overwrite passes, in `[3, 35]`.
    pub deletion_passes: u32,
    /// Fresh entropy drawn per synthesis, at least 128 bits.
    pub entropy_bits: u32,
    /// Resonance width.
    pub target_dims: usize,
    pub max_source_bytes: u64,
    /// Deadline for the extraction phase. `None` runs to the iteration
    /// ceiling.
    pub extraction_timeout: Option<Duration>,
    pub obliteration_workers: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            security_parameter: 256,
            use_secure_erase: true,
            mutual_info_penalty: 10.0,
            deletion_passes: 7,
            entropy_bits: 256,
            target_dims: 64,
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            extraction_timeout: None,
            obliteration_workers: 1,
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables (unset means default):
    /// - `FORGET_SECURITY_PARAMETER` (256)
    /// - `FORGET_USE_SECURE_ERASE` (true)
    /// - `FORGET_MUTUAL_INFO_PENALTY` (10.0)
    /// - `FORGET_DELETION_PASSES` (7)
    /// - `FORGET_TARGET_DIMS` (64)
    /// - `FORGET_MAX_SOURCE_BYTES` (1 GiB)
    /// - `FORGET_EXTRACTION_TIMEOUT_SECS` (none)
    /// - `FORGET_OBLITERATION_WORKERS` (1)
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidVar`] for an unparseable value and
    /// [`ConfigError::Validation`] for an out-of-range one.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// As [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        let config = Self {
            security_parameter: env_parse(&lookup, "FORGET_SECURITY_PARAMETER", d.security_parameter)?,
            use_secure_erase: env_bool(&lookup, "FORGET_USE_SECURE_ERASE", d.use_secure_erase)?,
            mutual_info_penalty: env_parse(&lookup, "FORGET_MUTUAL_INFO_PENALTY", d.mutual_info_penalty)?,
            deletion_passes: env_parse(&lookup, "FORGET_DELETION_PASSES", d.deletion_passes)?,
            entropy_bits: d.entropy_bits,
            target_dims: env_parse(&lookup, "FORGET_TARGET_DIMS", d.target_dims)?,
            max_source_bytes: env_parse(&lookup, "FORGET_MAX_SOURCE_BYTES", d.max_source_bytes)?,
            extraction_timeout: match lookup("FORGET_EXTRACTION_TIMEOUT_SECS") {
                None => None,
                Some(raw) => Some(Duration::from_secs(parse_var("FORGET_EXTRACTION_TIMEOUT_SECS", &raw)?)),
            },
            obliteration_workers: env_parse(&lookup, "FORGET_OBLITERATION_WORKERS", d.obliteration_workers)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter and build the validated security parameters.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidParameter`] naming the first offending
    /// parameter.
    pub fn validate(&self) -> Result<SecurityParameters, ValidationError> {
        let security = SecurityParameters::new(
            SecurityLevel::from_bits(self.security_parameter)?,
            self.use_secure_erase,
            self.mutual_info_penalty,
            self.deletion_passes,
            self.entropy_bits,
        )?;
        if self.target_dims == 0 || self.target_dims > DEFAULT_MAX_RESONANCE_DIMS {
            return Err(ValidationError::InvalidParameter {
                name: "target_dims",
                reason: format!(
                    "must be in [1, {DEFAULT_MAX_RESONANCE_DIMS}], got {}",
                    self.target_dims
                ),
            });
        }
        if self.max_source_bytes == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "max_source_bytes",
                reason: "must be positive".to_string(),
            });
        }
        if self.extraction_timeout == Some(Duration::ZERO) {
            return Err(ValidationError::InvalidParameter {
                name: "extraction_timeout",
                reason: "must be positive when set".to_string(),
            });
        }
        if self.obliteration_workers == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "obliteration_workers",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(security)
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidVar {
        var: var.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => parse_var(var, &raw),
        None => Ok(default),
    }
}

fn env_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(var).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidVar {
            var: var.to_string(),
            value: other.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidVar {
        var: String,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let security = ProtocolConfig::default().validate().unwrap();
        assert_eq!(security.security_level(), SecurityLevel::High);
        assert_eq!(security.deletion_passes(), 7);
    }

    #[test]
    fn test_lookup_with_no_vars_is_default() {
        assert_eq!(ProtocolConfig::from_lookup(lookup(&[])).unwrap(), ProtocolConfig::default());
    }

    #[test]
    fn test_lookup_overrides() {
        let cfg = ProtocolConfig::from_lookup(lookup(&[
            ("FORGET_SECURITY_PARAMETER", "512"),
            ("FORGET_USE_SECURE_ERASE", "false"),
            ("FORGET_MUTUAL_INFO_PENALTY", "2.5"),
            ("FORGET_DELETION_PASSES", "35"),
            ("FORGET_TARGET_DIMS", "128"),
            ("FORGET_MAX_SOURCE_BYTES", "4096"),
            ("FORGET_EXTRACTION_TIMEOUT_SECS", "30"),
            ("FORGET_OBLITERATION_WORKERS", "4"),
        ]))
        .unwrap();
        assert_eq!(cfg.security_parameter, 512);
        assert!(!cfg.use_secure_erase);
        assert_eq!(cfg.mutual_info_penalty, 2.5);
        assert_eq!(cfg.deletion_passes, 35);
        assert_eq!(cfg.target_dims, 128);
        assert_eq!(cfg.max_source_bytes, 4096);
        assert_eq!(cfg.extraction_timeout, Some(Duration::from_secs(30)));
        assert_eq!(cfg.obliteration_workers, 4);
    }

    #[test]
    fn test_unparseable_var_names_variable() {
        let err = ProtocolConfig::from_lookup(lookup(&[("FORGET_DELETION_PASSES", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { ref var, .. } if var == "FORGET_DELETION_PASSES"));
        let err = ProtocolConfig::from_lookup(lookup(&[("FORGET_USE_SECURE_ERASE", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { .. }));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let err = ProtocolConfig::from_lookup(lookup(&[("FORGET_SECURITY_PARAMETER", "192")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let bad = [
            ProtocolConfig { deletion_passes: 2, ..Default::default() },
            ProtocolConfig { deletion_passes: 36, ..Default::default() },
            ProtocolConfig { mutual_info_penalty: 0.0, ..Default::default() },
            ProtocolConfig { mutual_info_penalty: 100.5, ..Default::default() },
            ProtocolConfig { entropy_bits: 64, ..Default::default() },
            ProtocolConfig { target_dims: 0, ..Default::default() },
            ProtocolConfig { target_dims: 1001, ..Default::default() },
            ProtocolConfig { max_source_bytes: 0, ..Default::default() },
            ProtocolConfig { obliteration_workers: 0, ..Default::default() },
            ProtocolConfig { extraction_timeout: Some(Duration::ZERO), ..Default::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} accepted");
        }
    }

    #[test]
    fn test_boundary_values_accepted() {
        let cfg = ProtocolConfig {
            security_parameter: 128,
            deletion_passes: 3,
            mutual_info_penalty: 100.0,
            entropy_bits: 128,
            target_dims: 1000,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
