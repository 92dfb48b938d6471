//! Construction settings for a genus.

use genus_arith::Precision;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Settings that control enumeration and Hecke construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenusConfig {
    /// Seed for every finite-field sampler. 0 draws a fresh random seed.
    pub seed: u64,
    /// Integer strategy used by [`crate::AnyGenus`].
    pub precision: Precision,
    /// Run exact isometry checks after every neighbor step and composition.
    pub validate: bool,
    /// Give up after this many expansion primes without reaching the mass.
    pub max_expansion_primes: usize,
    /// Retry with arbitrary precision when fixed-width arithmetic overflows.
    pub promote_on_overflow: bool,
}

impl Default for GenusConfig {
    fn default() -> Self {
        GenusConfig {
            seed: 0,
            precision: Precision::Arbitrary,
            validate: true,
            max_expansion_primes: 64,
            promote_on_overflow: true,
        }
    }
}

impl GenusConfig {
    pub fn with_seed(seed: u64) -> Self {
        GenusConfig {
            seed,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenusError;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GenusConfig::default();
        assert_eq!(config.seed, 0);
        assert_eq!(config.precision, Precision::Arbitrary);
        assert!(config.validate);
        assert_eq!(config.max_expansion_primes, 64);
        assert!(config.promote_on_overflow);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GenusConfig::from_json(r#"{"seed": 17, "precision": "fixed"}"#).unwrap();
        assert_eq!(config.seed, 17);
        assert_eq!(config.precision, Precision::Fixed);
        assert_eq!(config.max_expansion_primes, 64);
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let config = GenusConfig {
            seed: 99,
            validate: false,
            ..Default::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();
        let loaded = GenusConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_json_is_reported() {
        let err = GenusConfig::from_json("{seed: }").unwrap_err();
        assert!(matches!(err, GenusError::Json(_)));
        let missing = GenusConfig::load(Path::new("/nonexistent/genus.json")).unwrap_err();
        assert!(matches!(missing, GenusError::Io(_)));
    }
}
