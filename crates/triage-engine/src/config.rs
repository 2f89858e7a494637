//! Engine configuration
//!
//! Every tuning constant of ranking and scoring lives here. A YAML file may
//! override any subset of fields; the rest keep their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Ranking and scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Most diagnoses returned per request
    pub max_results: usize,

    /// Diagnoses below this confidence are dropped (0.0 to 1.0)
    pub min_confidence: f64,

    /// Confidence of the "Insufficient Data to Diagnose" fallback
    pub sentinel_confidence: f64,

    /// Share of base confidence kept when no optional condition holds
    pub optional_floor: f64,

    /// Treat rules without required conditions as a load error
    pub strict_catalog: bool,

    /// Rule file merged over the shipped rules by id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_confidence: 0.2,
            sentinel_confidence: 0.2,
            optional_floor: 0.5,
            strict_catalog: false,
            rules_path: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file. A relative `rules_path` is resolved against
    /// the directory of the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_yaml(&content)?;
        if let (Some(rules), Some(dir)) = (&config.rules_path, path.parent()) {
            if rules.is_relative() {
                config.rules_path = Some(dir.join(rules));
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == 0 {
            return Err(ConfigError::Invalid {
                field: "max_results",
                reason: "must be at least 1".to_string(),
            });
        }

        let unit_fields = [
            ("min_confidence", self.min_confidence),
            ("sentinel_confidence", self.sentinel_confidence),
            ("optional_floor", self.optional_floor),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is outside [0, 1]", value),
                });
            }
        }

        Ok(())
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_catalog = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_results, 5);
        assert_eq!(config.min_confidence, 0.2);
        assert_eq!(config.sentinel_confidence, 0.2);
        assert_eq!(config.optional_floor, 0.5);
        assert!(!config.strict_catalog);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let config = EngineConfig::from_yaml("max_results: 3\nstrict_catalog: true\n").unwrap();
        assert_eq!(config.max_results, 3);
        assert!(config.strict_catalog);
        assert_eq!(config.min_confidence, 0.2);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_yaml("max_results: 0"),
            Err(ConfigError::Invalid { field: "max_results", .. })
        ));
        assert!(matches!(
            EngineConfig::from_yaml("optional_floor: 1.5"),
            Err(ConfigError::Invalid { field: "optional_floor", .. })
        ));
        assert!(matches!(EngineConfig::from_yaml("max_reslts: 3"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_relative_rules_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "rules_path: extra.yaml\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.rules_path, Some(dir.path().join("extra.yaml")));
    }
}
