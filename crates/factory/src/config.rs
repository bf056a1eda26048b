//! Factory configuration

use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{FactoryError, FactoryResult};

/// Configuration for factory behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Identifier attribute assigned by the record store
    pub primary_key: String,
    /// Reject overrides that the factory does not know about
    pub strict_attributes: bool,
    /// First value handed to sequence attributes
    pub sequence_start: u64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            strict_attributes: false,
            sequence_start: 1,
        }
    }
}

impl FactoryConfig {
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_attributes = true;
        self
    }

    pub fn with_sequence_start(mut self, start: u64) -> Self {
        self.sequence_start = start;
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> FactoryResult<Self> {
        let config: FactoryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FactoryResult<()> {
        if self.primary_key.is_empty() {
            return Err(FactoryError::Configuration(
                "Primary key name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Global factory configuration
static FACTORY_CONFIG: Lazy<RwLock<FactoryConfig>> =
    Lazy::new(|| RwLock::new(FactoryConfig::default()));

/// Snapshot of the global factory configuration
pub fn factory_config() -> FactoryResult<FactoryConfig> {
    FACTORY_CONFIG
        .read()
        .map(|config| config.clone())
        .map_err(|_| FactoryError::poisoned("factory config"))
}

/// Replace the global factory configuration
pub fn set_factory_config(config: FactoryConfig) -> FactoryResult<()> {
    config.validate()?;
    let mut current = FACTORY_CONFIG
        .write()
        .map_err(|_| FactoryError::poisoned("factory config"))?;
    *current = config;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_config_defaults() {
        let config = FactoryConfig::default();

        assert_eq!(config.primary_key, "id");
        assert!(!config.strict_attributes);
        assert_eq!(config.sequence_start, 1);
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config = FactoryConfig::from_json(r#"{"strict_attributes": true}"#).unwrap();
        assert!(config.strict_attributes);
        assert_eq!(config.primary_key, "id");

        assert!(FactoryConfig::from_json(r#"{"primary_key": ""}"#).is_err());
        assert!(matches!(
            FactoryConfig::from_json("not json"),
            Err(FactoryError::Serialization(_))
        ));
    }

    #[test]
    fn test_global_config_round_trip() {
        // other tests read the global config concurrently, so write back an equal value
        let original = factory_config().unwrap();
        set_factory_config(original.clone()).unwrap();
        assert_eq!(factory_config().unwrap(), original);

        let invalid = original.with_primary_key("");
        assert!(set_factory_config(invalid).is_err());
        assert_eq!(factory_config().unwrap().primary_key, "id");
    }
}
