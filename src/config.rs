use serde::Deserialize;
use serde::Serialize;

use crate::error::EcsResult;

/// # World Config
///
/// Allocation hints and ID seed for a [World](crate::World). Missing fields take their default.
///
/// ```toml
/// initial_entity_capacity = 4096
/// initial_component_capacity = 1024
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Entity slots reserved up front.
    pub initial_entity_capacity: usize,
    /// Components reserved in each storage when it is first created.
    pub initial_component_capacity: usize,
    /// First public ID handed out. Zero is reserved and is replaced by one.
    pub first_public_id: u32,
}

impl WorldConfig {
    /// Parses a config from TOML.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        Ok(toml::from_str(source)?)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_entity_capacity: 256,
            initial_component_capacity: 64,
            first_public_id: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_toml_str_missing_fields_returns_defaults() {
        let config = WorldConfig::from_toml_str("initial_entity_capacity = 8").unwrap();

        assert_eq!(config.initial_entity_capacity, 8);
        assert_eq!(
            config.initial_component_capacity,
            WorldConfig::default().initial_component_capacity
        );
        assert_eq!(config.first_public_id, 1);
    }

    #[test]
    fn from_toml_str_wrong_type_returns_error() {
        assert!(WorldConfig::from_toml_str("first_public_id = \"one\"").is_err());
    }
}
