use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("mapping config is empty: 'discriminator_column' must name a column")]
    EmptyDiscriminatorColumn,

    #[error("cannot parse mapping config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// ColumnPolicy
///
/// What the mapper does with record columns no field maps.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    #[default]
    Ignore,
    Reject,
}

///
/// MappingConfig
///
/// Registry-wide mapping settings. Every key is optional:
///
/// ```toml
/// discriminator_column = "type"
/// unknown_columns = "reject"
/// ```
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingConfig {
    /// Column holding the subtype discriminator when a hierarchy root
    /// does not name one.
    pub discriminator_column: String,

    pub unknown_columns: ColumnPolicy,
}

impl MappingConfig {
    pub const DEFAULT_DISCRIMINATOR_COLUMN: &str = "dtype";

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discriminator_column.trim().is_empty() {
            return Err(ConfigError::EmptyDiscriminatorColumn);
        }

        Ok(())
    }

    #[must_use]
    pub fn with_discriminator_column(mut self, column: impl Into<String>) -> Self {
        self.discriminator_column = column.into();
        self
    }

    #[must_use]
    pub const fn with_unknown_columns(mut self, policy: ColumnPolicy) -> Self {
        self.unknown_columns = policy;
        self
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            discriminator_column: Self::DEFAULT_DISCRIMINATOR_COLUMN.to_string(),
            unknown_columns: ColumnPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_defaults() {
        let config = MappingConfig::from_toml_str("").expect("empty config parses");

        assert_eq!(config, MappingConfig::default());
        assert_eq!(config.discriminator_column, "dtype");
        assert_eq!(config.unknown_columns, ColumnPolicy::Ignore);
    }

    #[test]
    fn keys_override_defaults() {
        let config = MappingConfig::from_toml_str(
            "discriminator_column = \"type\"\nunknown_columns = \"reject\"\n",
        )
        .expect("config parses");

        assert_eq!(config.discriminator_column, "type");
        assert_eq!(config.unknown_columns, ColumnPolicy::Reject);
    }

    #[test]
    fn blank_discriminator_column_is_rejected() {
        let err = MappingConfig::from_toml_str("discriminator_column = \" \"")
            .expect_err("blank column must fail");

        assert!(matches!(err, ConfigError::EmptyDiscriminatorColumn));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = MappingConfig::from_toml_str("colour = \"red\"").expect_err("unknown key");

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
