//! Shared defaults for retriable tests
//!
//! Settings are read from TOML:
//!
//! ```toml
//! max_attempts = 5
//! min_successes = 2
//! name = "{displayName} (attempt {attempt})"
//! ```

use std::path::Path;

use retriable_common::error::CommonError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_SUCCESSES, MIN_COUNT};
use crate::error::RetriableResult;

/// Defaults applied to every declaration built from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetriableSettings {
    /// Maximum attempts per invocation
    pub max_attempts: u32,
    /// Passing attempts required per invocation
    pub min_successes: u32,
    /// Display name pattern for plain tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display name pattern for data-driven tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameterized_name: Option<String>,
}

impl Default for RetriableSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_successes: DEFAULT_MIN_SUCCESSES,
            name: None,
            parameterized_name: None,
        }
    }
}

impl RetriableSettings {
    /// Parse and validate settings from TOML
    pub fn from_toml_str(input: &str) -> RetriableResult<Self> {
        let settings: Self = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate settings from a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> RetriableResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|err| {
            CommonError::persistence_op("read_settings", format!("{}: {err}", path.display()))
        })?;
        let settings = Self::from_toml_str(&input)?;
        debug!(path = %path.display(), max_attempts = settings.max_attempts, "Loaded retriable settings");
        Ok(settings)
    }

    /// Render the settings as TOML
    pub fn to_toml_string(&self) -> RetriableResult<String> {
        toml::to_string(self)
            .map_err(|err| CommonError::serialization_format("TOML", err.to_string()).into())
    }

    /// Check counts and patterns
    pub fn validate(&self) -> RetriableResult<()> {
        if self.max_attempts < MIN_COUNT {
            return Err(CommonError::config_field("max_attempts", "max_attempts must be at least 1").into());
        }
        if self.min_successes < MIN_COUNT {
            return Err(
                CommonError::config_field("min_successes", "min_successes must be at least 1").into()
            );
        }
        for (field, pattern) in [("name", &self.name), ("parameterized_name", &self.parameterized_name)] {
            if pattern.as_deref().is_some_and(|p| p.trim().is_empty()) {
                return Err(CommonError::config_field(field, format!("{field} must not be blank")).into());
            }
        }
        Ok(())
    }
}
