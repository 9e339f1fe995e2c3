use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::errors::CoreError;

/// Environment variable toggling strict override checks
pub const STRICT_OVERRIDES_ENV: &str = "WIREBOX_STRICT_OVERRIDES";

/// Environment variable limiting the resolution depth
pub const MAX_RESOLUTION_DEPTH_ENV: &str = "WIREBOX_MAX_RESOLUTION_DEPTH";

const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 128;

/// Container behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Reject non-fallback registrations onto an occupied key instead of overwriting
    pub strict_overrides: bool,
    /// Longest resolution path allowed before giving up
    pub max_resolution_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            strict_overrides: false,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
        }
    }
}

impl ContainerConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, CoreError> {
        let mut config = Self::default();

        if let Ok(value) = env::var(STRICT_OVERRIDES_ENV) {
            config.strict_overrides = parse_bool(STRICT_OVERRIDES_ENV, &value)?;
        }

        if let Ok(value) = env::var(MAX_RESOLUTION_DEPTH_ENV) {
            config.max_resolution_depth = value.trim().parse().map_err(|_| {
                CoreError::configuration(format!(
                    "{} must be a positive integer, got '{}'",
                    MAX_RESOLUTION_DEPTH_ENV, value
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_resolution_depth == 0 {
            return Err(CoreError::configuration(
                "max_resolution_depth must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Enable or disable strict override checks
    pub fn with_strict_overrides(mut self, strict: bool) -> Self {
        self.strict_overrides = strict;
        self
    }

    /// Set the maximum resolution depth
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, CoreError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::configuration(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}
