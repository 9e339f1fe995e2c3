use thiserror::Error;

/// Boxed error returned by recipes and release hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for the container
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("Invalid recipe for '{component}': {message}")]
    InvalidRecipe { component: String, message: String },

    #[error("Cannot find a defined recipe by key '{key}'")]
    KeyNotFound { key: String },

    #[error("Got a default value for wired parameter {position} of '{component}'")]
    DefaultForWired { component: String, position: usize },

    #[error("Default value for parameter {position} of '{component}' is not found")]
    DefaultNotFound { component: String, position: usize },

    #[error("Default value at position {position} of '{component}' has no matching parameter")]
    DefaultOutOfRange { component: String, position: usize },

    #[error("Expected and given types are different: expected '{expected}', given '{given}'")]
    MismatchedTypes { expected: String, given: String },

    #[error("Binding for '{abstraction}' is already registered")]
    DuplicateBinding { abstraction: String },

    #[error("Missed wired constructor for '{abstraction}'")]
    NotWired { abstraction: String },

    #[error("Circular dependency detected: '{abstraction}' is required again by '{introduced_by}' ({path})")]
    CircularDependency {
        abstraction: String,
        introduced_by: String,
        path: String,
    },

    #[error("Constructor for '{component}' needs {expected} args, {given} given")]
    ArgumentCountMismatch {
        component: String,
        expected: usize,
        given: usize,
    },

    #[error("Argument {position} of '{component}' is not a {expected}")]
    ArgumentTypeMismatch {
        component: String,
        position: usize,
        expected: String,
    },

    #[error("Resolution of '{abstraction}' exceeded the maximum depth of {max_depth}")]
    ResolutionTooDeep { abstraction: String, max_depth: usize },

    #[error("Construction failed: {source}")]
    Construction { source: BoxError },

    #[error("Failed to release '{component}': {source}")]
    ReleaseFailed { component: String, source: BoxError },
}

impl CoreError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap an error raised inside a recipe
    pub fn construction(source: impl Into<BoxError>) -> Self {
        Self::Construction {
            source: source.into(),
        }
    }

    /// Create a new not-wired error
    pub fn not_wired(abstraction: impl Into<String>) -> Self {
        Self::NotWired {
            abstraction: abstraction.into(),
        }
    }

    /// Create a new mismatched types error
    pub fn mismatched_types(expected: impl Into<String>, given: impl Into<String>) -> Self {
        Self::MismatchedTypes {
            expected: expected.into(),
            given: given.into(),
        }
    }

    /// Check if the error was raised while registering a recipe
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRecipe { .. }
                | Self::KeyNotFound { .. }
                | Self::DefaultForWired { .. }
                | Self::DefaultNotFound { .. }
                | Self::DefaultOutOfRange { .. }
                | Self::MismatchedTypes { .. }
                | Self::DuplicateBinding { .. }
        )
    }

    /// Check if the error is a not-wired error
    pub fn is_not_wired(&self) -> bool {
        matches!(self, Self::NotWired { .. })
    }

    /// Check if the error is a circular dependency error
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }

    /// Check if the error is a release failure
    pub fn is_release(&self) -> bool {
        matches!(self, Self::ReleaseFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_classification() {
        let error = CoreError::DefaultNotFound {
            component: "app::Db".to_string(),
            position: 1,
        };
        assert!(error.is_registration());
        assert!(!CoreError::not_wired("app::Db").is_registration());
    }

    #[test]
    fn test_construction_keeps_source_message() {
        let error = CoreError::construction("connection refused");
        assert_eq!(error.to_string(), "Construction failed: connection refused");
    }

    #[test]
    fn test_circular_message_names_both_sides() {
        let error = CoreError::CircularDependency {
            abstraction: "dyn app::A".to_string(),
            introduced_by: "dyn app::C".to_string(),
            path: "dyn app::A -> dyn app::B -> dyn app::C".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("'dyn app::A' is required again by 'dyn app::C'"));
        assert!(error.is_circular());
    }
}
