pub mod core;

pub use self::core::{BoxError, CoreError};

/// Result alias used across the container
pub type Result<T> = std::result::Result<T, CoreError>;
