//! Singleton dependency container
//!
//! Recipes declare the abstractions and literals they need; the container
//! resolves them depth-first, caches every component once, rejects cycles, and
//! composes a teardown routine that releases the resolved graph.

pub mod config;
pub mod container;
pub mod errors;

// Re-export key types for convenience
pub use config::ContainerConfig;
pub use container::{
    AbstractionId, Args, BindingOptions, BindingRef, Container, Defaults, Recipe, Release,
    ResolutionPath, Teardown,
};
pub use errors::{BoxError, CoreError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
