#[allow(clippy::module_inception)]
pub mod container;
pub mod binding;
pub mod global;
pub mod key;
pub mod lifecycle;
pub mod recipe;
pub mod registry;
pub mod resolver;
pub mod tags;

pub use container::Container;
pub use binding::{Binding, BindingId, BindingOptions, BindingRef, DefaultValue, Defaults};
pub use global::{reset_global, with_global};
pub use key::{AbstractionId, BindingKey};
pub use lifecycle::{Release, Teardown};
pub use recipe::{Args, Param, Recipe};
pub use registry::BindingRegistry;
pub use resolver::ResolutionPath;
pub use tags::TagRegistry;
