//! Typed construction recipes
//!
//! A recipe is a closure that builds a concrete component from an [`Args`]
//! cursor, together with the ordered list of parameters it reads. Declaring
//! the parameters up front lets the container resolve dependencies before the
//! closure runs, and reject bad literal defaults at registration time.
//!
//! Build closures return [`CoreError`]. Errors raised by [`Args`] propagate with
//! `?` as they are. A component's own error type goes through
//! [`CoreError::construction`], which keeps it as the error source, so callers
//! can still downcast it.
//!
//! ```rust
//! use std::sync::Arc;
//! use wirebox_core::container::Recipe;
//!
//! trait Database: Send + Sync {}
//!
//! struct Repository {
//!     database: Arc<dyn Database>,
//!     table: String,
//! }
//!
//! let recipe = Recipe::new(|args| {
//!     Ok(Repository {
//!         database: args.dependency::<dyn Database>()?,
//!         table: args.literal::<String>()?,
//!     })
//! })
//! .dependency::<dyn Database>()
//! .literal::<String>();
//!
//! assert_eq!(recipe.params().len(), 2);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::container::key::AbstractionId;
use crate::container::lifecycle::{Release, ReleaseHook};
use crate::errors::CoreError;

/// Type-erased singleton instance; always holds the concrete component
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// Boxed `Arc<I>` for some abstraction `I`
pub(crate) type Erased = Box<dyn Any + Send + Sync>;

/// Converts an instance of the concrete component into a boxed `Arc<I>`
pub(crate) type Caster = Arc<dyn Fn(&Instance) -> Option<Erased> + Send + Sync>;

pub(crate) type Build = Arc<dyn Fn(&mut Args) -> Result<Instance, CoreError> + Send + Sync>;

pub(crate) fn caster<C, I, F>(cast: F) -> Caster
where
    C: Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
{
    Arc::new(move |instance: &Instance| {
        instance
            .clone()
            .downcast::<C>()
            .ok()
            .map(|concrete| Box::new(cast(concrete)) as Erased)
    })
}

/// A declared recipe parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// An abstraction resolved from the container
    Dependency(AbstractionId),
    /// Every binding listed under `label`, as one ordered collection of `element`
    Tagged { label: String, element: AbstractionId },
    /// A literal supplied from the registered defaults
    Literal(AbstractionId),
}

impl Param {
    /// Whether the container wires this parameter itself
    pub fn is_wired(&self) -> bool {
        !matches!(self, Param::Literal(_))
    }

    /// Declared type of the parameter
    pub fn type_id(&self) -> &AbstractionId {
        match self {
            Param::Dependency(id) | Param::Literal(id) => id,
            Param::Tagged { element, .. } => element,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Dependency(id) => write!(f, "Arc<{}>", id),
            Param::Tagged { label, element } => write!(f, "Vec<Arc<{}>> tagged '{}'", element, label),
            Param::Literal(id) => f.write_str(id.type_name()),
        }
    }
}

/// An assembled argument handed to a recipe
pub(crate) enum Argument {
    Dependency(Erased),
    Collection(Vec<Erased>),
    Literal(Instance),
}

/// Ordered cursor over the arguments assembled for one recipe call
pub struct Args {
    component: &'static str,
    items: std::vec::IntoIter<Argument>,
    position: usize,
    expected: usize,
}

impl Args {
    pub(crate) fn new(component: &'static str, arguments: Vec<Argument>) -> Self {
        let expected = arguments.len();
        Self {
            component,
            items: arguments.into_iter(),
            position: 0,
            expected,
        }
    }

    /// Take the next argument as a resolved dependency
    pub fn dependency<I: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<I>, CoreError> {
        let position = self.position;
        match self.next()? {
            Argument::Dependency(erased) => erased
                .downcast::<Arc<I>>()
                .map(|instance| *instance)
                .map_err(|_| self.mismatch::<Arc<I>>(position)),
            _ => Err(self.mismatch::<Arc<I>>(position)),
        }
    }

    /// Take the next argument as a tagged collection
    pub fn tagged<I: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Vec<Arc<I>>, CoreError> {
        let position = self.position;
        match self.next()? {
            Argument::Collection(items) => items
                .into_iter()
                .map(|erased| erased.downcast::<Arc<I>>().map(|instance| *instance))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| self.mismatch::<Vec<Arc<I>>>(position)),
            _ => Err(self.mismatch::<Vec<Arc<I>>>(position)),
        }
    }

    /// Take the next argument as a literal default
    pub fn literal<V: Clone + Send + Sync + 'static>(&mut self) -> Result<V, CoreError> {
        let position = self.position;
        match self.next()? {
            Argument::Literal(value) => {
                let value: &(dyn Any + Send + Sync) = &*value;
                value
                    .downcast_ref::<V>()
                    .cloned()
                    .ok_or_else(|| self.mismatch::<V>(position))
            }
            _ => Err(self.mismatch::<V>(position)),
        }
    }

    /// Number of arguments not taken yet
    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    fn next(&mut self) -> Result<Argument, CoreError> {
        let argument = self
            .items
            .next()
            .ok_or_else(|| CoreError::ArgumentCountMismatch {
                component: self.component.to_string(),
                expected: self.position + 1,
                given: self.expected,
            })?;
        self.position += 1;
        Ok(argument)
    }

    fn mismatch<T: ?Sized>(&self, position: usize) -> CoreError {
        CoreError::ArgumentTypeMismatch {
            component: self.component.to_string(),
            position,
            expected: std::any::type_name::<T>().to_string(),
        }
    }
}

/// Construction recipe for a concrete component `C`
pub struct Recipe<C> {
    params: Vec<Param>,
    build: Box<dyn Fn(&mut Args) -> Result<C, CoreError> + Send + Sync>,
    release: Option<ReleaseHook>,
}

impl<C: Send + Sync + 'static> Recipe<C> {
    /// Create a recipe from a build closure; parameters are declared afterwards
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&mut Args) -> Result<C, CoreError> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            build: Box::new(build),
            release: None,
        }
    }

    /// Declare the next parameter as an abstraction wired by the container
    pub fn dependency<I: ?Sized + 'static>(mut self) -> Self {
        self.params.push(Param::Dependency(AbstractionId::of::<I>()));
        self
    }

    /// Declare the next parameter as all bindings tagged with `label`
    pub fn tagged<I: ?Sized + 'static>(mut self, label: impl Into<String>) -> Self {
        self.params.push(Param::Tagged {
            label: label.into(),
            element: AbstractionId::of::<I>(),
        });
        self
    }

    /// Declare the next parameter as a literal taken from the registered defaults
    pub fn literal<V: Send + Sync + 'static>(mut self) -> Self {
        self.params.push(Param::Literal(AbstractionId::of::<V>()));
        self
    }

    /// Release the component when the owning teardown runs
    pub fn releasable(mut self) -> Self
    where
        C: Release,
    {
        self.release = Some(Arc::new(|instance: &Instance| {
            let instance: &(dyn Any + Send + Sync) = &**instance;
            match instance.downcast_ref::<C>() {
                Some(component) => component.release(),
                None => Ok(()),
            }
        }));
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_releasable(&self) -> bool {
        self.release.is_some()
    }

    pub(crate) fn into_parts(self) -> (Vec<Param>, Build, Option<ReleaseHook>) {
        let build = self.build;
        let erased: Build = Arc::new(move |args: &mut Args| {
            build(args).map(|component| Arc::new(component) as Instance)
        });
        (self.params, erased, self.release)
    }
}

impl<C> fmt::Debug for Recipe<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("component", &std::any::type_name::<C>())
            .field("params", &self.params)
            .field("releasable", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    fn dependency_of(greeter: Arc<dyn Greeter>) -> Argument {
        Argument::Dependency(Box::new(greeter))
    }

    #[test]
    fn test_params_follow_declaration_order() {
        let recipe = Recipe::new(|_args| Ok(English))
            .dependency::<dyn Greeter>()
            .literal::<u16>()
            .tagged::<dyn Greeter>("greeters");

        assert_eq!(recipe.params().len(), 3);
        assert_eq!(recipe.params()[0], Param::Dependency(AbstractionId::of::<dyn Greeter>()));
        assert_eq!(recipe.params()[1], Param::Literal(AbstractionId::of::<u16>()));
        assert!(!recipe.params()[1].is_wired());
        assert!(recipe.params()[2].is_wired());
        assert!(!recipe.is_releasable());
    }

    #[test]
    fn test_args_are_taken_in_order() {
        let mut args = Args::new(
            "test",
            vec![
                dependency_of(Arc::new(English)),
                Argument::Literal(Arc::new(8080u16)),
                Argument::Collection(vec![
                    Box::new(Arc::new(English) as Arc<dyn Greeter>) as Erased
                ]),
            ],
        );

        assert_eq!(args.dependency::<dyn Greeter>().unwrap().greet(), "hello");
        assert_eq!(args.literal::<u16>().unwrap(), 8080);
        assert_eq!(args.tagged::<dyn Greeter>().unwrap().len(), 1);
        assert_eq!(args.remaining(), 0);
    }

    #[test]
    fn test_wrong_kind_is_reported_with_position() {
        let mut args = Args::new("test", vec![Argument::Literal(Arc::new(1u8))]);

        let error = args.dependency::<dyn Greeter>().err().unwrap();
        assert!(matches!(
            error,
            CoreError::ArgumentTypeMismatch { position: 0, .. }
        ));
    }

    #[test]
    fn test_reading_past_the_end() {
        let mut args = Args::new("test", vec![]);

        assert!(matches!(
            args.literal::<String>(),
            Err(CoreError::ArgumentCountMismatch { expected: 1, given: 0, .. })
        ));
    }

    #[derive(Debug)]
    struct Refused;

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl std::error::Error for Refused {}

    #[test]
    fn test_component_error_stays_reachable_as_source() {
        let (_, build, _) = Recipe::<English>::new(|_| Err(CoreError::construction(Refused))).into_parts();

        let error = build(&mut Args::new("test", vec![])).err().unwrap();
        let source = std::error::Error::source(&error).unwrap();
        assert!(source.downcast_ref::<Refused>().is_some());
        assert_eq!(error.to_string(), "Construction failed: connection refused");
    }

    #[test]
    fn test_caster_produces_abstraction() {
        let cast = caster::<English, dyn Greeter, _>(|english| english as Arc<dyn Greeter>);
        let instance: Instance = Arc::new(English);

        let erased = cast(&instance).unwrap();
        let greeter = erased.downcast::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(greeter.greet(), "hello");

        let other: Instance = Arc::new(42u32);
        assert!(cast(&other).is_none());
    }
}
