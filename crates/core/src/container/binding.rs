use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::key::AbstractionId;
use crate::container::lifecycle::ReleaseHook;
use crate::container::recipe::{caster, Build, Caster, Instance, Param};
use crate::errors::CoreError;

/// Index of a binding inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub(crate) usize);

impl BindingId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Definition key of a registered recipe: the concrete component's type name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingRef(String);

impl BindingRef {
    pub(crate) fn new(concrete: &AbstractionId) -> Self {
        Self(concrete.type_name().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BindingRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A literal default together with its type identity
#[derive(Clone)]
pub struct DefaultValue {
    pub(crate) value: Instance,
    pub(crate) kind: AbstractionId,
}

impl DefaultValue {
    pub fn kind(&self) -> &AbstractionId {
        &self.kind
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultValue").field("kind", &self.kind).finish()
    }
}

/// Literal defaults keyed by parameter position
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    values: BTreeMap<usize, DefaultValue>,
}

impl Defaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default for the parameter at `position`
    pub fn with<V: Send + Sync + 'static>(mut self, position: usize, value: V) -> Self {
        self.insert(position, value);
        self
    }

    pub fn insert<V: Send + Sync + 'static>(&mut self, position: usize, value: V) {
        self.values.insert(
            position,
            DefaultValue {
                value: Arc::new(value),
                kind: AbstractionId::of::<V>(),
            },
        );
    }

    pub fn get(&self, position: usize) -> Option<&DefaultValue> {
        self.values.get(&position)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check the defaults against the declared parameters of `component`
    pub fn verify(&self, component: &AbstractionId, params: &[Param]) -> Result<(), CoreError> {
        for (position, param) in params.iter().enumerate() {
            match (param, self.values.get(&position)) {
                (param, Some(_)) if param.is_wired() => {
                    return Err(CoreError::DefaultForWired {
                        component: component.to_string(),
                        position,
                    });
                }
                (Param::Literal(expected), Some(given)) if expected != &given.kind => {
                    return Err(CoreError::mismatched_types(
                        expected.type_name(),
                        given.kind.type_name(),
                    ));
                }
                (Param::Literal(_), None) => {
                    return Err(CoreError::DefaultNotFound {
                        component: component.to_string(),
                        position,
                    });
                }
                _ => {}
            }
        }

        if let Some(position) = self.values.keys().find(|position| **position >= params.len()) {
            return Err(CoreError::DefaultOutOfRange {
                component: component.to_string(),
                position: *position,
            });
        }

        Ok(())
    }
}

/// Registration options for a recipe building `C`
pub struct BindingOptions<C> {
    pub(crate) qualifier: Option<AbstractionId>,
    pub(crate) aliases: Vec<(AbstractionId, Caster)>,
    pub(crate) tags: Vec<String>,
    pub(crate) fallback: bool,
    pub(crate) defaults: Defaults,
    _component: PhantomData<fn() -> C>,
}

impl<C: Send + Sync + 'static> BindingOptions<C> {
    pub fn new() -> Self {
        Self {
            qualifier: None,
            aliases: Vec::new(),
            tags: Vec::new(),
            fallback: false,
            defaults: Defaults::new(),
            _component: PhantomData,
        }
    }

    /// Restrict the binding to consumers resolving through `Q`
    pub fn for_consumer<Q: ?Sized + 'static>(mut self) -> Self {
        self.qualifier = Some(AbstractionId::of::<Q>());
        self
    }

    /// Also expose the component as `I`
    pub fn alias<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.aliases
            .push((AbstractionId::of::<I>(), caster::<C, I, F>(cast)));
        self
    }

    /// List the binding under `label`
    pub fn tag(mut self, label: impl Into<String>) -> Self {
        self.tags.push(label.into());
        self
    }

    /// Install only where no binding exists yet
    pub fn fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Replace the literal defaults
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Add a literal default for the parameter at `position`
    pub fn default_value<V: Send + Sync + 'static>(mut self, position: usize, value: V) -> Self {
        self.defaults.insert(position, value);
        self
    }
}

impl<C: Send + Sync + 'static> Default for BindingOptions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for BindingOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aliases: Vec<_> = self.aliases.iter().map(|(id, _)| id.type_name()).collect();
        f.debug_struct("BindingOptions")
            .field("qualifier", &self.qualifier)
            .field("aliases", &aliases)
            .field("tags", &self.tags)
            .field("fallback", &self.fallback)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// A registered recipe together with its singleton state
pub struct Binding {
    pub(crate) component: AbstractionId,
    pub(crate) params: Vec<Param>,
    pub(crate) defaults: Defaults,
    pub(crate) build: Build,
    pub(crate) release: Option<ReleaseHook>,
    pub(crate) instance: Option<Instance>,
    pub(crate) dependencies: Option<Vec<BindingId>>,
}

impl Binding {
    pub(crate) fn new(
        component: AbstractionId,
        params: Vec<Param>,
        defaults: Defaults,
        build: Build,
        release: Option<ReleaseHook>,
    ) -> Self {
        Self {
            component,
            params,
            defaults,
            build,
            release,
            instance: None,
            dependencies: None,
        }
    }

    /// Concrete component built by the recipe
    pub fn component(&self) -> &AbstractionId {
        &self.component
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    pub fn is_releasable(&self) -> bool {
        self.release.is_some()
    }

    /// Immediate dependencies recorded on first instantiation
    pub fn dependencies(&self) -> Option<&[BindingId]> {
        self.dependencies.as_deref()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("component", &self.component)
            .field("params", &self.params)
            .field("defaults", &self.defaults)
            .field("releasable", &self.release.is_some())
            .field("instantiated", &self.instance.is_some())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Clock: Send + Sync {}

    struct Server;

    fn component() -> AbstractionId {
        AbstractionId::of::<Server>()
    }

    #[test]
    fn test_defaults_cover_literals() {
        let params = vec![
            Param::Dependency(AbstractionId::of::<dyn Clock>()),
            Param::Literal(AbstractionId::of::<u16>()),
        ];
        let defaults = Defaults::new().with(1, 8080u16);

        assert!(defaults.verify(&component(), &params).is_ok());
    }

    #[test]
    fn test_missing_default_for_literal() {
        let params = vec![
            Param::Literal(AbstractionId::of::<String>()),
            Param::Literal(AbstractionId::of::<u16>()),
        ];
        let defaults = Defaults::new().with(0, "localhost".to_string());

        let error = defaults.verify(&component(), &params).unwrap_err();
        assert!(matches!(error, CoreError::DefaultNotFound { position: 1, .. }));
    }

    #[test]
    fn test_default_for_wired_parameter() {
        let params = vec![
            Param::Tagged {
                label: "clocks".to_string(),
                element: AbstractionId::of::<dyn Clock>(),
            },
        ];
        let defaults = Defaults::new().with(0, 1u8);

        let error = defaults.verify(&component(), &params).unwrap_err();
        assert!(matches!(error, CoreError::DefaultForWired { position: 0, .. }));
    }

    #[test]
    fn test_mismatched_default_kind() {
        let params = vec![Param::Literal(AbstractionId::of::<u16>())];
        let defaults = Defaults::new().with(0, "8080");

        let error = defaults.verify(&component(), &params).unwrap_err();
        match error {
            CoreError::MismatchedTypes { expected, given } => {
                assert_eq!(expected, "u16");
                assert_eq!(given, "&str");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_without_parameter() {
        let defaults = Defaults::new().with(3, true);

        let error = defaults.verify(&component(), &[]).unwrap_err();
        assert!(matches!(error, CoreError::DefaultOutOfRange { position: 3, .. }));
    }

    #[test]
    fn test_options_collect_settings() {
        struct Quartz;
        impl Clock for Quartz {}

        let options = BindingOptions::<Quartz>::new()
            .alias::<dyn Clock, _>(|quartz| quartz as Arc<dyn Clock>)
            .for_consumer::<Server>()
            .tag("clocks")
            .fallback();

        assert_eq!(options.aliases.len(), 1);
        assert_eq!(options.aliases[0].0, AbstractionId::of::<dyn Clock>());
        assert_eq!(options.qualifier, Some(AbstractionId::of::<Server>()));
        assert_eq!(options.tags, vec!["clocks".to_string()]);
        assert!(options.fallback);
    }
}
