use std::sync::Arc;

use crate::config::ContainerConfig;
use crate::container::binding::{Binding, BindingId, BindingOptions, BindingRef, Defaults};
use crate::container::key::{AbstractionId, BindingKey};
use crate::container::lifecycle::Teardown;
use crate::container::recipe::{Args, Argument, Caster, Erased, Instance, Param, Recipe};
use crate::container::registry::{BindingRegistry, Installed, Slot};
use crate::container::resolver::{GraphValidator, ResolutionPath};
use crate::container::tags::{TagEntry, TagRegistry};
use crate::errors::CoreError;

/// Singleton container resolving abstractions from registered recipes
#[derive(Debug, Default)]
pub struct Container {
    registry: BindingRegistry,
    tags: TagRegistry,
    config: ContainerConfig,
}

impl Container {
    /// Create an empty container with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty container with a validated configuration
    pub fn with_config(config: ContainerConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            registry: BindingRegistry::new(),
            tags: TagRegistry::new(),
            config,
        })
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Register `recipe` as the implementation of `I`
    ///
    /// `cast` turns the concrete component into the abstraction, usually
    /// `|component| component as Arc<dyn Trait>`.
    pub fn register<I, C, F>(
        &mut self,
        recipe: Recipe<C>,
        cast: F,
        options: BindingOptions<C>,
    ) -> Result<BindingRef, CoreError>
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.define(recipe, options.alias::<I, F>(cast))
    }

    /// Register `recipe` under the aliases listed in `options`
    ///
    /// The returned key can later expose the same binding under more
    /// abstractions through [`Container::register_by_key`].
    pub fn define<C>(
        &mut self,
        recipe: Recipe<C>,
        options: BindingOptions<C>,
    ) -> Result<BindingRef, CoreError>
    where
        C: Send + Sync + 'static,
    {
        let component = AbstractionId::of::<C>();
        let (params, build, release) = recipe.into_parts();
        options.defaults.verify(&component, &params)?;
        self.check_overrides(&options)?;

        let BindingOptions {
            qualifier,
            aliases,
            tags,
            fallback,
            defaults,
            ..
        } = options;

        let id = self
            .registry
            .add(Binding::new(component, params, defaults, build, release));
        tracing::debug!("Defined recipe: {}", component);

        self.expose(id, qualifier, aliases, &tags, fallback);
        Ok(BindingRef::new(&component))
    }

    /// Expose an already defined binding under the aliases listed in `options`
    pub fn register_by_key<C>(
        &mut self,
        key: impl AsRef<str>,
        options: BindingOptions<C>,
    ) -> Result<BindingRef, CoreError>
    where
        C: Send + Sync + 'static,
    {
        let key = key.as_ref();
        let id = self
            .registry
            .definition(key)
            .ok_or_else(|| CoreError::KeyNotFound {
                key: key.to_string(),
            })?;

        let component = *self.registry.binding(id).component();
        if component != AbstractionId::of::<C>() {
            return Err(CoreError::mismatched_types(
                component.type_name(),
                std::any::type_name::<C>(),
            ));
        }
        if !options.defaults.is_empty() {
            return Err(CoreError::InvalidRecipe {
                component: component.to_string(),
                message: "defaults cannot be changed when registering by key".to_string(),
            });
        }
        self.check_overrides(&options)?;

        let BindingOptions {
            qualifier,
            aliases,
            tags,
            fallback,
            ..
        } = options;
        self.expose(id, qualifier, aliases, &tags, fallback);
        Ok(BindingRef::new(&component))
    }

    /// Binding that would serve `I` for the consumers on `path`
    pub fn lookup<I: ?Sized + 'static>(&self, path: &ResolutionPath) -> Result<&Binding, CoreError> {
        self.registry
            .lookup(&AbstractionId::of::<I>(), path)
            .map(|(_, binding)| binding)
    }

    /// Check whether an unqualified binding exists for `I`
    pub fn is_wired<I: ?Sized + 'static>(&self) -> bool {
        self.registry
            .contains(&BindingKey::unqualified(&AbstractionId::of::<I>()))
    }

    /// Resolve `I`, building its dependency graph on first use
    pub fn resolve<I: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<I>, CoreError> {
        self.resolve_in::<I>(ResolutionPath::new())
            .map(|(instance, _)| instance)
    }

    /// Resolve `I` as it would be injected into consumer `Q`
    pub fn resolve_for<I, Q>(&mut self) -> Result<Arc<I>, CoreError>
    where
        I: ?Sized + Send + Sync + 'static,
        Q: ?Sized + 'static,
    {
        let path = ResolutionPath::from_consumers([AbstractionId::of::<Q>()]);
        self.resolve_in::<I>(path).map(|(instance, _)| instance)
    }

    /// Resolve the application root together with its teardown routine
    pub fn resolve_with_teardown<I: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<(Arc<I>, Teardown), CoreError> {
        let (instance, root) = self.resolve_in::<I>(ResolutionPath::new())?;
        let teardown = Teardown::compose(&self.registry, root);
        tracing::debug!(
            "Composed teardown for {} with {} releasable components",
            std::any::type_name::<I>(),
            teardown.len()
        );
        Ok((instance, teardown))
    }

    /// Resolve every binding tagged with `label`, in registration order
    pub fn tagged<I: ?Sized + Send + Sync + 'static>(
        &mut self,
        label: &str,
    ) -> Result<Vec<Arc<I>>, CoreError> {
        let element = AbstractionId::of::<I>();
        let mut path = ResolutionPath::new();
        self.resolve_tag(label, &element, &mut path)?
            .into_iter()
            .map(|(erased, _)| downcast::<I>(erased, &element))
            .collect()
    }

    /// Check every unqualified binding's graph without running any recipe
    pub fn validate(&self) -> Result<(), CoreError> {
        GraphValidator::new(&self.registry, &self.tags, self.config.max_resolution_depth).validate()
    }

    fn check_overrides<C>(&self, options: &BindingOptions<C>) -> Result<(), CoreError> {
        if !self.config.strict_overrides || options.fallback {
            return Ok(());
        }

        for (abstraction, _) in &options.aliases {
            let key = BindingKey::new(abstraction, options.qualifier.as_ref());
            if self.registry.contains(&key) {
                return Err(CoreError::DuplicateBinding {
                    abstraction: abstraction.to_string(),
                });
            }
        }
        Ok(())
    }

    fn expose(
        &mut self,
        id: BindingId,
        qualifier: Option<AbstractionId>,
        aliases: Vec<(AbstractionId, Caster)>,
        tags: &[String],
        fallback: bool,
    ) {
        let component = *self.registry.binding(id).component();

        for (abstraction, cast) in aliases {
            let key = BindingKey::new(&abstraction, qualifier.as_ref());
            let slot = Slot {
                binding: id,
                abstraction,
                qualifier,
                cast: cast.clone(),
            };

            match self.registry.install(key, slot, fallback) {
                Installed::Inserted => {
                    tracing::debug!("Wired {} to {}", abstraction, component)
                }
                Installed::Replaced => {
                    tracing::warn!("Binding for {} replaced by {}", abstraction, component)
                }
                Installed::Skipped => {
                    tracing::debug!("Fallback {} skipped for {}", component, abstraction)
                }
            }

            for label in tags {
                self.tags.tag(
                    label,
                    TagEntry {
                        abstraction,
                        binding: id,
                        cast: cast.clone(),
                    },
                );
            }
        }
    }

    fn resolve_in<I: ?Sized + Send + Sync + 'static>(
        &mut self,
        mut path: ResolutionPath,
    ) -> Result<(Arc<I>, BindingId), CoreError> {
        let abstraction = AbstractionId::of::<I>();
        let (erased, id) = self.resolve_abstraction(abstraction, &mut path)?;
        Ok((downcast::<I>(erased, &abstraction)?, id))
    }

    fn resolve_abstraction(
        &mut self,
        abstraction: AbstractionId,
        path: &mut ResolutionPath,
    ) -> Result<(Erased, BindingId), CoreError> {
        let slot = self.registry.lookup_slot(&abstraction, path)?.clone();
        let instance = self.instantiate(slot.binding, abstraction, path)?;
        let erased = self.cast(&slot.cast, &instance, slot.binding, &abstraction)?;
        Ok((erased, slot.binding))
    }

    fn instantiate(
        &mut self,
        id: BindingId,
        abstraction: AbstractionId,
        path: &mut ResolutionPath,
    ) -> Result<Instance, CoreError> {
        let binding = self.registry.binding(id);
        if let Some(instance) = &binding.instance {
            return Ok(instance.clone());
        }
        if path.contains(&abstraction) {
            return Err(path.circular(&abstraction));
        }
        if path.len() >= self.config.max_resolution_depth {
            return Err(CoreError::ResolutionTooDeep {
                abstraction: abstraction.to_string(),
                max_depth: self.config.max_resolution_depth,
            });
        }

        let component = *binding.component();
        let params = binding.params.clone();
        let defaults = binding.defaults.clone();
        let build = binding.build.clone();

        path.push(abstraction);
        let assembled = self.assemble(&component, &params, &defaults, path);
        path.pop();
        let (arguments, dependencies) = assembled?;

        if arguments.len() != params.len() {
            return Err(CoreError::ArgumentCountMismatch {
                component: component.to_string(),
                expected: params.len(),
                given: arguments.len(),
            });
        }

        tracing::debug!("Instantiating {} for {}", component, abstraction);
        let mut args = Args::new(component.type_name(), arguments);
        let instance = build(&mut args)?;

        let binding = self.registry.binding_mut(id);
        binding.instance = Some(instance.clone());
        binding.dependencies = Some(dependencies);
        Ok(instance)
    }

    fn assemble(
        &mut self,
        component: &AbstractionId,
        params: &[Param],
        defaults: &Defaults,
        path: &mut ResolutionPath,
    ) -> Result<(Vec<Argument>, Vec<BindingId>), CoreError> {
        let mut arguments = Vec::with_capacity(params.len());
        let mut dependencies = Vec::new();

        for (position, param) in params.iter().enumerate() {
            match param {
                Param::Dependency(dependency) => {
                    let (erased, id) = self.resolve_abstraction(*dependency, path)?;
                    arguments.push(Argument::Dependency(erased));
                    dependencies.push(id);
                }
                Param::Tagged { label, element } => {
                    let (items, ids): (Vec<_>, Vec<_>) =
                        self.resolve_tag(label, element, path)?.into_iter().unzip();
                    arguments.push(Argument::Collection(items));
                    dependencies.extend(ids);
                }
                Param::Literal(_) => {
                    let value = defaults
                        .get(position)
                        .ok_or_else(|| CoreError::DefaultNotFound {
                            component: component.to_string(),
                            position,
                        })?;
                    arguments.push(Argument::Literal(value.value.clone()));
                }
            }
        }

        Ok((arguments, dependencies))
    }

    fn resolve_tag(
        &mut self,
        label: &str,
        element: &AbstractionId,
        path: &mut ResolutionPath,
    ) -> Result<Vec<(Erased, BindingId)>, CoreError> {
        let entries = self.tags.entries(label).to_vec();
        let mut resolved = Vec::with_capacity(entries.len());

        // A binding tagged under several aliases has one entry per alias.
        for entry in entries.into_iter().filter(|entry| entry.abstraction == *element) {
            let instance = self.instantiate(entry.binding, entry.abstraction, path)?;
            let erased = self.cast(&entry.cast, &instance, entry.binding, element)?;
            resolved.push((erased, entry.binding));
        }

        Ok(resolved)
    }

    fn cast(
        &self,
        cast: &Caster,
        instance: &Instance,
        id: BindingId,
        abstraction: &AbstractionId,
    ) -> Result<Erased, CoreError> {
        cast(instance).ok_or_else(|| {
            CoreError::mismatched_types(
                abstraction.type_name(),
                self.registry.binding(id).component().type_name(),
            )
        })
    }
}

fn downcast<I: ?Sized + Send + Sync + 'static>(
    erased: Erased,
    abstraction: &AbstractionId,
) -> Result<Arc<I>, CoreError> {
    erased
        .downcast::<Arc<I>>()
        .map(|instance| *instance)
        .map_err(|_| CoreError::mismatched_types(abstraction.type_name(), std::any::type_name::<I>()))
}
