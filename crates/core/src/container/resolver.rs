use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::container::binding::BindingId;
use crate::container::key::AbstractionId;
use crate::container::recipe::Param;
use crate::container::registry::BindingRegistry;
use crate::container::tags::TagRegistry;
use crate::errors::CoreError;

/// Chain of abstractions being resolved on the current call stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPath {
    abstractions: Vec<AbstractionId>,
}

impl ResolutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path made of `consumers`, outermost first
    pub fn from_consumers(consumers: impl IntoIterator<Item = AbstractionId>) -> Self {
        Self {
            abstractions: consumers.into_iter().collect(),
        }
    }

    pub fn push(&mut self, abstraction: AbstractionId) {
        self.abstractions.push(abstraction);
    }

    pub fn pop(&mut self) -> Option<AbstractionId> {
        self.abstractions.pop()
    }

    /// Check if the path contains an abstraction (for cycle detection)
    pub fn contains(&self, abstraction: &AbstractionId) -> bool {
        self.abstractions.contains(abstraction)
    }

    /// Innermost consumer
    pub fn last(&self) -> Option<&AbstractionId> {
        self.abstractions.last()
    }

    /// Consumers from innermost to outermost
    pub fn consumers(&self) -> impl Iterator<Item = &AbstractionId> {
        self.abstractions.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.abstractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abstractions.is_empty()
    }

    /// Get the path as a string for error messages
    pub fn path_string(&self) -> String {
        self.abstractions
            .iter()
            .map(|id| id.type_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub(crate) fn circular(&self, abstraction: &AbstractionId) -> CoreError {
        let introduced_by = self
            .last()
            .map(|id| id.type_name())
            .unwrap_or("<root>")
            .to_string();
        CoreError::CircularDependency {
            abstraction: abstraction.type_name().to_string(),
            introduced_by,
            path: format!("{} -> {}", self.path_string(), abstraction.type_name()),
        }
    }
}

/// Summary of a subtree that passed validation
#[derive(Debug)]
struct Walked {
    /// Levels in the subtree, its root included
    height: usize,
    /// Every abstraction visited below and at the root
    reachable: HashSet<AbstractionId>,
}

/// Abstraction, binding and the qualifying consumers that decide lookups below it
type WalkKey = (AbstractionId, BindingId, Vec<AbstractionId>);

/// Walks declared parameters without running any recipe
///
/// Subtrees that already passed are remembered, so shared dependencies are
/// walked once per qualifying context rather than once per path.
pub(crate) struct GraphValidator<'a> {
    registry: &'a BindingRegistry,
    tags: &'a TagRegistry,
    max_depth: usize,
    qualifiers: HashSet<AbstractionId>,
}

impl<'a> GraphValidator<'a> {
    pub(crate) fn new(registry: &'a BindingRegistry, tags: &'a TagRegistry, max_depth: usize) -> Self {
        let qualifiers = registry
            .slots()
            .filter_map(|slot| slot.qualifier)
            .collect();
        Self {
            registry,
            tags,
            max_depth,
            qualifiers,
        }
    }

    /// Validate every unqualified binding as a resolution root
    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        let mut roots: Vec<_> = self
            .registry
            .slots()
            .filter(|slot| slot.qualifier.is_none())
            .map(|slot| (slot.abstraction, slot.binding))
            .collect();
        roots.sort_by_key(|(abstraction, _)| abstraction.type_name());

        let mut walked = HashMap::new();
        for (abstraction, binding) in roots {
            let mut path = ResolutionPath::new();
            self.visit(abstraction, binding, &mut path, &mut walked)?;
        }
        tracing::debug!("Validated {} distinct subtrees", walked.len());
        Ok(())
    }

    /// Consumers on `path` that qualify some binding, innermost first
    fn context(&self, path: &ResolutionPath) -> Vec<AbstractionId> {
        path.consumers()
            .filter(|consumer| self.qualifiers.contains(consumer))
            .copied()
            .collect()
    }

    fn visit(
        &self,
        abstraction: AbstractionId,
        id: BindingId,
        path: &mut ResolutionPath,
        walked: &mut HashMap<WalkKey, Rc<Walked>>,
    ) -> Result<Rc<Walked>, CoreError> {
        if path.contains(&abstraction) {
            return Err(path.circular(&abstraction));
        }
        if path.len() >= self.max_depth {
            return Err(CoreError::ResolutionTooDeep {
                abstraction: abstraction.type_name().to_string(),
                max_depth: self.max_depth,
            });
        }

        // Reuse needs room under the depth limit and no overlap with the path.
        let key = (abstraction, id, self.context(path));
        if let Some(summary) = walked.get(&key) {
            let fits = path.len() + summary.height <= self.max_depth;
            let disjoint = !path
                .consumers()
                .any(|consumer| summary.reachable.contains(consumer));
            if fits && disjoint {
                return Ok(summary.clone());
            }
        }

        let binding = self.registry.binding(id);
        let mut summary = Walked {
            height: 1,
            reachable: HashSet::from([abstraction]),
        };

        path.push(abstraction);
        let result: Result<(), CoreError> = binding
            .params()
            .iter()
            .enumerate()
            .try_for_each(|(position, param)| match param {
                Param::Dependency(dependency) => {
                    let slot = self.registry.lookup_slot(dependency, path)?;
                    let child = self.visit(*dependency, slot.binding, path, walked)?;
                    summary.absorb(&child);
                    Ok(())
                }
                Param::Tagged { label, element } => self
                    .tags
                    .entries(label)
                    .iter()
                    .filter(|entry| entry.abstraction == *element)
                    .try_for_each(|entry| {
                        let child = self.visit(entry.abstraction, entry.binding, path, walked)?;
                        summary.absorb(&child);
                        Ok(())
                    }),
                Param::Literal(_) => match binding.defaults().get(position) {
                    Some(_) => Ok(()),
                    None => Err(CoreError::DefaultNotFound {
                        component: binding.component().to_string(),
                        position,
                    }),
                },
            });
        path.pop();
        result?;

        let summary = Rc::new(summary);
        walked.insert(key, summary.clone());
        Ok(summary)
    }
}

impl Walked {
    fn absorb(&mut self, child: &Walked) {
        self.height = self.height.max(child.height + 1);
        self.reachable.extend(child.reachable.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait A {}
    trait B {}

    #[test]
    fn test_resolution_path() {
        let mut path = ResolutionPath::new();
        let a = AbstractionId::of::<dyn A>();
        let b = AbstractionId::of::<dyn B>();

        path.push(a);
        path.push(b);

        assert!(path.contains(&a));
        assert_eq!(path.last(), Some(&b));
        assert_eq!(path.consumers().copied().collect::<Vec<_>>(), vec![b, a]);

        assert_eq!(path.pop(), Some(b));
        assert!(!path.contains(&b));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_circular_error_identifies_both_sides() {
        let a = AbstractionId::of::<dyn A>();
        let b = AbstractionId::of::<dyn B>();
        let path = ResolutionPath::from_consumers([a, b]);

        match path.circular(&a) {
            CoreError::CircularDependency {
                abstraction,
                introduced_by,
                path,
            } => {
                assert_eq!(abstraction, a.type_name());
                assert_eq!(introduced_by, b.type_name());
                assert!(path.ends_with(a.type_name()));
                assert_eq!(path.matches(" -> ").count(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
