use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::container::binding::BindingId;
use crate::container::recipe::Instance;
use crate::container::registry::BindingRegistry;
use crate::errors::{BoxError, CoreError};

/// Components holding resources that must be closed at shutdown
pub trait Release: Send + Sync {
    /// Close or stop the component
    fn release(&self) -> Result<(), BoxError>;
}

pub(crate) type ReleaseHook = Arc<dyn Fn(&Instance) -> Result<(), BoxError> + Send + Sync>;

/// Root binding followed by every binding reachable through dependency records.
///
/// Each binding lists its immediate dependencies before descending into them,
/// so shared dependencies appear once per path that reaches them.
pub(crate) fn flatten(registry: &BindingRegistry, root: BindingId) -> Vec<BindingId> {
    fn line(registry: &BindingRegistry, id: BindingId, sequence: &mut Vec<BindingId>) {
        let dependencies = registry.binding(id).dependencies().unwrap_or(&[]);
        sequence.extend_from_slice(dependencies);
        for dependency in dependencies {
            line(registry, *dependency, sequence);
        }
    }

    let mut sequence = vec![root];
    line(registry, root, &mut sequence);
    sequence
}

/// Keep only the last occurrence of every binding, preserving forward order.
///
/// Every occurrence of a binding is followed by its own dependencies, so in an
/// acyclic record the result lists each binding before all of its dependencies.
pub(crate) fn keep_last_occurrence(sequence: Vec<BindingId>) -> Vec<BindingId> {
    let mut seen = HashSet::new();
    let mut slots: Vec<Option<BindingId>> = sequence.into_iter().map(Some).collect();
    for slot in slots.iter_mut().rev() {
        if let Some(id) = *slot {
            if !seen.insert(id) {
                *slot = None;
            }
        }
    }
    slots.into_iter().flatten().collect()
}

struct TeardownEntry {
    component: &'static str,
    instance: Instance,
    release: ReleaseHook,
}

/// Release routine composed for a resolved root
pub struct Teardown {
    entries: Vec<TeardownEntry>,
}

impl Teardown {
    /// Compose the teardown for `root` from the dependency records in `registry`
    pub fn compose(registry: &BindingRegistry, root: BindingId) -> Self {
        let entries = keep_last_occurrence(flatten(registry, root))
            .into_iter()
            .filter_map(|id| {
                let binding = registry.binding(id);
                match (&binding.instance, &binding.release) {
                    (Some(instance), Some(release)) => Some(TeardownEntry {
                        component: binding.component().type_name(),
                        instance: instance.clone(),
                        release: release.clone(),
                    }),
                    _ => None,
                }
            })
            .collect();

        Self { entries }
    }

    /// Release every component in order.
    ///
    /// A failing release does not stop the remaining ones; the first failure is
    /// returned once all entries have been visited. Entries are drained, so a
    /// second run releases nothing.
    pub fn run(&mut self) -> Result<(), CoreError> {
        let entries = std::mem::take(&mut self.entries);
        if entries.is_empty() {
            return Ok(());
        }

        tracing::info!("Releasing {} components", entries.len());

        let mut first_failure = None;
        for entry in entries {
            tracing::debug!("Releasing component: {}", entry.component);
            if let Err(source) = (entry.release)(&entry.instance) {
                tracing::error!("Failed to release '{}': {}", entry.component, source);
                if first_failure.is_none() {
                    first_failure = Some(CoreError::ReleaseFailed {
                        component: entry.component.to_string(),
                        source,
                    });
                }
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => {
                tracing::info!("All components released");
                Ok(())
            }
        }
    }

    /// Components in release order
    pub fn components(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.component)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("components", &self.components().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[usize]) -> Vec<BindingId> {
        raw.iter().copied().map(BindingId).collect()
    }

    #[test]
    fn test_keep_last_occurrence() {
        // root(0) -> [db(1), cache(2)], cache -> [db]
        let sequence = ids(&[0, 1, 2, 1]);
        assert_eq!(keep_last_occurrence(sequence), ids(&[0, 2, 1]));
    }

    #[test]
    fn test_keep_last_occurrence_without_duplicates() {
        let sequence = ids(&[4, 3, 2]);
        assert_eq!(keep_last_occurrence(sequence.clone()), sequence);
    }

    #[test]
    fn test_empty_teardown_is_a_no_op() {
        let mut teardown = Teardown { entries: Vec::new() };
        assert!(teardown.is_empty());
        assert!(teardown.run().is_ok());
    }
}
