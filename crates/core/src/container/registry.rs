use std::collections::HashMap;
use std::fmt;

use crate::container::binding::{Binding, BindingId};
use crate::container::key::{AbstractionId, BindingKey};
use crate::container::recipe::Caster;
use crate::container::resolver::ResolutionPath;
use crate::errors::CoreError;

/// A binding installed under one key, with the cast to the key's abstraction
#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) binding: BindingId,
    pub(crate) abstraction: AbstractionId,
    pub(crate) qualifier: Option<AbstractionId>,
    pub(crate) cast: Caster,
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("binding", &self.binding)
            .field("abstraction", &self.abstraction)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}

/// Outcome of installing a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Installed {
    Inserted,
    Replaced,
    Skipped,
}

/// Table of bindings keyed by abstraction and qualifier
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
    slots: HashMap<BindingKey, Slot>,
    definitions: HashMap<String, BindingId>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, binding: Binding) -> BindingId {
        let id = BindingId(self.bindings.len());
        self.definitions
            .insert(binding.component().type_name().to_string(), id);
        self.bindings.push(binding);
        id
    }

    /// Put `slot` under `key`; a fallback slot never replaces an existing one
    pub(crate) fn install(&mut self, key: BindingKey, slot: Slot, fallback: bool) -> Installed {
        match self.slots.contains_key(&key) {
            true if fallback => Installed::Skipped,
            true => {
                self.slots.insert(key, slot);
                Installed::Replaced
            }
            false => {
                self.slots.insert(key, slot);
                Installed::Inserted
            }
        }
    }

    /// Find the binding for `abstraction`, preferring the innermost consumer on `path`
    pub(crate) fn lookup_slot(
        &self,
        abstraction: &AbstractionId,
        path: &ResolutionPath,
    ) -> Result<&Slot, CoreError> {
        path.consumers()
            .map(|consumer| BindingKey::new(abstraction, Some(consumer)))
            .chain(std::iter::once(BindingKey::unqualified(abstraction)))
            .find_map(|key| self.slots.get(&key))
            .ok_or_else(|| CoreError::not_wired(abstraction.type_name()))
    }

    /// Binding registered for `abstraction` as seen from the consumers on `path`
    pub fn lookup(
        &self,
        abstraction: &AbstractionId,
        path: &ResolutionPath,
    ) -> Result<(BindingId, &Binding), CoreError> {
        let slot = self.lookup_slot(abstraction, path)?;
        Ok((slot.binding, self.binding(slot.binding)))
    }

    /// Binding defined for a concrete component key
    pub fn definition(&self, key: &str) -> Option<BindingId> {
        self.definitions.get(key).copied()
    }

    pub fn contains(&self, key: &BindingKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0]
    }

    pub(crate) fn binding_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id.0]
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    /// Number of installed keys
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of defined recipes
    pub fn bindings_len(&self) -> usize {
        self.bindings.len()
    }
}
