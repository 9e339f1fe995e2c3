use std::collections::HashMap;
use std::fmt;

use crate::container::binding::BindingId;
use crate::container::key::AbstractionId;
use crate::container::recipe::Caster;

/// One binding listed under a label, exposed as `abstraction`
#[derive(Clone)]
pub(crate) struct TagEntry {
    pub(crate) abstraction: AbstractionId,
    pub(crate) binding: BindingId,
    pub(crate) cast: Caster,
}

impl fmt::Debug for TagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagEntry")
            .field("abstraction", &self.abstraction)
            .field("binding", &self.binding)
            .finish()
    }
}

/// Labels mapped to bindings in insertion order
#[derive(Debug, Default)]
pub struct TagRegistry {
    labels: HashMap<String, Vec<TagEntry>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tag(&mut self, label: &str, entry: TagEntry) {
        self.labels.entry(label.to_string()).or_default().push(entry);
    }

    pub(crate) fn entries(&self, label: &str) -> &[TagEntry] {
        self.labels.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bindings listed under `label`, in insertion order
    pub fn bindings(&self, label: &str) -> Vec<BindingId> {
        self.entries(label).iter().map(|entry| entry.binding).collect()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Number of known labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::recipe::caster;
    use std::sync::Arc;

    trait Handler: Send + Sync {}
    struct Ping;
    impl Handler for Ping {}

    fn entry(index: usize) -> TagEntry {
        TagEntry {
            abstraction: AbstractionId::of::<dyn Handler>(),
            binding: BindingId(index),
            cast: caster::<Ping, dyn Handler, _>(|ping| ping as Arc<dyn Handler>),
        }
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut tags = TagRegistry::new();
        tags.tag("handlers", entry(2));
        tags.tag("handlers", entry(0));
        tags.tag("handlers", entry(1));

        assert_eq!(
            tags.bindings("handlers"),
            vec![BindingId(2), BindingId(0), BindingId(1)]
        );
    }

    #[test]
    fn test_binding_under_several_labels() {
        let mut tags = TagRegistry::new();
        tags.tag("http", entry(0));
        tags.tag("admin", entry(0));

        assert_eq!(tags.len(), 2);
        assert_eq!(tags.bindings("http"), tags.bindings("admin"));
    }

    #[test]
    fn test_unknown_label_is_empty() {
        let tags = TagRegistry::new();
        assert!(tags.entries("missing").is_empty());
        assert!(!tags.contains("missing"));
    }
}
