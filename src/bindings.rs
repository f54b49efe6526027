//! Bindings
//!
//! Index from a parent item id to the ids of items bound to it. Entries only exist
//! while at least one dependent is registered.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Parent id -> dependent ids, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingIndex {
    bindings: FxHashMap<String, SmallVec<[String; 4]>>,
}

impl BindingIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dependent` as bound to `parent`. Registering twice is a no-op.
    pub fn bind(&mut self, parent: &str, dependent: &str) {
        let dependents = self.bindings.entry(parent.to_string()).or_default();

        if !dependents.iter().any(|d| d == dependent) {
            dependents.push(dependent.to_string());
        }
    }

    /// Drop the registration of `dependent` against `parent`, pruning empty entries.
    pub fn unbind(&mut self, parent: &str, dependent: &str) {
        let Some(dependents) = self.bindings.get_mut(parent) else {
            return;
        };

        dependents.retain(|d| d != dependent);

        if dependents.is_empty() {
            self.bindings.remove(parent);
        }
    }

    /// Items bound to `parent`.
    pub fn dependents(&self, parent: &str) -> &[String] {
        self.bindings
            .get(parent)
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    /// Check if anything is bound to `parent`.
    pub fn is_bound(&self, parent: &str) -> bool {
        self.bindings.contains_key(parent)
    }

    /// Number of parents with at least one dependent.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Remove every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
