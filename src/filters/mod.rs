//! Item Filters
//!
//! Selection of cart items for queries and totals. Every filter has a cache key so
//! computed totals can be memoised per filter.

use std::{fmt, rc::Rc, str::FromStr};

use thiserror::Error;

use crate::items::CartItem;

pub mod type_spec;

pub use type_spec::TypeSpec;

/// Errors raised while building filters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A type spec could not be parsed.
    #[error("malformed type spec {0:?}: '~' is only allowed as the first character")]
    Malformed(String),
}

type Predicate = Rc<dyn Fn(&dyn CartItem) -> bool>;

/// Selects items from a cart.
#[derive(Clone)]
pub enum ItemFilter {
    /// Select by item type.
    Types(TypeSpec),

    /// Select with an arbitrary predicate. The key identifies the predicate in the
    /// totals cache, so two predicates sharing a key must select the same items.
    Predicate {
        /// Cache identity of the predicate
        key: String,
        /// The predicate itself
        predicate: Predicate,
    },
}

/// Identity of a filter in the totals cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// Canonical type spec string
    Types(String),
    /// Caller-supplied predicate key
    Predicate(String),
}

impl ItemFilter {
    /// Filter matching every item.
    #[must_use]
    pub fn all() -> Self {
        Self::Types(TypeSpec::all())
    }

    /// Filter from a type spec string.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Malformed`] if the type spec does not parse.
    pub fn types(spec: &str) -> Result<Self, FilterError> {
        Ok(Self::Types(TypeSpec::parse(spec)?))
    }

    /// Filter from a keyed predicate.
    pub fn predicate<F>(key: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn CartItem) -> bool + 'static,
    {
        Self::Predicate {
            key: key.into(),
            predicate: Rc::new(predicate),
        }
    }

    /// Check if an item is selected.
    pub fn matches(&self, item: &dyn CartItem) -> bool {
        match self {
            ItemFilter::Types(spec) => spec.matches(item.item_type()),
            ItemFilter::Predicate { predicate, .. } => predicate(item),
        }
    }

    /// Key used to memoise totals for this filter.
    pub fn cache_key(&self) -> FilterKey {
        match self {
            ItemFilter::Types(spec) => FilterKey::Types(spec.to_string()),
            ItemFilter::Predicate { key, .. } => FilterKey::Predicate(key.clone()),
        }
    }
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl From<TypeSpec> for ItemFilter {
    fn from(spec: TypeSpec) -> Self {
        Self::Types(spec)
    }
}

impl FromStr for ItemFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::types(s)
    }
}

impl fmt::Debug for ItemFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFilter::Types(spec) => f.debug_tuple("Types").field(spec).finish(),
            ItemFilter::Predicate { key, .. } => f
                .debug_struct("Predicate")
                .field("key", key)
                .finish_non_exhaustive(),
        }
    }
}
