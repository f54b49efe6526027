//! Cart Context
//!
//! Opaque data handed to every item whenever the cart reads a price. The cart never
//! interprets it; items may use it for custom price logic (price lists, customer groups).

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Key/value data passed unchanged into every price-affecting item read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CartContext {
    data: FxHashMap<String, String>,
}

impl CartContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Check if the context carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
