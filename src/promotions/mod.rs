//! Promotions
//!
//! Pluggable rules run on every cart modification, in three phases:
//!
//! 1. `before_apply` on every promotion,
//! 2. `apply` on every promotion that reports itself eligible,
//! 3. `after_apply` on every promotion.
//!
//! Each phase walks the promotions in registration order. Mutations a promotion makes
//! to the cart while the pipeline runs do not start a nested run.

use std::fmt;

use slotmap::{SlotMap, new_key_type};
use tracing::trace;

use crate::cart::{Cart, CartError};

new_key_type! {
    /// Promotion Key
    pub struct PromotionKey;
}

/// A rule that may inspect and mutate the cart.
pub trait Promotion: fmt::Debug {
    /// Whether the promotion should be applied to the cart as it currently is.
    fn is_eligible(&self, cart: &Cart) -> bool;

    /// Called on every promotion before any promotion is applied.
    ///
    /// # Errors
    ///
    /// Returns any [`CartError`] raised while touching the cart.
    fn before_apply(&mut self, _cart: &mut Cart) -> Result<(), CartError> {
        Ok(())
    }

    /// Apply the promotion. Called only if the promotion is eligible.
    ///
    /// # Errors
    ///
    /// Returns any [`CartError`] raised while touching the cart.
    fn apply(&mut self, cart: &mut Cart) -> Result<(), CartError>;

    /// Called on every promotion after all eligible promotions have been applied.
    ///
    /// # Errors
    ///
    /// Returns any [`CartError`] raised while touching the cart.
    fn after_apply(&mut self, _cart: &mut Cart) -> Result<(), CartError> {
        Ok(())
    }
}

/// Registration-ordered set of promotions.
#[derive(Debug, Default)]
pub struct Promotions {
    promotions: SlotMap<PromotionKey, Box<dyn Promotion>>,
    order: Vec<PromotionKey>,
}

impl Promotions {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a promotion after every existing one.
    pub fn add(&mut self, promotion: Box<dyn Promotion>) -> PromotionKey {
        let key = self.promotions.insert(promotion);

        self.order.push(key);

        key
    }

    /// Unregister a promotion, returning it if it was present.
    pub fn remove(&mut self, key: PromotionKey) -> Option<Box<dyn Promotion>> {
        let promotion = self.promotions.remove(key)?;

        self.order.retain(|k| *k != key);

        Some(promotion)
    }

    /// Look up a promotion.
    pub fn get(&self, key: PromotionKey) -> Option<&dyn Promotion> {
        self.promotions.get(key).map(Box::as_ref)
    }

    /// Iterate over promotions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (PromotionKey, &dyn Promotion)> {
        self.order.iter().filter_map(|key| {
            self.promotions
                .get(*key)
                .map(|promotion| (*key, promotion.as_ref()))
        })
    }

    /// Number of registered promotions.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no promotions are registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Run the three phases against `cart`.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error raised by a promotion hook.
    pub fn run(&mut self, cart: &mut Cart) -> Result<(), CartError> {
        trace!(promotions = self.order.len(), "before apply");

        for key in &self.order {
            if let Some(promotion) = self.promotions.get_mut(*key) {
                promotion.before_apply(cart)?;
            }
        }

        trace!(promotions = self.order.len(), "apply");

        for key in &self.order {
            if let Some(promotion) = self.promotions.get_mut(*key)
                && promotion.is_eligible(cart)
            {
                promotion.apply(cart)?;
            }
        }

        trace!(promotions = self.order.len(), "after apply");

        for key in &self.order {
            if let Some(promotion) = self.promotions.get_mut(*key) {
                promotion.after_apply(cart)?;
            }
        }

        Ok(())
    }
}

impl FromIterator<Box<dyn Promotion>> for Promotions {
    fn from_iter<T: IntoIterator<Item = Box<dyn Promotion>>>(iter: T) -> Self {
        let mut promotions = Self::new();

        for promotion in iter {
            promotions.add(promotion);
        }

        promotions
    }
}
