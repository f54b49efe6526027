//! Items
//!
//! Line items are supplied by the caller and consumed through [`CartItem`]. Extended
//! behaviour (weight, bindings to other items) is discovered through optional
//! capability accessors rather than a type hierarchy, so one item can carry any
//! combination of them.

use std::fmt;

use rust_decimal::Decimal;

use crate::context::CartContext;

/// A line entry in a cart.
pub trait CartItem: fmt::Debug {
    /// Identifier, unique within a cart.
    fn id(&self) -> &str;

    /// Free-form classification used for filtering and sorting.
    fn item_type(&self) -> &str;

    /// Display name of the item.
    fn name(&self) -> &str {
        self.id()
    }

    /// Current quantity.
    fn quantity(&self) -> Decimal;

    /// Set the quantity. Called by the cart only.
    fn set_quantity(&mut self, quantity: Decimal);

    /// Unit price for the given context.
    fn unit_price(&self, context: &CartContext) -> Decimal;

    /// Tax rate as a percentage (`20` means 20%).
    fn tax_rate(&self, context: &CartContext) -> Decimal;

    /// Weight capability, if the item has one.
    fn as_weighted(&self) -> Option<&dyn WeightedItem> {
        None
    }

    /// Single-parent binding capability, if the item has one.
    fn as_bound(&self) -> Option<&dyn BoundItem> {
        None
    }

    /// Multi-parent binding capability, if the item has one.
    fn as_multiple_bound(&self) -> Option<&dyn MultipleBoundItem> {
        None
    }
}

/// Item with a unit weight.
pub trait WeightedItem {
    /// Weight of one unit.
    fn weight(&self) -> Decimal;
}

/// Item whose lifecycle follows a single parent item.
pub trait BoundItem {
    /// Id of the parent item.
    fn bound_item_id(&self) -> &str;

    /// Whether the item mirrors the parent's quantity.
    fn updates_quantity_automatically(&self) -> bool;
}

/// Item bound to several parent items at once.
pub trait MultipleBoundItem {
    /// Ids of every parent item.
    fn bound_item_ids(&self) -> &[String];
}

/// Every parent id an item declares, single binding first, without duplicates.
pub(crate) fn declared_parents(item: &dyn CartItem) -> Vec<&str> {
    let mut parents: Vec<&str> = Vec::new();

    let single = item.as_bound().map(BoundItem::bound_item_id);
    let multiple = item
        .as_multiple_bound()
        .map(MultipleBoundItem::bound_item_ids)
        .unwrap_or_default();

    for parent in single
        .into_iter()
        .chain(multiple.iter().map(String::as_str))
    {
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    parents
}
