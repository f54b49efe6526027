//! Item Fixtures

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    context::CartContext,
    items::{BoundItem, CartItem, MultipleBoundItem, WeightedItem},
};

/// Context key selecting a named price list on fixture items.
pub const PRICE_LIST_KEY: &str = "price_list";

/// Parent binding of a fixture item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixtureBinding {
    /// Parent item id
    pub parent: String,

    /// Follow the parent's quantity
    #[serde(default)]
    pub sync_quantity: bool,
}

/// A cart item with every optional capability, configured field by field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureItem {
    id: String,

    #[serde(rename = "type")]
    item_type: String,

    #[serde(default)]
    name: Option<String>,

    #[serde(default = "default_quantity")]
    quantity: Decimal,

    unit_price: Decimal,

    tax_rate: Decimal,

    /// Unit prices by price list name, chosen through [`PRICE_LIST_KEY`].
    #[serde(default)]
    price_lists: FxHashMap<String, Decimal>,

    #[serde(default)]
    weight: Option<Decimal>,

    #[serde(default)]
    bound_to: Option<FixtureBinding>,

    #[serde(default)]
    bound_to_many: Option<Vec<String>>,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl FixtureItem {
    /// Create a plain item with quantity one.
    pub fn new(
        id: impl Into<String>,
        item_type: impl Into<String>,
        unit_price: Decimal,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            item_type: item_type.into(),
            name: None,
            quantity: default_quantity(),
            unit_price,
            tax_rate,
            price_lists: FxHashMap::default(),
            weight: None,
            bound_to: None,
            bound_to_many: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the reported quantity.
    #[must_use]
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    /// Add a unit price used when the context selects `list`.
    #[must_use]
    pub fn with_price_list(mut self, list: impl Into<String>, unit_price: Decimal) -> Self {
        self.price_lists.insert(list.into(), unit_price);
        self
    }

    /// Give the item a unit weight.
    #[must_use]
    pub fn with_weight(mut self, weight: Decimal) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Bind the item to a single parent.
    #[must_use]
    pub fn bound_to(mut self, parent: impl Into<String>, sync_quantity: bool) -> Self {
        self.bound_to = Some(FixtureBinding {
            parent: parent.into(),
            sync_quantity,
        });
        self
    }

    /// Bind the item to several parents.
    #[must_use]
    pub fn bound_to_many<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bound_to_many = Some(parents.into_iter().map(Into::into).collect());
        self
    }
}

impl CartItem for FixtureItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn item_type(&self) -> &str {
        &self.item_type
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn quantity(&self) -> Decimal {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: Decimal) {
        self.quantity = quantity;
    }

    fn unit_price(&self, context: &CartContext) -> Decimal {
        context
            .get(PRICE_LIST_KEY)
            .and_then(|list| self.price_lists.get(list))
            .copied()
            .unwrap_or(self.unit_price)
    }

    fn tax_rate(&self, _context: &CartContext) -> Decimal {
        self.tax_rate
    }

    fn as_weighted(&self) -> Option<&dyn WeightedItem> {
        self.weight.is_some().then_some(self as &dyn WeightedItem)
    }

    fn as_bound(&self) -> Option<&dyn BoundItem> {
        self.bound_to.is_some().then_some(self as &dyn BoundItem)
    }

    fn as_multiple_bound(&self) -> Option<&dyn MultipleBoundItem> {
        self.bound_to_many
            .is_some()
            .then_some(self as &dyn MultipleBoundItem)
    }
}

impl WeightedItem for FixtureItem {
    fn weight(&self) -> Decimal {
        self.weight.unwrap_or_default()
    }
}

impl BoundItem for FixtureItem {
    fn bound_item_id(&self) -> &str {
        self.bound_to
            .as_ref()
            .map_or("", |binding| binding.parent.as_str())
    }

    fn updates_quantity_automatically(&self) -> bool {
        self.bound_to
            .as_ref()
            .is_some_and(|binding| binding.sync_quantity)
    }
}

impl MultipleBoundItem for FixtureItem {
    fn bound_item_ids(&self) -> &[String] {
        self.bound_to_many.as_deref().unwrap_or_default()
    }
}
