//! Trolley prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    bindings::BindingIndex,
    cart::{Cart, CartError},
    config::{CartConfig, ConfigError},
    context::CartContext,
    filters::{FilterError, FilterKey, ItemFilter, type_spec::TypeSpec},
    items::{BoundItem, CartItem, MultipleBoundItem, WeightedItem},
    pricing::{count_price, round_money},
    promotions::{Promotion, PromotionKey, Promotions},
    totals::{CartTotals, PricingSettings, TaxMap},
};
