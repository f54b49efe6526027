//! Trolley
//!
//! Trolley is a shopping cart domain model: tax-aware totals with gross and net pricing,
//! bindings between dependent items, and a pipeline of pluggable promotions that run
//! whenever the cart changes.

pub mod bindings;
pub mod cart;
pub mod config;
pub mod context;
pub mod filters;
pub mod fixtures;
pub mod items;
pub mod prelude;
pub mod pricing;
pub mod promotions;
pub mod totals;
