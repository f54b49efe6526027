//! Cart
//!
//! The cart owns its items, the bindings between them, a totals cache and the
//! promotions. Every mutation invalidates the cache and, unless it happens while
//! promotions are already being processed, runs the promotion pipeline once.

use std::{cell::RefCell, mem, rc::Rc};

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    bindings::BindingIndex,
    config::CartConfig,
    context::CartContext,
    filters::{FilterError, FilterKey, ItemFilter},
    items::{CartItem, declared_parents},
    pricing::count_price,
    promotions::{Promotion, PromotionKey, Promotions},
    totals::{CartTotals, PricingSettings, TaxMap},
};

/// Rounding precision of a default cart.
pub const DEFAULT_ROUNDING_DECIMALS: u32 = 2;

/// Errors raised by cart operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The referenced item is not in the cart.
    #[error("cart item {0:?} does not exist")]
    ItemNotFound(String),

    /// A bound item declares a parent that is not in the cart.
    #[error("item {item:?} is bound to {target:?}, which is not in the cart")]
    BindingTargetNotFound {
        /// Id of the bound item
        item: String,
        /// Id of the missing parent
        target: String,
    },

    /// Rounding decimals must not be negative.
    #[error("invalid value for rounding decimals: {0}")]
    InvalidRoundingDecimals(i32),

    /// The promotion set cannot change while promotions are being processed.
    #[error("promotions cannot be changed while they are being processed")]
    PromotionsLocked,

    /// A promotion hook failed.
    #[error("promotion failed: {0}")]
    Promotion(String),

    /// Invalid item filter.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl CartError {
    /// Whether the error refers to an item id missing from the cart.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CartError::ItemNotFound(_) | CartError::BindingTargetNotFound { .. }
        )
    }
}

/// Shopping cart.
#[derive(Debug)]
pub struct Cart {
    items: FxHashMap<String, Box<dyn CartItem>>,
    order: Vec<String>,
    bindings: BindingIndex,
    promotions: Promotions,
    context: CartContext,
    prices_with_vat: bool,
    rounding_decimals: u32,
    totals: RefCell<FxHashMap<FilterKey, Rc<CartTotals>>>,
    processing_enabled: bool,
    promotions_running: bool,
}

impl Cart {
    /// Create an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRoundingDecimals`] if `rounding_decimals` is negative.
    pub fn new(
        context: CartContext,
        prices_with_vat: bool,
        rounding_decimals: i32,
    ) -> Result<Self, CartError> {
        let rounding_decimals = validate_rounding_decimals(rounding_decimals)?;

        Ok(Self::with_settings(
            context,
            prices_with_vat,
            rounding_decimals,
        ))
    }

    fn with_settings(context: CartContext, prices_with_vat: bool, rounding_decimals: u32) -> Self {
        Self {
            items: FxHashMap::default(),
            order: Vec::new(),
            bindings: BindingIndex::new(),
            promotions: Promotions::new(),
            context,
            prices_with_vat,
            rounding_decimals,
            totals: RefCell::default(),
            processing_enabled: true,
            promotions_running: false,
        }
    }

    /// Create an empty cart from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRoundingDecimals`] if the configured decimals are negative.
    pub fn from_config(config: CartConfig, context: CartContext) -> Result<Self, CartError> {
        Self::new(context, config.prices_with_vat, config.rounding_decimals)
    }

    /// Context passed to items.
    pub fn context(&self) -> &CartContext {
        &self.context
    }

    /// Replace the context passed to items.
    ///
    /// # Errors
    ///
    /// Returns any error raised by promotion processing.
    pub fn set_context(&mut self, context: CartContext) -> Result<(), CartError> {
        self.context = context;

        self.settings_modified()
    }

    /// Whether unit prices include tax.
    pub fn prices_with_vat(&self) -> bool {
        self.prices_with_vat
    }

    /// Switch between gross (`true`) and net (`false`) pricing.
    ///
    /// # Errors
    ///
    /// Returns any error raised by promotion processing.
    pub fn set_prices_with_vat(&mut self, prices_with_vat: bool) -> Result<(), CartError> {
        self.prices_with_vat = prices_with_vat;

        debug!(prices_with_vat, "changed pricing mode");

        self.settings_modified()
    }

    /// Decimal places monetary amounts are rounded to.
    pub fn rounding_decimals(&self) -> u32 {
        self.rounding_decimals
    }

    /// Change the rounding precision.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRoundingDecimals`] if `rounding_decimals` is negative,
    /// or any error raised by promotion processing.
    pub fn set_rounding_decimals(&mut self, rounding_decimals: i32) -> Result<(), CartError> {
        self.rounding_decimals = validate_rounding_decimals(rounding_decimals)?;

        debug!(rounding_decimals, "changed rounding precision");

        self.settings_modified()
    }

    /// Registered promotions.
    pub fn promotions(&self) -> &Promotions {
        &self.promotions
    }

    /// Replace every promotion.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::PromotionsLocked`] when called from a promotion hook, or any
    /// error raised by promotion processing.
    pub fn set_promotions<I>(&mut self, promotions: I) -> Result<(), CartError>
    where
        I: IntoIterator<Item = Box<dyn Promotion>>,
    {
        self.ensure_promotions_unlocked()?;
        self.promotions = promotions.into_iter().collect();

        self.settings_modified()
    }

    /// Register a promotion after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::PromotionsLocked`] when called from a promotion hook, or any
    /// error raised by promotion processing.
    pub fn add_promotion(
        &mut self,
        promotion: Box<dyn Promotion>,
    ) -> Result<PromotionKey, CartError> {
        self.ensure_promotions_unlocked()?;
        let key = self.promotions.add(promotion);

        self.settings_modified()?;

        Ok(key)
    }

    /// Unregister a promotion.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::PromotionsLocked`] when called from a promotion hook, or any
    /// error raised by promotion processing.
    pub fn remove_promotion(
        &mut self,
        key: PromotionKey,
    ) -> Result<Option<Box<dyn Promotion>>, CartError> {
        self.ensure_promotions_unlocked()?;
        let removed = self.promotions.remove(key);

        if removed.is_some() {
            self.settings_modified()?;
        }

        Ok(removed)
    }

    /// Stable-sort items by the position of their type in `types`. Types not listed
    /// sort after every listed type, keeping their current relative order.
    pub fn sort_by_type<S: AsRef<str>>(&mut self, types: &[S]) {
        let items = &self.items;

        self.order.sort_by_key(|id| {
            items
                .get(id)
                .and_then(|item| types.iter().position(|t| t.as_ref() == item.item_type()))
                .unwrap_or(usize::MAX)
        });
    }

    /// Iterate over every item in cart order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn CartItem> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id).map(Box::as_ref))
    }

    /// Items selected by `filter`, in cart order.
    pub fn items(&self, filter: &ItemFilter) -> Vec<&dyn CartItem> {
        self.iter().filter(|item| filter.matches(*item)).collect()
    }

    /// Items selected by a type spec.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Filter`] if the type spec is malformed.
    pub fn items_by_type(&self, spec: &str) -> Result<Vec<&dyn CartItem>, CartError> {
        Ok(self.items(&ItemFilter::types(spec)?))
    }

    /// Number of items selected by `filter`.
    pub fn count_items(&self, filter: &ItemFilter) -> usize {
        self.iter().filter(|item| filter.matches(*item)).count()
    }

    /// Number of items selected by a type spec.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Filter`] if the type spec is malformed.
    pub fn count_items_by_type(&self, spec: &str) -> Result<usize, CartError> {
        Ok(self.count_items(&ItemFilter::types(spec)?))
    }

    /// Number of items in the cart.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if no item is selected by a type spec.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Filter`] if the type spec is malformed.
    pub fn is_empty_by_type(&self, spec: &str) -> Result<bool, CartError> {
        Ok(self.count_items_by_type(spec)? == 0)
    }

    /// Check if an item is in the cart.
    pub fn has_item(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Get an item by id.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the item is not in the cart.
    pub fn get_item(&self, id: &str) -> Result<&dyn CartItem, CartError> {
        self.items
            .get(id)
            .map(Box::as_ref)
            .ok_or_else(|| CartError::ItemNotFound(id.to_string()))
    }

    /// Bindings between items currently in the cart.
    pub fn bindings(&self) -> &BindingIndex {
        &self.bindings
    }

    /// Add `quantity` of an item.
    ///
    /// If an item with the same id is already in the cart, its quantity is increased
    /// instead and `item` is dropped. A bound item must be added after its parents; an
    /// item that follows its parent's quantity takes that quantity instead of `quantity`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::BindingTargetNotFound`] if a declared parent is not in the
    /// cart (the cart is left untouched), or any error raised by promotion processing.
    pub fn add_item<I: CartItem + 'static>(
        &mut self,
        item: I,
        quantity: Decimal,
    ) -> Result<(), CartError> {
        self.add_boxed_item(Box::new(item), quantity)
    }

    /// Add `quantity` of a boxed item. See [`Cart::add_item`].
    ///
    /// # Errors
    ///
    /// See [`Cart::add_item`].
    pub fn add_boxed_item(
        &mut self,
        mut item: Box<dyn CartItem>,
        quantity: Decimal,
    ) -> Result<(), CartError> {
        let id = item.id().to_string();

        if let Some(existing) = self.items.get(&id) {
            let merged = existing.quantity() + quantity;

            debug!(item = %id, %quantity, %merged, "merging cart item");

            return self.set_item_quantity(&id, merged);
        }

        let parents: Vec<String> = declared_parents(item.as_ref())
            .into_iter()
            .map(ToString::to_string)
            .collect();

        if let Some(missing) = parents
            .iter()
            .find(|parent| !self.items.contains_key(*parent))
        {
            return Err(CartError::BindingTargetNotFound {
                item: id,
                target: missing.clone(),
            });
        }

        let quantity = item
            .as_bound()
            .filter(|bound| bound.updates_quantity_automatically())
            .and_then(|bound| self.items.get(bound.bound_item_id()))
            .map_or(quantity, |parent| parent.quantity());

        for parent in &parents {
            self.bindings.bind(parent, &id);
        }

        item.set_quantity(quantity);

        debug!(item = %id, %quantity, "added cart item");

        self.order.push(id.clone());
        self.items.insert(id, item);

        self.cart_modified()
    }

    /// Replace the cart contents with `items`, each at its own reported quantity.
    ///
    /// Promotions run once, after every item has been added. Items are added in the
    /// given order, so bound items must follow their parents. On error the previous
    /// contents are restored.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while adding an item, or any error raised by
    /// promotion processing.
    pub fn set_items<I>(&mut self, items: I) -> Result<(), CartError>
    where
        I: IntoIterator<Item = Box<dyn CartItem>>,
    {
        let previous = (
            mem::take(&mut self.items),
            mem::take(&mut self.order),
            mem::take(&mut self.bindings),
        );

        let result = self.without_processing(|cart| {
            items.into_iter().try_for_each(|item| {
                let quantity = item.quantity();
                cart.add_boxed_item(item, quantity)
            })
        });

        if let Err(error) = result {
            (self.items, self.order, self.bindings) = previous;
            self.totals.get_mut().clear();

            return Err(error);
        }

        debug!(items = self.items.len(), "replaced cart items");

        self.cart_modified()
    }

    /// Set the quantity of an item. A quantity of zero or less removes it.
    ///
    /// Items bound to this one that follow its quantity are updated too. Setting the
    /// current quantity again changes nothing and does not run promotions.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the item is not in the cart, or any error
    /// raised by promotion processing.
    pub fn set_item_quantity(&mut self, id: &str, quantity: Decimal) -> Result<(), CartError> {
        if quantity <= Decimal::ZERO {
            return self.remove_item(id);
        }

        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| CartError::ItemNotFound(id.to_string()))?;

        if item.quantity() == quantity {
            return Ok(());
        }

        item.set_quantity(quantity);

        let followers: Vec<String> = self
            .bindings
            .dependents(id)
            .iter()
            .filter(|dependent| {
                self.items
                    .get(dependent.as_str())
                    .and_then(|item| item.as_bound())
                    .is_some_and(|bound| {
                        bound.bound_item_id() == id && bound.updates_quantity_automatically()
                    })
            })
            .cloned()
            .collect();

        for follower in &followers {
            if let Some(item) = self.items.get_mut(follower) {
                item.set_quantity(quantity);
            }
        }

        debug!(item = %id, %quantity, followers = followers.len(), "changed item quantity");

        self.cart_modified()
    }

    /// Remove an item together with every item bound to it.
    ///
    /// An item bound to several parents stays while any other of its parents is still
    /// in the cart, and remains registered against the parent that left.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the item is not in the cart, or any error
    /// raised by promotion processing.
    pub fn remove_item(&mut self, id: &str) -> Result<(), CartError> {
        if !self.items.contains_key(id) {
            return Err(CartError::ItemNotFound(id.to_string()));
        }

        let doomed = self.removal_set(id);

        // Survivors stay registered against removed parents they still declare.
        for removed in &doomed {
            if let Some(item) = self.items.remove(removed) {
                for parent in declared_parents(item.as_ref()) {
                    self.bindings.unbind(parent, removed);
                }
            }
        }

        self.order.retain(|item| !doomed.contains(item));

        debug!(item = %id, removed = doomed.len(), "removed cart item");

        self.cart_modified()
    }

    /// Remove every item.
    ///
    /// # Errors
    ///
    /// Returns any error raised by promotion processing.
    pub fn clear(&mut self) -> Result<(), CartError> {
        if self.items.is_empty() {
            return Ok(());
        }

        self.items.clear();
        self.order.clear();
        self.bindings.clear();

        debug!("cleared cart");

        self.cart_modified()
    }

    /// Price of an item at the cart's settings unless overridden.
    ///
    /// `quantity` defaults to the item's own quantity.
    pub fn item_price(
        &self,
        item: &dyn CartItem,
        quantity: Option<Decimal>,
        prices_with_vat: Option<bool>,
        rounding_decimals: Option<u32>,
    ) -> Decimal {
        self.count_price(
            item.unit_price(&self.context),
            item.tax_rate(&self.context),
            quantity.unwrap_or_else(|| item.quantity()),
            prices_with_vat,
            rounding_decimals,
        )
    }

    /// Price of `quantity` units at the cart's settings unless overridden.
    pub fn count_price(
        &self,
        unit_price: Decimal,
        tax_rate: Decimal,
        quantity: Decimal,
        prices_with_vat: Option<bool>,
        rounding_decimals: Option<u32>,
    ) -> Decimal {
        count_price(
            unit_price,
            tax_rate,
            quantity,
            prices_with_vat.unwrap_or(self.prices_with_vat),
            rounding_decimals.unwrap_or(self.rounding_decimals),
        )
    }

    /// Totals for the items selected by `filter`, memoised until the next mutation.
    pub fn totals(&self, filter: &ItemFilter) -> Rc<CartTotals> {
        let key = filter.cache_key();

        if let Some(totals) = self.totals.borrow().get(&key) {
            return Rc::clone(totals);
        }

        trace!(filter = ?key, "calculating totals");

        let totals = Rc::new(CartTotals::calculate(
            self.iter().filter(|item| filter.matches(*item)),
            &self.context,
            self.settings(),
        ));

        self.totals.borrow_mut().insert(key, Rc::clone(&totals));

        totals
    }

    /// Totals for the items selected by a type spec.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Filter`] if the type spec is malformed.
    pub fn totals_by_type(&self, spec: &str) -> Result<Rc<CartTotals>, CartError> {
        Ok(self.totals(&ItemFilter::types(spec)?))
    }

    /// Check if totals for `filter` are currently memoised.
    pub fn is_totals_cached(&self, filter: &ItemFilter) -> bool {
        self.totals.borrow().contains_key(&filter.cache_key())
    }

    /// Sum of tax bases.
    pub fn subtotal(&self, filter: &ItemFilter) -> Decimal {
        self.totals(filter).subtotal()
    }

    /// Sum of amounts including tax.
    pub fn total(&self, filter: &ItemFilter) -> Decimal {
        self.totals(filter).total()
    }

    /// Tax per rate.
    pub fn taxes(&self, filter: &ItemFilter) -> TaxMap {
        self.totals(filter).taxes().clone()
    }

    /// Tax base per rate.
    pub fn tax_bases(&self, filter: &ItemFilter) -> TaxMap {
        self.totals(filter).tax_bases().clone()
    }

    /// Amount including tax per rate.
    pub fn tax_totals(&self, filter: &ItemFilter) -> TaxMap {
        self.totals(filter).tax_totals().clone()
    }

    /// Aggregate weight.
    pub fn weight(&self, filter: &ItemFilter) -> Decimal {
        self.totals(filter).weight()
    }

    fn settings(&self) -> PricingSettings {
        PricingSettings {
            prices_with_vat: self.prices_with_vat,
            rounding_decimals: self.rounding_decimals,
        }
    }

    /// Every item that goes when `id` is removed, `id` included.
    fn removal_set(&self, id: &str) -> FxHashSet<String> {
        let mut doomed = FxHashSet::default();
        doomed.insert(id.to_string());

        // Grow until stable: a multi-bound item may only become removable once a
        // later parent joins the set. The set is bounded by the items, so cyclic
        // bindings terminate.
        loop {
            let mut grown = false;
            let parents: Vec<String> = doomed.iter().cloned().collect();

            for parent in &parents {
                for dependent in self.bindings.dependents(parent) {
                    if doomed.contains(dependent) {
                        continue;
                    }

                    let follows = self
                        .items
                        .get(dependent)
                        .is_some_and(|item| self.loses_every_parent(item.as_ref(), &doomed));

                    if follows {
                        doomed.insert(dependent.clone());
                        grown = true;
                    }
                }
            }

            if !grown {
                break doomed;
            }
        }
    }

    fn loses_every_parent(&self, item: &dyn CartItem, doomed: &FxHashSet<String>) -> bool {
        if let Some(bound) = item.as_bound()
            && doomed.contains(bound.bound_item_id())
        {
            return true;
        }

        item.as_multiple_bound().is_some_and(|multiple| {
            multiple
                .bound_item_ids()
                .iter()
                .all(|parent| doomed.contains(parent) || !self.items.contains_key(parent))
        })
    }

    fn ensure_promotions_unlocked(&self) -> Result<(), CartError> {
        if self.promotions_running {
            return Err(CartError::PromotionsLocked);
        }

        Ok(())
    }

    fn settings_modified(&mut self) -> Result<(), CartError> {
        if self.items.is_empty() {
            return Ok(());
        }

        self.cart_modified()
    }

    /// Run `f` with promotion processing suppressed, restoring the previous state after.
    fn without_processing<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CartError>,
    ) -> Result<T, CartError> {
        let previous = mem::replace(&mut self.processing_enabled, false);
        let result = f(self);

        self.processing_enabled = previous;

        result
    }

    fn cart_modified(&mut self) -> Result<(), CartError> {
        // Nested mutations still invalidate, so promotions read fresh totals mid-run.
        self.totals.get_mut().clear();

        if !self.processing_enabled {
            return Ok(());
        }

        self.without_processing(Self::process_promotions)
    }

    fn process_promotions(&mut self) -> Result<(), CartError> {
        if self.promotions.is_empty() {
            return Ok(());
        }

        let mut promotions = mem::take(&mut self.promotions);
        self.promotions_running = true;

        let result = promotions.run(self);

        self.promotions_running = false;
        self.promotions = promotions;

        result
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::with_settings(CartContext::new(), true, DEFAULT_ROUNDING_DECIMALS)
    }
}

fn validate_rounding_decimals(rounding_decimals: i32) -> Result<u32, CartError> {
    u32::try_from(rounding_decimals)
        .map_err(|_err| CartError::InvalidRoundingDecimals(rounding_decimals))
}
