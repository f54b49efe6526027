//! Totals
//!
//! Per-tax-rate subtotals, taxes and totals for a selection of items.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::{
    context::CartContext,
    items::CartItem,
    pricing::{count_price, round_money},
};

/// Decimal places kept for aggregated weight.
pub const WEIGHT_DECIMALS: u32 = 6;

/// Amounts keyed by tax rate (percent).
pub type TaxMap = BTreeMap<Decimal, Decimal>;

/// Pricing settings a calculation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingSettings {
    /// Unit prices include tax
    pub prices_with_vat: bool,
    /// Decimal places for rounded amounts
    pub rounding_decimals: u32,
}

/// Totals for one filter.
///
/// For every rate present, `tax_totals[rate] == tax_bases[rate] + taxes[rate]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartTotals {
    subtotals: TaxMap,
    taxes: TaxMap,
    totals: TaxMap,
    weight: Decimal,
}

impl CartTotals {
    /// Calculate totals over `items`.
    pub fn calculate<'a, I>(items: I, context: &CartContext, settings: PricingSettings) -> Self
    where
        I: IntoIterator<Item = &'a dyn CartItem>,
    {
        let mut amounts = TaxMap::new();
        let mut weight = Decimal::ZERO;

        for item in items {
            let tax_rate = item.tax_rate(context);
            let price = count_price(
                item.unit_price(context),
                tax_rate,
                item.quantity(),
                settings.prices_with_vat,
                settings.rounding_decimals,
            );

            *amounts.entry(tax_rate).or_default() += price;

            if let Some(weighted) = item.as_weighted() {
                weight += weighted.weight() * item.quantity();
            }
        }

        let mut totals = CartTotals {
            weight: round_money(weight, WEIGHT_DECIMALS),
            ..CartTotals::default()
        };

        for (rate, amount) in amounts {
            let (subtotal, tax, total) = split_amount(amount, rate, settings);

            totals.subtotals.insert(rate, subtotal);
            totals.taxes.insert(rate, tax);
            totals.totals.insert(rate, total);
        }

        totals
    }

    /// Sum of tax bases across rates.
    pub fn subtotal(&self) -> Decimal {
        self.subtotals.values().sum()
    }

    /// Sum of totals across rates.
    pub fn total(&self) -> Decimal {
        self.totals.values().sum()
    }

    /// Sum of taxes across rates.
    pub fn tax_total(&self) -> Decimal {
        self.taxes.values().sum()
    }

    /// Aggregate weight, rounded to [`WEIGHT_DECIMALS`] places.
    pub fn weight(&self) -> Decimal {
        self.weight
    }

    /// Tax base (amount without tax) per rate.
    pub fn tax_bases(&self) -> &TaxMap {
        &self.subtotals
    }

    /// Tax per rate.
    pub fn taxes(&self) -> &TaxMap {
        &self.taxes
    }

    /// Amount with tax per rate.
    pub fn tax_totals(&self) -> &TaxMap {
        &self.totals
    }
}

/// Split an accumulated amount at `rate` into (subtotal, tax, total).
fn split_amount(
    amount: Decimal,
    rate: Decimal,
    settings: PricingSettings,
) -> (Decimal, Decimal, Decimal) {
    if settings.prices_with_vat {
        // Tax share of a gross amount: r / (100 + r). A rate of -100% has none.
        let share = rate
            .checked_div(Decimal::ONE_HUNDRED + rate)
            .unwrap_or_default();
        let tax = round_money(amount * share, settings.rounding_decimals);

        (amount - tax, tax, amount)
    } else {
        let tax = round_money(
            amount * rate / Decimal::ONE_HUNDRED,
            settings.rounding_decimals,
        );

        (amount, tax, amount + tax)
    }
}
