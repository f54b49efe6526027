//! Pricing
//!
//! Per-line price computation. Rounding is applied to the unit amount before it is
//! multiplied by the quantity, never to the line total.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to `decimals` places, halves away from zero.
pub fn round_money(amount: Decimal, decimals: u32) -> Decimal {
    amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Add `tax_rate` percent on top of `amount`.
pub fn with_tax(amount: Decimal, tax_rate: Decimal) -> Decimal {
    amount * (Decimal::ONE + tax_rate / Decimal::ONE_HUNDRED)
}

/// Calculates the price of `quantity` units.
///
/// With `prices_with_vat` the unit price is grossed up by the tax rate before rounding;
/// otherwise the net unit price is rounded as is.
pub fn count_price(
    unit_price: Decimal,
    tax_rate: Decimal,
    quantity: Decimal,
    prices_with_vat: bool,
    rounding_decimals: u32,
) -> Decimal {
    let unit = if prices_with_vat {
        with_tax(unit_price, tax_rate)
    } else {
        unit_price
    };

    round_money(unit, rounding_decimals) * quantity
}
