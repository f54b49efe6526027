//! Integration tests for cart mutation, bindings and totals.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use testresult::TestResult;

use trolley::{
    cart::{Cart, CartError},
    context::CartContext,
    filters::{FilterError, ItemFilter},
    fixtures::{
        Fixture,
        items::{FixtureItem, PRICE_LIST_KEY},
    },
    items::CartItem,
};

fn product(id: &str, unit_price: Decimal, tax_rate: Decimal) -> FixtureItem {
    FixtureItem::new(id, "product", unit_price, tax_rate)
}

/// A: 2 x 1.00 at 10%, B: 1 x 0.825 at 20%.
fn scenario_cart() -> Result<Cart, CartError> {
    let mut cart = Cart::default();

    cart.add_item(product("A", dec!(1), dec!(10)), dec!(2))?;
    cart.add_item(product("B", dec!(0.825), dec!(20)), dec!(1))?;

    Ok(cart)
}

fn ids(items: &[&dyn CartItem]) -> Vec<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}

#[test]
fn adding_existing_id_merges_quantity() -> TestResult {
    let mut cart = Cart::default();

    cart.add_item(product("A", dec!(1), dec!(10)), dec!(2))?;
    cart.add_item(product("A", dec!(99), dec!(0)), dec!(2))?;

    let item = cart.get_item("A")?;

    assert_eq!(cart.len(), 1);
    assert_eq!(item.quantity(), dec!(4));
    assert_eq!(
        item.unit_price(cart.context()),
        dec!(1),
        "stored item is kept"
    );

    Ok(())
}

#[test]
fn gross_scenario_totals() -> TestResult {
    let cart = scenario_cart()?;
    let all = ItemFilter::all();

    assert_eq!(cart.subtotal(&all), dec!(2.82));
    assert_eq!(cart.total(&all), dec!(3.19));

    let taxes = cart.taxes(&all);

    assert_eq!(taxes.get(&dec!(10)), Some(&dec!(0.20)));
    assert_eq!(taxes.get(&dec!(20)), Some(&dec!(0.17)));

    Ok(())
}

#[test]
fn switching_to_net_reinterprets_unit_prices() -> TestResult {
    let mut cart = scenario_cart()?;
    let all = ItemFilter::all();

    cart.total(&all);
    cart.set_prices_with_vat(false)?;

    assert!(!cart.is_totals_cached(&all));
    assert_eq!(cart.subtotal(&all), dec!(2.83));
    assert_eq!(cart.total(&all), dec!(3.20));
    assert_eq!(cart.tax_totals(&all).get(&dec!(20)), Some(&dec!(1.00)));

    Ok(())
}

#[test]
fn rounding_precision_applies_to_unit_prices() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.set_rounding_decimals(1)?;

    // A: 1.1 x 2, B: 0.99 -> 1.0
    assert_eq!(cart.total(&ItemFilter::all()), dec!(3.2));

    Ok(())
}

#[test]
fn type_filters_select_by_item_type() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.add_item(FixtureItem::new("T", "test", dec!(1), dec!(0)), dec!(1))?;

    assert_eq!(
        cart.totals_by_type("product,nonexistent,test")?.total(),
        dec!(4.19)
    );
    assert_eq!(cart.totals_by_type("~test")?.total(), dec!(3.19));
    assert_eq!(cart.totals_by_type("test")?.total(), dec!(1.00));
    assert_eq!(cart.totals_by_type("~")?.total(), dec!(4.19));

    assert_eq!(ids(&cart.items_by_type("~product")?), ["T"]);
    assert_eq!(cart.count_items_by_type("product")?, 2);
    assert!(cart.is_empty_by_type("service")?);

    Ok(())
}

#[test]
fn malformed_type_spec_is_rejected() -> TestResult {
    let cart = scenario_cart()?;

    let result = cart.totals_by_type("product,~test");

    assert_eq!(
        result.err(),
        Some(CartError::Filter(FilterError::Malformed(
            "product,~test".to_string()
        )))
    );

    Ok(())
}

#[test]
fn predicate_filters_are_cached_by_key() -> TestResult {
    let cart = scenario_cart()?;
    let low_rate = ItemFilter::predicate("low-rate", |item| {
        item.tax_rate(&CartContext::new()) < dec!(15)
    });

    assert_eq!(cart.total(&low_rate), dec!(2.20));
    assert!(cart.is_totals_cached(&low_rate));
    assert!(!cart.is_totals_cached(&ItemFilter::all()));

    Ok(())
}

#[test]
fn weight_counts_weighted_items_only() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.add_item(
        FixtureItem::new("W", "weighted", dec!(2), dec!(0)).with_weight(dec!(0.5)),
        dec!(3),
    )?;

    assert_eq!(cart.weight(&ItemFilter::all()), dec!(1.5));
    assert_eq!(cart.weight(&ItemFilter::types("product")?), Decimal::ZERO);

    Ok(())
}

#[test]
fn set_items_replaces_contents_at_reported_quantities() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.set_items([
        Box::new(product("A", dec!(1), dec!(10)).with_quantity(dec!(3))) as Box<dyn CartItem>,
        Box::new(product("B", dec!(0.825), dec!(20))),
    ])?;

    assert_eq!(cart.get_item("A")?.quantity(), dec!(3));
    assert_eq!(cart.total(&ItemFilter::all()), dec!(4.29));

    Ok(())
}

#[test]
fn set_items_failure_restores_previous_contents() -> TestResult {
    let mut cart = scenario_cart()?;

    let result = cart.set_items([
        Box::new(product("C", dec!(2), dec!(0))) as Box<dyn CartItem>,
        Box::new(FixtureItem::new("W", "warranty", dec!(1), dec!(0)).bound_to("Z", false)),
    ]);

    assert!(result.is_err_and(|error| error.is_not_found()));
    assert!(!cart.has_item("C"));
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.total(&ItemFilter::all()), dec!(3.19));

    Ok(())
}

#[test]
fn zero_quantity_removes_item() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.set_item_quantity("B", Decimal::ZERO)?;

    assert!(!cart.has_item("B"));
    assert_eq!(
        cart.set_item_quantity("B", dec!(1)),
        Err(CartError::ItemNotFound("B".to_string()))
    );

    Ok(())
}

#[test]
fn removing_parent_cascades_to_bound_items() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.add_item(
        FixtureItem::new("W", "warranty", dec!(5), dec!(20)).bound_to("A", false),
        dec!(1),
    )?;
    cart.add_item(
        FixtureItem::new("X", "extension", dec!(1), dec!(20)).bound_to("W", false),
        dec!(1),
    )?;

    assert_eq!(cart.bindings().dependents("A"), ["W"]);

    cart.remove_item("A")?;

    assert!(!cart.has_item("W"));
    assert!(!cart.has_item("X"));
    assert!(cart.has_item("B"));
    assert!(cart.bindings().is_empty());

    Ok(())
}

#[test]
fn multi_bound_item_survives_until_last_parent_goes() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.add_item(
        FixtureItem::new("M", "bundle", dec!(1), dec!(0)).bound_to_many(["A", "B"]),
        dec!(1),
    )?;

    assert!(cart.bindings().is_bound("A"));
    assert!(cart.bindings().is_bound("B"));

    cart.remove_item("A")?;

    assert!(cart.has_item("M"));
    assert_eq!(cart.bindings().dependents("A"), ["M"]);
    assert_eq!(cart.bindings().dependents("B"), ["M"]);

    cart.remove_item("B")?;

    assert!(!cart.has_item("M"));
    assert!(cart.is_empty());
    assert!(cart.bindings().is_empty());

    Ok(())
}

#[test]
fn re_added_parent_still_cascades_to_multi_bound_item() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.add_item(
        FixtureItem::new("X", "bundle", dec!(1), dec!(0)).bound_to_many(["A", "B"]),
        dec!(1),
    )?;

    cart.remove_item("A")?;
    cart.add_item(product("A", dec!(1), dec!(10)), dec!(1))?;
    cart.remove_item("B")?;

    assert!(cart.has_item("X"));
    assert_eq!(cart.bindings().dependents("A"), ["X"]);

    cart.remove_item("A")?;

    assert!(!cart.has_item("X"));
    assert!(cart.is_empty());
    assert!(cart.bindings().is_empty());

    Ok(())
}

#[test]
fn merging_into_synced_item_adds_to_its_quantity() -> TestResult {
    fn warranty() -> FixtureItem {
        FixtureItem::new("W", "warranty", dec!(5), dec!(20)).bound_to("A", true)
    }

    let mut cart = scenario_cart()?;

    cart.add_item(warranty(), dec!(1))?;
    cart.add_item(warranty(), dec!(1))?;

    assert_eq!(cart.get_item("W")?.quantity(), dec!(3));

    cart.set_item_quantity("A", dec!(4))?;

    assert_eq!(cart.get_item("W")?.quantity(), dec!(4));

    Ok(())
}

#[test]
fn removing_bound_item_unregisters_its_bindings() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.add_item(
        FixtureItem::new("M", "bundle", dec!(1), dec!(0)).bound_to_many(["A", "B"]),
        dec!(1),
    )?;

    cart.remove_item("M")?;

    assert!(cart.has_item("A"));
    assert!(cart.has_item("B"));
    assert!(cart.bindings().is_empty());

    Ok(())
}

#[test]
fn synced_items_follow_parent_quantity() -> TestResult {
    let mut cart = scenario_cart()?;

    cart.add_item(
        FixtureItem::new("W", "warranty", dec!(5), dec!(20)).bound_to("A", true),
        dec!(7),
    )?;
    cart.add_item(
        FixtureItem::new("N", "note", dec!(0), dec!(0)).bound_to("A", false),
        dec!(1),
    )?;

    assert_eq!(cart.get_item("W")?.quantity(), dec!(2));

    cart.set_item_quantity("A", dec!(5))?;

    assert_eq!(cart.get_item("W")?.quantity(), dec!(5));
    assert_eq!(cart.get_item("N")?.quantity(), dec!(1));

    Ok(())
}

#[test]
fn sort_by_type_is_stable_and_puts_unlisted_types_last() -> TestResult {
    let mut cart = Cart::default();

    for (id, item_type) in [
        ("novel", "book"),
        ("bread", "food"),
        ("laptop", "electronics"),
        ("wine", "alcohol"),
        ("cheese", "food"),
        ("lamp", "furniture"),
    ] {
        cart.add_item(FixtureItem::new(id, item_type, dec!(1), dec!(0)), dec!(1))?;
    }

    let all = ItemFilter::all();
    let total = cart.total(&all);

    cart.sort_by_type(&["food", "alcohol", "book"]);

    assert_eq!(
        ids(&cart.items(&all)),
        ["bread", "cheese", "wine", "novel", "laptop", "lamp"]
    );
    assert!(cart.is_totals_cached(&all));
    assert_eq!(cart.total(&all), total);

    Ok(())
}

#[test]
fn context_reaches_item_prices() -> TestResult {
    let mut cart = Cart::default();

    cart.add_item(
        product("A", dec!(10), dec!(20)).with_price_list("staff", dec!(8)),
        dec!(1),
    )?;

    assert_eq!(cart.total(&ItemFilter::all()), dec!(12.00));

    cart.set_context(CartContext::new().with(PRICE_LIST_KEY, "staff"))?;

    assert_eq!(cart.total(&ItemFilter::all()), dec!(9.60));

    Ok(())
}

#[test]
fn clear_on_empty_cart_keeps_cache() -> TestResult {
    let mut cart = Cart::default();
    let all = ItemFilter::all();

    cart.total(&all);
    cart.clear()?;

    assert!(cart.is_totals_cached(&all));

    Ok(())
}

#[test]
fn electronics_fixture_totals_and_cascades() -> TestResult {
    let fixture = Fixture::from_set("electronics")?;
    let mut cart = fixture.cart()?;
    let all = ItemFilter::all();

    assert_eq!(cart.len(), 5);
    assert_eq!(cart.get_item("tv-warranty")?.quantity(), dec!(1));
    assert_eq!(cart.total(&all), dec!(1157.00));
    assert_eq!(cart.taxes(&all).get(&dec!(20)), Some(&dec!(192.00)));
    assert_eq!(cart.subtotal(&all), dec!(965.00));
    assert_eq!(cart.weight(&all), dec!(19));

    cart.set_context(CartContext::new().with(PRICE_LIST_KEY, "staff"))?;

    assert_eq!(cart.total(&all), dec!(1061.00));

    cart.remove_item("tv")?;

    assert!(!cart.has_item("tv-warranty"));
    assert!(cart.has_item("bundle-cable"));

    cart.remove_item("console")?;

    assert_eq!(ids(&cart.items(&all)), ["delivery"]);
    assert_eq!(cart.total(&all), dec!(5.00));
    assert!(cart.bindings().is_empty());

    Ok(())
}
