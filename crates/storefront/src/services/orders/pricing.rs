//! Server-side pricing of a cart snapshot.
//!
//! Prices always come from the catalog. Amounts are integer cents; tax is
//! computed once on the subtotal and rounded half away from zero.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use tienda_core::{Money, ProductId, TaxRate};

use super::PlaceOrderError;
use crate::models::{CartLine, NewOrderItem, Order, OrderTotals, Product};

/// A cart priced against the catalog, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    /// One entry per input line, in input order.
    pub items: Vec<NewOrderItem>,
    pub totals: OrderTotals,
}

/// The checkout page's order summary panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items_in_cart: u32,
    pub sub_total: Money,
    pub tax: Money,
    pub total: Money,
}

impl From<OrderTotals> for CartSummary {
    fn from(totals: OrderTotals) -> Self {
        Self {
            items_in_cart: totals.items_in_order,
            sub_total: totals.sub_total,
            tax: totals.tax,
            total: totals.total,
        }
    }
}

/// Total units requested per product, keyed in ascending id order.
///
/// # Errors
///
/// Returns [`PlaceOrderError::InvalidQuantity`] if a product's total does not
/// fit in a `u32`.
pub fn aggregate_quantities(lines: &[CartLine]) -> Result<BTreeMap<ProductId, u32>, PlaceOrderError> {
    let mut totals = BTreeMap::new();
    for line in lines {
        let entry = totals.entry(line.product_id).or_insert(0_u32);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or(PlaceOrderError::InvalidQuantity {
                product_id: line.product_id,
            })?;
    }
    Ok(totals)
}

/// Price every line with its product's catalog price.
///
/// # Errors
///
/// - [`PlaceOrderError::ProductNotFound`] if a line's product is not in `products`
/// - [`PlaceOrderError::InvalidQuantity`] if an amount overflows
pub fn price_cart(
    lines: &[CartLine],
    products: &HashMap<ProductId, Product>,
    tax_rate: TaxRate,
) -> Result<PricedCart, PlaceOrderError> {
    let mut items = Vec::with_capacity(lines.len());
    let mut items_in_order = 0_u32;
    let mut sub_total = Money::ZERO;

    for line in lines {
        let product_id = line.product_id;
        let product = products
            .get(&product_id)
            .ok_or(PlaceOrderError::ProductNotFound { product_id })?;
        let overflow = || PlaceOrderError::InvalidQuantity { product_id };

        let line_total = product.price.checked_mul(line.quantity).ok_or_else(overflow)?;
        sub_total = sub_total.checked_add(line_total).ok_or_else(overflow)?;
        items_in_order = items_in_order
            .checked_add(line.quantity)
            .ok_or_else(overflow)?;

        items.push(NewOrderItem {
            product_id,
            quantity: line.quantity,
            size: line.size,
            price: product.price,
        });
    }

    // Tax and total can only overflow once there is at least one line.
    let totals = totals_for(items_in_order, sub_total, tax_rate).ok_or_else(|| {
        lines
            .last()
            .map_or(PlaceOrderError::EmptyCart, |l| PlaceOrderError::InvalidQuantity {
                product_id: l.product_id,
            })
    })?;

    Ok(PricedCart { items, totals })
}

/// Summarize a cart for display before checkout.
///
/// # Errors
///
/// Same as [`price_cart`].
pub fn summarize(
    lines: &[CartLine],
    products: &HashMap<ProductId, Product>,
    tax_rate: TaxRate,
) -> Result<CartSummary, PlaceOrderError> {
    price_cart(lines, products, tax_rate).map(|priced| priced.totals.into())
}

/// Order total formatted for a payment provider's amount field (`"34.50"`).
#[must_use]
pub fn payment_amount(order: &Order) -> String {
    order.total.to_string()
}

fn totals_for(items_in_order: u32, sub_total: Money, tax_rate: TaxRate) -> Option<OrderTotals> {
    let tax = tax_rate.tax_on(sub_total).ok()?;
    let total = sub_total.checked_add(tax)?;
    Some(OrderTotals {
        items_in_order,
        sub_total,
        tax,
        total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use tienda_core::Size;

    use super::*;

    fn product(price_cents: i64) -> Product {
        Product {
            id: ProductId::generate(),
            title: "Classic Tee".to_owned(),
            slug: "classic-tee".to_owned(),
            description: String::new(),
            price: Money::from_cents(price_cents),
            in_stock: 10,
            sizes: vec![Size::M, Size::L],
            created_at: Utc::now(),
        }
    }

    fn line(product_id: ProductId, quantity: u32, size: Size) -> CartLine {
        CartLine {
            product_id,
            quantity,
            size,
        }
    }

    fn catalog(products: &[Product]) -> HashMap<ProductId, Product> {
        products.iter().map(|p| (p.id, p.clone())).collect()
    }

    #[test]
    fn test_aggregate_sums_duplicate_products() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        let lines = [line(a, 2, Size::M), line(b, 1, Size::S), line(a, 1, Size::L)];

        let totals = aggregate_quantities(&lines).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&a], 3);
        assert_eq!(totals[&b], 1);
    }

    #[test]
    fn test_aggregate_is_ordered_by_id() {
        let ids: Vec<ProductId> = (0..5).map(|_| ProductId::generate()).collect();
        let lines: Vec<CartLine> = ids.iter().map(|id| line(*id, 1, Size::M)).collect();

        let keys: Vec<ProductId> = aggregate_quantities(&lines).unwrap().into_keys().collect();
        let mut sorted = ids;
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_aggregate_overflow() {
        let a = ProductId::generate();
        let err = aggregate_quantities(&[line(a, u32::MAX, Size::M), line(a, 1, Size::L)]);
        assert!(matches!(err, Err(PlaceOrderError::InvalidQuantity { product_id }) if product_id == a));
    }

    #[test]
    fn test_price_cart_worked_example() {
        let a = product(1_000);
        let lines = [line(a.id, 2, Size::M), line(a.id, 1, Size::L)];

        let priced = price_cart(&lines, &catalog(&[a]), TaxRate::STANDARD).unwrap();

        assert_eq!(priced.items.len(), 2);
        assert!(priced.items.iter().all(|i| i.price == Money::from_cents(1_000)));
        assert_eq!(priced.totals.items_in_order, 3);
        assert_eq!(priced.totals.sub_total, Money::from_cents(3_000));
        assert_eq!(priced.totals.tax, Money::from_cents(450));
        assert_eq!(priced.totals.total, Money::from_cents(3_450));
    }

    #[test]
    fn test_price_cart_unknown_product() {
        let a = product(1_000);
        let missing = ProductId::generate();
        let lines = [line(a.id, 1, Size::M), line(missing, 1, Size::M)];

        let err = price_cart(&lines, &catalog(&[a]), TaxRate::STANDARD).unwrap_err();
        assert!(matches!(err, PlaceOrderError::ProductNotFound { product_id } if product_id == missing));
    }

    #[test]
    fn test_total_matches_subtotal_plus_fifteen_percent() {
        let a = product(1_999);
        let b = product(333);
        let lines = [line(a.id, 3, Size::M), line(b.id, 7, Size::XS)];

        let totals = price_cart(&lines, &catalog(&[a, b]), TaxRate::STANDARD)
            .unwrap()
            .totals;

        // 59.97 + 23.31 = 83.28; tax 12.492 -> 12.49
        assert_eq!(totals.sub_total.cents(), 8_328);
        assert_eq!(totals.tax.cents(), 1_249);
        assert_eq!(totals.total.cents(), 9_577);
        let exact_total = i128::from(totals.sub_total.cents()) * 115;
        assert!((i128::from(totals.total.cents()) * 100 - exact_total).abs() <= 50);
    }

    #[test]
    fn test_price_overflow_is_invalid_quantity() {
        let a = product(i64::MAX / 2);
        let err = price_cart(&[line(a.id, 3, Size::M)], &catalog(&[a]), TaxRate::STANDARD);
        assert!(matches!(err, Err(PlaceOrderError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let a = product(1_000);
        let summary = summarize(&[line(a.id, 1, Size::M)], &catalog(&[a]), TaxRate::STANDARD).unwrap();
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["itemsInCart"], 1);
        assert_eq!(json["subTotal"], "10.00");
        assert_eq!(json["tax"], "1.50");
        assert_eq!(json["total"], "11.50");
    }
}
