//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tienda_core::{Money, ProductId, Size};

/// A catalog product.
///
/// `price` is the authoritative unit price; checkout never trusts a price
/// supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    /// Units on hand. Never negative once a placement commits.
    pub in_stock: i32,
    /// Sizes this product is offered in.
    pub sizes: Vec<Size>,
    pub created_at: DateTime<Utc>,
}

/// Stock level of a product right after a decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub product_id: ProductId,
    pub title: String,
    /// May be negative before the placement is validated.
    pub in_stock: i32,
}
