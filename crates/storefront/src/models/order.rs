//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tienda_core::{Money, OrderId, OrderItemId, ProductId, Size, UserId};

use super::OrderAddress;

/// Header amounts shared by a cart summary and the order it becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Sum of line quantities, duplicates included.
    pub items_in_order: u32,
    pub sub_total: Money,
    pub tax: Money,
    pub total: Money,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items_in_order: u32,
    pub sub_total: Money,
    pub tax: Money,
    pub total: Money,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Order header about to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub totals: OrderTotals,
}

/// One ordered line, priced at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Size,
    /// Unit price snapshotted from the catalog.
    pub price: Money,
}

/// Order line about to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Size,
    pub price: Money,
}

/// An order with everything that was created alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub address: OrderAddress,
}
