//! Cart snapshot submitted at checkout.

use serde::{Deserialize, Serialize};

use tienda_core::{ProductId, Size};

use super::AddressInput;

/// One requested (product, size, quantity) entry.
///
/// Several lines may reference the same product, e.g. two sizes of one shirt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Size,
}

/// A checkout submission: the cart lines and where to deliver them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub lines: Vec<CartLine>,
    pub address: AddressInput,
}
