//! Order commands.
//!
//! `place` reads a checkout file shaped like the storefront's checkout
//! request:
//!
//! ```json
//! {
//!   "lines": [{ "productId": "…", "quantity": 2, "size": "M" }],
//!   "address": {
//!     "firstName": "Ana", "lastName": "Mora", "address": "Calle 1",
//!     "postalCode": "10101", "city": "San José", "phone": "555-0100",
//!     "country": "CR"
//!   }
//! }
//! ```
//!
//! and prints the placement outcome as JSON. A rejected placement exits
//! non-zero.

use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;

use tienda_core::{OrderId, UserId};
use tienda_storefront::config::StorefrontConfig;
use tienda_storefront::db::{PgCatalog, PgOrderStore};
use tienda_storefront::models::{CartLine, PlaceOrderRequest};
use tienda_storefront::services::OrderService;

use super::{CommandError, connect, print_json};

type PgOrderService = OrderService<PgCatalog, PgOrderStore>;

fn order_service(pool: PgPool) -> PgOrderService {
    OrderService::new(PgCatalog::new(pool.clone()), PgOrderStore::new(pool))
}

/// A cart file for `summary`: a full checkout or just its lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CartFile {
    Checkout(PlaceOrderRequest),
    Lines(Vec<CartLine>),
}

impl CartFile {
    fn lines(&self) -> &[CartLine] {
        match self {
            Self::Checkout(request) => &request.lines,
            Self::Lines(lines) => lines,
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Place an order for `user` from a checkout file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the database is unreachable,
/// or the placement is rejected.
pub async fn place(config: &StorefrontConfig, user: UserId, cart: &Path) -> Result<(), CommandError> {
    let request: PlaceOrderRequest = read_json(cart).await?;
    let service = order_service(connect(config).await?);

    let outcome = service
        .place_order(&user, &request.lines, &request.address)
        .await;
    print_json(&outcome)?;

    match outcome.rejection() {
        Some(rejection) => Err(CommandError::Rejected(rejection.message.clone())),
        None => Ok(()),
    }
}

/// Print the priced summary of a cart without placing it.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the cart cannot be priced.
pub async fn summary(config: &StorefrontConfig, cart: &Path) -> Result<(), CommandError> {
    let cart: CartFile = read_json(cart).await?;
    let service = order_service(connect(config).await?);

    let summary = service.summarize(cart.lines()).await?;
    print_json(&summary)
}

/// Print one of `user`'s orders with its items and address.
///
/// # Errors
///
/// Returns an error if the order does not exist or belongs to another user.
pub async fn show(
    config: &StorefrontConfig,
    user: UserId,
    order_id: OrderId,
) -> Result<(), CommandError> {
    let service = order_service(connect(config).await?);

    let details = service.get_order(&user, order_id).await?;
    print_json(&details)
}

/// Print `user`'s orders, newest first.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list(config: &StorefrontConfig, user: UserId) -> Result<(), CommandError> {
    let service = order_service(connect(config).await?);

    let orders = service.list_orders(&user).await?;
    print_json(&orders)
}

/// Record a payment: store the transaction id, then mark the order paid.
///
/// # Errors
///
/// Returns an error if the order does not exist.
pub async fn pay(
    config: &StorefrontConfig,
    order_id: OrderId,
    transaction_id: &str,
) -> Result<(), CommandError> {
    let service = order_service(connect(config).await?);

    service.set_transaction_id(order_id, transaction_id).await?;
    let order = service.mark_paid(order_id).await?;
    print_json(&order)
}
