//! Order service.
//!
//! Places orders from a cart snapshot and answers questions about placed
//! orders. Placement runs in one store transaction:
//!
//! 1. resolve the caller and validate the cart and address
//! 2. read every referenced product in one batch and price each line
//! 3. decrement stock per product (ascending id) and abort if any goes negative
//! 4. insert the order, its items and its address, then commit
//!
//! Any failure rolls the transaction back and comes back as
//! [`PlaceOrderOutcome::Rejected`].

mod error;
mod outcome;
pub mod pricing;

use std::collections::{BTreeMap, HashMap};

use tracing::{info, instrument, warn};

use tienda_core::{OrderId, ProductId, TaxRate, UserId};

use crate::db::{Catalog, OrderStore, OrderTransaction, RepositoryError};
use crate::models::{AddressInput, CartLine, NewOrder, Order, OrderDetails, Product};

pub use error::{ErrorKind, OrderQueryError, PlaceOrderError};
pub use outcome::{PlaceOrderOutcome, PlacedOrder, Rejection, StockLevel};
pub use pricing::{CartSummary, PricedCart};

use super::IdentityProvider;

/// Order placement and order queries over a catalog and an order store.
pub struct OrderService<C, S> {
    catalog: C,
    store: S,
    tax_rate: TaxRate,
}

impl<C: Catalog, S: OrderStore> OrderService<C, S> {
    /// Create a service charging the standard tax rate.
    #[must_use]
    pub const fn new(catalog: C, store: S) -> Self {
        Self {
            catalog,
            store,
            tax_rate: TaxRate::STANDARD,
        }
    }

    /// The order store this service writes to.
    pub const fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// Place an order for the caller.
    ///
    /// Never fails outright: every error, including storage faults, comes
    /// back as [`PlaceOrderOutcome::Rejected`] after the transaction has been
    /// rolled back. Storage faults are also reported to Sentry.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub async fn place_order<I>(
        &self,
        identity: &I,
        lines: &[CartLine],
        address: &AddressInput,
    ) -> PlaceOrderOutcome
    where
        I: IdentityProvider + Sync + ?Sized,
    {
        let result = self.try_place_order(identity, lines, address).await;

        match &result {
            Ok(placed) => info!(
                order_id = %placed.order.id,
                user_id = %placed.order.user_id,
                total = %placed.order.total,
                "Order placed"
            ),
            Err(err) if err.is_server_error() => {
                crate::error::capture_error(err, "Order placement failed");
            }
            Err(err @ PlaceOrderError::InsufficientStock { .. }) => {
                warn!(error = %err, "Order rejected");
            }
            Err(err) => info!(reason = ?err.kind(), error = %err, "Order rejected"),
        }

        result.into()
    }

    async fn try_place_order<I>(
        &self,
        identity: &I,
        lines: &[CartLine],
        address: &AddressInput,
    ) -> Result<PlacedOrder, PlaceOrderError>
    where
        I: IdentityProvider + Sync + ?Sized,
    {
        let user_id = identity
            .current_user_id()
            .ok_or(PlaceOrderError::Unauthenticated)?;
        crate::error::set_sentry_user(&user_id, None);
        let line_count = lines.len().to_string();
        crate::error::add_breadcrumb(
            "checkout",
            "Placing order",
            Some(&[("lines", line_count.as_str())]),
        );

        validate(lines, address)?;

        let quantities = pricing::aggregate_quantities(lines)?;
        let products = self.products_by_id(quantities.keys().copied()).await?;
        let priced = pricing::price_cart(lines, &products, self.tax_rate)?;

        let mut tx = self.store.begin().await?;
        match write_order(&mut tx, user_id, &quantities, &priced, address).await {
            Ok(placed) => {
                tx.commit().await?;
                Ok(placed)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Price a cart against the current catalog without placing it.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` for unknown products, `InvalidQuantity` for
    /// zero or overflowing quantities, or `Persistence` if the catalog read fails.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub async fn summarize(&self, lines: &[CartLine]) -> Result<CartSummary, PlaceOrderError> {
        if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
            return Err(PlaceOrderError::InvalidQuantity {
                product_id: line.product_id,
            });
        }
        let quantities = pricing::aggregate_quantities(lines)?;
        let products = self.products_by_id(quantities.keys().copied()).await?;
        pricing::summarize(lines, &products, self.tax_rate)
    }

    async fn products_by_id(
        &self,
        ids: impl Iterator<Item = ProductId>,
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        let ids: Vec<ProductId> = ids.collect();
        let products = self.catalog.find_products_by_ids(&ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Load one of the caller's orders with its items and address.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a signed-in user
    /// - `OrderNotFound` if the order does not exist
    /// - `Forbidden` if it belongs to someone else
    #[instrument(skip_all, fields(order_id = %order_id))]
    pub async fn get_order<I>(
        &self,
        identity: &I,
        order_id: OrderId,
    ) -> Result<OrderDetails, OrderQueryError>
    where
        I: IdentityProvider + Sync + ?Sized,
    {
        let user_id = identity
            .current_user_id()
            .ok_or(OrderQueryError::Unauthenticated)?;

        let details = self
            .store
            .find_order(order_id)
            .await
            .map_err(report)?
            .ok_or(OrderQueryError::OrderNotFound(order_id))?;

        if details.order.user_id != user_id {
            warn!(%user_id, "Order requested by another user");
            return Err(OrderQueryError::Forbidden(order_id));
        }

        Ok(details)
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a signed-in user, or `Repository` if
    /// the read fails.
    #[instrument(skip_all)]
    pub async fn list_orders<I>(&self, identity: &I) -> Result<Vec<Order>, OrderQueryError>
    where
        I: IdentityProvider + Sync + ?Sized,
    {
        let user_id: UserId = identity
            .current_user_id()
            .ok_or(OrderQueryError::Unauthenticated)?;
        Ok(self
            .store
            .list_orders_for_user(user_id)
            .await
            .map_err(report)?)
    }

    // =========================================================================
    // Payment recording
    // =========================================================================

    /// Record the payment provider's transaction id on an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order does not exist.
    #[instrument(skip_all, fields(order_id = %order_id))]
    pub async fn set_transaction_id(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<Order, OrderQueryError> {
        self.store
            .set_transaction_id(order_id, transaction_id)
            .await
            .map_err(|e| not_found_as(e, order_id))
    }

    /// Mark an order as paid. Calling it again keeps the first `paid_at`.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order does not exist.
    #[instrument(skip_all, fields(order_id = %order_id))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<Order, OrderQueryError> {
        let order = self
            .store
            .mark_paid(order_id)
            .await
            .map_err(|e| not_found_as(e, order_id))?;
        info!(paid_at = ?order.paid_at, "Order marked paid");
        Ok(order)
    }
}

/// Reject empty carts, zero quantities and incomplete addresses before any I/O.
fn validate(lines: &[CartLine], address: &AddressInput) -> Result<(), PlaceOrderError> {
    if lines.is_empty() {
        return Err(PlaceOrderError::EmptyCart);
    }
    if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
        return Err(PlaceOrderError::InvalidQuantity {
            product_id: line.product_id,
        });
    }
    if let Some(field) = address.first_blank_field() {
        return Err(PlaceOrderError::InvalidAddress { field });
    }
    Ok(())
}

/// The writes of one placement. The caller commits or rolls back.
async fn write_order<T: OrderTransaction>(
    tx: &mut T,
    user_id: UserId,
    quantities: &BTreeMap<ProductId, u32>,
    priced: &PricedCart,
    address: &AddressInput,
) -> Result<PlacedOrder, PlaceOrderError> {
    let mut updated_stock = Vec::with_capacity(quantities.len());

    for (&product_id, &quantity) in quantities {
        if quantity == 0 || i32::try_from(quantity).is_err() {
            return Err(PlaceOrderError::InvalidQuantity { product_id });
        }

        let update = tx
            .decrement_stock(product_id, quantity)
            .await?
            .ok_or(PlaceOrderError::ProductNotFound { product_id })?;

        if update.in_stock < 0 {
            return Err(PlaceOrderError::InsufficientStock {
                product_title: update.title,
            });
        }

        updated_stock.push(StockLevel {
            product_id,
            new_stock: update.in_stock,
        });
    }

    let order = tx
        .insert_order(&NewOrder {
            user_id,
            totals: priced.totals,
        })
        .await
        .map_err(|e| match e {
            // The user row is gone: the session outlived its account.
            RepositoryError::Conflict(_) => PlaceOrderError::Unauthenticated,
            other => PlaceOrderError::Persistence(other),
        })?;

    let items = tx.insert_order_items(order.id, &priced.items).await?;

    let address = tx
        .insert_order_address(order.id, address)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => PlaceOrderError::InvalidAddress { field: "country" },
            other => PlaceOrderError::Persistence(other),
        })?;

    Ok(PlacedOrder {
        order,
        items,
        address,
        updated_stock,
    })
}

fn report(err: RepositoryError) -> OrderQueryError {
    crate::error::capture_error(&err, "Order query failed");
    OrderQueryError::Repository(err)
}

fn not_found_as(err: RepositoryError, order_id: OrderId) -> OrderQueryError {
    match err {
        RepositoryError::NotFound => OrderQueryError::OrderNotFound(order_id),
        other => report(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use tienda_core::{CountryId, Money, Size};

    use super::*;
    use crate::db::InMemoryStore;

    fn product(title: &str, price_cents: i64, in_stock: i32) -> Product {
        Product {
            id: ProductId::generate(),
            title: title.to_owned(),
            slug: title.to_lowercase().replace(' ', "-"),
            description: String::new(),
            price: Money::from_cents(price_cents),
            in_stock,
            sizes: Size::ALL.to_vec(),
            created_at: Utc::now(),
        }
    }

    fn address() -> AddressInput {
        AddressInput {
            first_name: "Ana".to_owned(),
            last_name: "Lopez".to_owned(),
            address: "Calle 1".to_owned(),
            address2: None,
            postal_code: "10101".to_owned(),
            city: "San Jose".to_owned(),
            phone: "555".to_owned(),
            country: CountryId::parse("CR").unwrap(),
        }
    }

    fn line(product_id: ProductId, quantity: u32, size: Size) -> CartLine {
        CartLine {
            product_id,
            quantity,
            size,
        }
    }

    fn service(products: Vec<Product>) -> OrderService<InMemoryStore, InMemoryStore> {
        let store = InMemoryStore::new();
        store.add_country(CountryId::parse("CR").unwrap(), "Costa Rica");
        for p in products {
            store.add_product(p);
        }
        OrderService::new(store.clone(), store)
    }

    #[tokio::test]
    async fn test_worked_example() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);
        let user = Some(UserId::generate());

        let outcome = svc
            .place_order(
                &user,
                &[line(a.id, 2, Size::M), line(a.id, 1, Size::L)],
                &address(),
            )
            .await;

        let placed = outcome.placed().unwrap();
        assert_eq!(placed.order.sub_total, Money::from_cents(3_000));
        assert_eq!(placed.order.tax, Money::from_cents(450));
        assert_eq!(placed.order.total, Money::from_cents(3_450));
        assert_eq!(placed.order.items_in_order, 3);
        assert!(!placed.order.is_paid);
        assert_eq!(placed.items.len(), 2);
        assert_eq!(
            placed.updated_stock,
            vec![StockLevel {
                product_id: a.id,
                new_stock: 7
            }]
        );
        assert_eq!(svc.store().stock_of(a.id), Some(7));
    }

    #[tokio::test]
    async fn test_unauthenticated_touches_nothing() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);

        let outcome = svc
            .place_order(&None::<UserId>, &[line(a.id, 1, Size::M)], &address())
            .await;

        assert_eq!(
            outcome.rejection().unwrap().reason,
            ErrorKind::Unauthenticated
        );
        assert_eq!(svc.store().catalog_reads(), 0);
        assert_eq!(svc.store().stock_of(a.id), Some(10));
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back() {
        let a = product("Kids Tee", 500, 5);
        let b = product("Hoodie", 3_000, 10);
        let svc = service(vec![a.clone(), b.clone()]);
        let user = Some(UserId::generate());

        let outcome = svc
            .place_order(
                &user,
                &[line(b.id, 2, Size::L), line(a.id, 6, Size::S)],
                &address(),
            )
            .await;

        let rejection = outcome.rejection().unwrap();
        assert_eq!(rejection.reason, ErrorKind::InsufficientStock);
        assert!(rejection.message.contains("Kids Tee"));
        assert_eq!(svc.store().stock_of(a.id), Some(5));
        assert_eq!(svc.store().stock_of(b.id), Some(10));
        assert_eq!(svc.store().order_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_rejected_before_writes() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);
        let missing = ProductId::generate();

        let outcome = svc
            .place_order(
                &Some(UserId::generate()),
                &[line(a.id, 1, Size::M), line(missing, 1, Size::M)],
                &address(),
            )
            .await;

        assert_eq!(
            outcome.rejection().unwrap().reason,
            ErrorKind::ProductNotFound
        );
        assert_eq!(svc.store().stock_of(a.id), Some(10));
        assert_eq!(svc.store().transactions_started(), 0);
    }

    #[tokio::test]
    async fn test_input_validation() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);
        let user = Some(UserId::generate());

        let empty = svc.place_order(&user, &[], &address()).await;
        assert_eq!(empty.rejection().unwrap().reason, ErrorKind::EmptyCart);

        let zero = svc
            .place_order(&user, &[line(a.id, 0, Size::M)], &address())
            .await;
        assert_eq!(zero.rejection().unwrap().reason, ErrorKind::InvalidQuantity);

        let mut incomplete = address();
        incomplete.last_name = " ".to_owned();
        let blank = svc
            .place_order(&user, &[line(a.id, 1, Size::M)], &incomplete)
            .await;
        let rejection = blank.rejection().unwrap();
        assert_eq!(rejection.reason, ErrorKind::InvalidAddress);
        assert!(rejection.message.contains("lastName"));

        assert_eq!(svc.store().catalog_reads(), 0);
    }

    #[tokio::test]
    async fn test_unknown_country_is_invalid_address() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);
        let mut elsewhere = address();
        elsewhere.country = CountryId::parse("ZZ").unwrap();

        let outcome = svc
            .place_order(
                &Some(UserId::generate()),
                &[line(a.id, 1, Size::M)],
                &elsewhere,
            )
            .await;

        assert_eq!(
            outcome.rejection().unwrap().reason,
            ErrorKind::InvalidAddress
        );
        assert_eq!(svc.store().stock_of(a.id), Some(10));
        assert_eq!(svc.store().order_count(), 0);
    }

    #[tokio::test]
    async fn test_orders_are_private_to_their_owner() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);
        let owner = UserId::generate();
        let stranger = UserId::generate();

        let outcome = svc
            .place_order(&owner, &[line(a.id, 1, Size::M)], &address())
            .await;
        let order_id = outcome.placed().unwrap().order.id;

        let details = svc.get_order(&owner, order_id).await.unwrap();
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.address.country_id.as_str(), "CR");

        assert!(matches!(
            svc.get_order(&stranger, order_id).await,
            Err(OrderQueryError::Forbidden(_))
        ));
        assert!(matches!(
            svc.get_order(&None::<UserId>, order_id).await,
            Err(OrderQueryError::Unauthenticated)
        ));
        assert!(matches!(
            svc.get_order(&owner, OrderId::generate()).await,
            Err(OrderQueryError::OrderNotFound(_))
        ));

        assert_eq!(svc.list_orders(&owner).await.unwrap().len(), 1);
        assert!(svc.list_orders(&stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_recording() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);
        let user = UserId::generate();
        let order_id = svc
            .place_order(&user, &[line(a.id, 1, Size::M)], &address())
            .await
            .placed()
            .unwrap()
            .order
            .id;

        let order = svc.set_transaction_id(order_id, "PAYPAL-123").await.unwrap();
        assert_eq!(order.transaction_id.as_deref(), Some("PAYPAL-123"));
        assert!(!order.is_paid);

        let paid = svc.mark_paid(order_id).await.unwrap();
        assert!(paid.is_paid);
        let again = svc.mark_paid(order_id).await.unwrap();
        assert_eq!(again.paid_at, paid.paid_at);

        assert!(matches!(
            svc.mark_paid(OrderId::generate()).await,
            Err(OrderQueryError::OrderNotFound(_))
        ));
        assert_eq!(pricing::payment_amount(&paid), "11.50");
    }

    #[tokio::test]
    async fn test_summarize_uses_catalog_prices() {
        let a = product("Classic Tee", 1_000, 10);
        let svc = service(vec![a.clone()]);

        let summary = svc
            .summarize(&[line(a.id, 2, Size::M), line(a.id, 1, Size::L)])
            .await
            .unwrap();

        assert_eq!(summary.items_in_cart, 3);
        assert_eq!(summary.total, Money::from_cents(3_450));
        assert_eq!(svc.store().stock_of(a.id), Some(10));
    }
}
