//! Placement when the order store fails part-way through a transaction.
//!
//! Run with: cargo test -p tienda-integration-tests --test storage_faults

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;

use tienda_core::{OrderId, ProductId, Size, UserId};
use tienda_integration_tests::{address, line, memory_shop, product, shopper};
use tienda_storefront::db::memory::InMemoryTransaction;
use tienda_storefront::db::{InMemoryStore, OrderStore, OrderTransaction, RepositoryError};
use tienda_storefront::models::{
    AddressInput, NewOrder, NewOrderItem, Order, OrderAddress, OrderDetails, OrderItem,
    StockUpdate,
};
use tienda_storefront::services::OrderService;
use tienda_storefront::services::orders::ErrorKind;

/// Which write the store refuses.
#[derive(Debug, Clone, Copy)]
enum Fault {
    /// The connection drops while order items are written.
    ItemsUnavailable,
    /// The order's user row no longer exists.
    UnknownUser,
}

/// An [`InMemoryStore`] whose transactions fail at one write.
#[derive(Debug, Clone)]
struct FaultyStore {
    inner: InMemoryStore,
    fault: Fault,
}

struct FaultyTransaction {
    inner: InMemoryTransaction,
    fault: Fault,
}

#[async_trait]
impl OrderStore for FaultyStore {
    type Transaction = FaultyTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        Ok(FaultyTransaction {
            inner: self.inner.begin().await?,
            fault: self.fault,
        })
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<OrderDetails>, RepositoryError> {
        self.inner.find_order(id).await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.inner.list_orders_for_user(user_id).await
    }

    async fn set_transaction_id(
        &self,
        id: OrderId,
        transaction_id: &str,
    ) -> Result<Order, RepositoryError> {
        self.inner.set_transaction_id(id, transaction_id).await
    }

    async fn mark_paid(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.inner.mark_paid(id).await
    }
}

#[async_trait]
impl OrderTransaction for FaultyTransaction {
    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<StockUpdate>, RepositoryError> {
        self.inner.decrement_stock(product_id, quantity).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        if matches!(self.fault, Fault::UnknownUser) {
            return Err(RepositoryError::Conflict("order_user_id_fkey".to_owned()));
        }
        self.inner.insert_order(order).await
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        if matches!(self.fault, Fault::ItemsUnavailable) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.insert_order_items(order_id, items).await
    }

    async fn insert_order_address(
        &mut self,
        order_id: OrderId,
        address: &AddressInput,
    ) -> Result<OrderAddress, RepositoryError> {
        self.inner.insert_order_address(order_id, address).await
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.inner.rollback().await
    }
}

fn faulty_service(
    store: &InMemoryStore,
    fault: Fault,
) -> OrderService<InMemoryStore, FaultyStore> {
    OrderService::new(
        store.clone(),
        FaultyStore {
            inner: store.clone(),
            fault,
        },
    )
}

#[tokio::test]
async fn test_storage_failure_rolls_back_and_hides_details() {
    let tee = product("Classic Tee", 1_000, 10);
    let cap = product("Cap", 500, 4);
    let (store, _) = memory_shop(&[tee.clone(), cap.clone()]);
    let service = faulty_service(&store, Fault::ItemsUnavailable);

    let outcome = service
        .place_order(
            &shopper(),
            &[line(&tee, 2, Size::M), line(&cap, 1, Size::S)],
            &address(),
        )
        .await;

    let rejection = outcome.rejection().unwrap();
    assert_eq!(rejection.reason, ErrorKind::PersistenceFailure);
    assert_eq!(rejection.message, "the order could not be saved");
    assert_eq!(store.stock_of(tee.id), Some(10));
    assert_eq!(store.stock_of(cap.id), Some(4));
    assert_eq!(store.order_count(), 0);

    let body = serde_json::to_value(&outcome).unwrap();
    assert_eq!(body["ok"], false);
    assert!(!body["message"].as_str().unwrap().contains("pool"));
}

#[tokio::test]
async fn test_store_usable_after_storage_failure() {
    let tee = product("Classic Tee", 1_000, 10);
    let (store, service) = memory_shop(&[tee.clone()]);
    let failing = faulty_service(&store, Fault::ItemsUnavailable);

    let failed = failing
        .place_order(&shopper(), &[line(&tee, 3, Size::M)], &address())
        .await;
    assert!(!failed.is_ok());

    let placed = service
        .place_order(&shopper(), &[line(&tee, 3, Size::M)], &address())
        .await;
    assert!(placed.is_ok());
    assert_eq!(store.stock_of(tee.id), Some(7));
    assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn test_missing_user_row_is_unauthenticated() {
    let tee = product("Classic Tee", 1_000, 10);
    let (store, _) = memory_shop(&[tee.clone()]);
    let service = faulty_service(&store, Fault::UnknownUser);

    let outcome = service
        .place_order(&shopper(), &[line(&tee, 1, Size::M)], &address())
        .await;

    assert_eq!(
        outcome.rejection().unwrap().reason,
        ErrorKind::Unauthenticated
    );
    assert_eq!(store.stock_of(tee.id), Some(10));
    assert_eq!(store.order_count(), 0);
}
