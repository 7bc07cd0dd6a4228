//! In-memory implementation of [`Catalog`] and [`OrderStore`].
//!
//! Useful for testing and local development. Transactions are serialized by
//! an async gate held for the transaction's lifetime. A transaction records
//! its own writes and applies only those to the shared state on commit, so
//! products and countries added while it is open are kept.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use tienda_core::{CountryId, OrderAddressId, OrderId, OrderItemId, ProductId, UserId};

use super::{Catalog, OrderStore, OrderTransaction, RepositoryError};
use crate::models::{
    AddressInput, NewOrder, NewOrderItem, Order, OrderAddress, OrderDetails, OrderItem, Product,
    StockUpdate,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    countries: HashMap<CountryId, String>,
    /// Insertion order, oldest first.
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    addresses: HashMap<OrderId, OrderAddress>,
}

impl State {
    fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == id)
    }
}

/// Store backed by process memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    gate: Arc<AsyncMutex<()>>,
    catalog_reads: Arc<AtomicUsize>,
    transactions_started: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a product.
    pub fn add_product(&self, product: Product) {
        self.state().products.insert(product.id, product);
    }

    /// Add a deliverable country.
    pub fn add_country(&self, id: CountryId, name: &str) {
        self.state().countries.insert(id, name.to_owned());
    }

    /// Committed stock level of a product.
    #[must_use]
    pub fn stock_of(&self, id: ProductId) -> Option<i32> {
        self.state().products.get(&id).map(|p| p.in_stock)
    }

    /// Number of committed orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    /// Number of batch product reads served so far.
    #[must_use]
    pub fn catalog_reads(&self) -> usize {
        self.catalog_reads.load(Ordering::SeqCst)
    }

    /// Number of transactions begun so far.
    #[must_use]
    pub fn transactions_started(&self) -> usize {
        self.transactions_started.load(Ordering::SeqCst)
    }

    fn details(state: &State, id: OrderId) -> Option<OrderDetails> {
        let order = state.orders.iter().find(|o| o.id == id)?.clone();
        let address = state.addresses.get(&id)?.clone();
        let items = state
            .items
            .iter()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect();
        Some(OrderDetails {
            order,
            items,
            address,
        })
    }

    /// Apply `f` to a committed order while holding the transaction gate.
    async fn update_order<F>(&self, id: OrderId, f: F) -> Result<Order, RepositoryError>
    where
        F: FnOnce(&mut Order) + Send,
    {
        let _gate = self.gate.lock().await;
        let mut state = self.state();
        let order = state.order_mut(id).ok_or(RepositoryError::NotFound)?;
        f(order);
        Ok(order.clone())
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn find_products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        self.catalog_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn list_products(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let state = self.state();
        let mut products: Vec<&Product> = state.products.values().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = u64::try_from(products.len()).unwrap_or(u64::MAX);
        let page = products
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .state()
            .products
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        let gate = Arc::clone(&self.gate).lock_owned().await;
        self.transactions_started.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryTransaction {
            shared: Arc::clone(&self.state),
            pending: Pending::default(),
            _gate: gate,
        })
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<OrderDetails>, RepositoryError> {
        Ok(Self::details(&self.state(), id))
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .state()
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_transaction_id(
        &self,
        id: OrderId,
        transaction_id: &str,
    ) -> Result<Order, RepositoryError> {
        let transaction_id = transaction_id.to_owned();
        self.update_order(id, move |order| {
            order.transaction_id = Some(transaction_id);
        })
        .await
    }

    async fn mark_paid(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.update_order(id, |order| {
            if !order.is_paid {
                order.is_paid = true;
                order.paid_at = Some(Utc::now());
            }
        })
        .await
    }
}

/// Writes made by an open transaction.
#[derive(Debug, Default)]
struct Pending {
    stock_taken: HashMap<ProductId, i32>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    addresses: HashMap<OrderId, OrderAddress>,
}

/// A transaction on an [`InMemoryStore`].
///
/// Holds the store's gate until committed or dropped. Reads see committed
/// state overlaid with this transaction's own writes.
#[derive(Debug)]
pub struct InMemoryTransaction {
    shared: Arc<Mutex<State>>,
    pending: Pending,
    _gate: OwnedMutexGuard<()>,
}

impl InMemoryTransaction {
    fn shared(&self) -> MutexGuard<'_, State> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<StockUpdate>, RepositoryError> {
        let Some((title, committed)) = self
            .shared()
            .products
            .get(&product_id)
            .map(|p| (p.title.clone(), p.in_stock))
        else {
            return Ok(None);
        };
        let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
        let taken = self.pending.stock_taken.entry(product_id).or_default();
        *taken = taken.saturating_add(quantity);
        Ok(Some(StockUpdate {
            product_id,
            title,
            in_stock: committed.saturating_sub(*taken),
        }))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let order = Order {
            id: OrderId::generate(),
            user_id: order.user_id,
            items_in_order: order.totals.items_in_order,
            sub_total: order.totals.sub_total,
            tax: order.totals.tax,
            total: order.totals.total,
            is_paid: false,
            paid_at: None,
            transaction_id: None,
            created_at: Utc::now(),
        };
        self.pending.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let exists = self.pending.orders.iter().any(|o| o.id == order_id)
            || self.shared().orders.iter().any(|o| o.id == order_id);
        if !exists {
            return Err(RepositoryError::Conflict("order_item_order_id_fkey".to_owned()));
        }
        let rows: Vec<OrderItem> = items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::generate(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                size: item.size,
                price: item.price,
            })
            .collect();
        self.pending.items.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn insert_order_address(
        &mut self,
        order_id: OrderId,
        address: &AddressInput,
    ) -> Result<OrderAddress, RepositoryError> {
        let (known_country, taken) = {
            let shared = self.shared();
            (
                shared.countries.contains_key(&address.country),
                shared.addresses.contains_key(&order_id),
            )
        };
        if !known_country {
            return Err(RepositoryError::Conflict(
                "order_address_country_id_fkey".to_owned(),
            ));
        }
        if taken || self.pending.addresses.contains_key(&order_id) {
            return Err(RepositoryError::Conflict(
                "order_address_order_id_key".to_owned(),
            ));
        }
        let row = OrderAddress::from_input(OrderAddressId::generate(), order_id, address);
        self.pending.addresses.insert(order_id, row.clone());
        Ok(row)
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let Pending {
            stock_taken,
            orders,
            items,
            addresses,
        } = self.pending;
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        for (id, taken) in stock_taken {
            if let Some(product) = shared.products.get_mut(&id) {
                product.in_stock = product.in_stock.saturating_sub(taken);
            }
        }
        shared.orders.extend(orders);
        shared.items.extend(items);
        shared.addresses.extend(addresses);
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
