//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `country` - ISO 3166-1 alpha-2 codes referenced by delivery addresses
//! - `user` - Order owners (authentication happens elsewhere)
//! - `product` - Catalog with authoritative prices and stock levels
//! - `order` - Order headers with totals and payment state
//! - `order_item` - One row per cart line, with the unit price at placement
//! - `order_address` - Delivery address, one per order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tienda-cli -- migrate
//! ```
//!
//! # Stores
//!
//! The order placement service talks to [`Catalog`] and [`OrderStore`] rather
//! than to a pool directly. [`PgCatalog`]/[`PgOrderStore`] back them with
//! `PostgreSQL`; [`InMemoryStore`] implements both for tests and local runs.

pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tienda_core::{OrderId, ProductId, UserId};

use crate::config::PoolConfig;
use crate::models::{
    AddressInput, NewOrder, NewOrderItem, Order, OrderAddress, OrderDetails, OrderItem, Product,
    StockUpdate,
};

pub use memory::InMemoryStore;
pub use orders::{PgOrderStore, PgOrderTransaction};
pub use products::PgCatalog;
pub use users::{CountryRepository, UserRepository};

/// Embedded storefront migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unknown country).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify a sqlx error, turning foreign key and unique violations into
    /// [`RepositoryError::Conflict`].
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        let constraint = match &err {
            sqlx::Error::Database(db_err)
                if db_err.is_foreign_key_violation() || db_err.is_unique_violation() =>
            {
                Some(db_err.constraint().unwrap_or("unknown").to_owned())
            }
            _ => None,
        };
        constraint.map_or(Self::Database(err), Self::Conflict)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `pool` - Pool sizing from [`StorefrontConfig`](crate::config::StorefrontConfig)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    pool: &PoolConfig,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(pool.acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}

/// Read access to the product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch every product whose id is in `ids`, in one read.
    ///
    /// Unknown ids are simply absent from the result.
    async fn find_products_by_ids(&self, ids: &[ProductId])
    -> Result<Vec<Product>, RepositoryError>;

    /// One page of the catalog, newest first, plus the total product count.
    async fn list_products(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<Product>, u64), RepositoryError>;

    /// Look up a product by its URL slug.
    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError>;
}

/// Transactional order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Transaction handle returned by [`OrderStore::begin`].
    type Transaction: OrderTransaction;

    /// Start a transaction. Dropping it without [`OrderTransaction::commit`]
    /// discards every write made through it.
    async fn begin(&self) -> Result<Self::Transaction, RepositoryError>;

    /// Load an order with its items and address.
    async fn find_order(&self, id: OrderId) -> Result<Option<OrderDetails>, RepositoryError>;

    /// Orders placed by `user_id`, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Record the payment provider's transaction id.
    ///
    /// Returns [`RepositoryError::NotFound`] if the order does not exist.
    async fn set_transaction_id(
        &self,
        id: OrderId,
        transaction_id: &str,
    ) -> Result<Order, RepositoryError>;

    /// Flag the order as paid. Orders already paid keep their `paid_at`.
    ///
    /// Returns [`RepositoryError::NotFound`] if the order does not exist.
    async fn mark_paid(&self, id: OrderId) -> Result<Order, RepositoryError>;
}

/// Writes performed while placing a single order.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Atomically subtract `quantity` from the product's stock and return the
    /// new level. `None` means the product no longer exists.
    ///
    /// The resulting stock may be negative; callers must check and abort.
    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<StockUpdate>, RepositoryError>;

    /// Insert the order header.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Insert one row per cart line.
    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError>;

    /// Insert the delivery address for `order_id`.
    async fn insert_order_address(
        &mut self,
        order_id: OrderId,
        address: &AddressInput,
    ) -> Result<OrderAddress, RepositoryError>;

    /// Make every write in this transaction visible.
    async fn commit(self) -> Result<(), RepositoryError>;

    /// Discard every write in this transaction.
    async fn rollback(self) -> Result<(), RepositoryError>;
}
