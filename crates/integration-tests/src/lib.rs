//! Integration tests for Tienda.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory store tests
//! cargo test -p tienda-integration-tests
//!
//! # PostgreSQL tests (needs a migrated database)
//! STOREFRONT_DATABASE_URL=postgres://... cargo test -p tienda-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_placement` - Placement properties against the in-memory store
//! - `postgres_orders` - The same flow against `PostgreSQL`
//! - `storage_faults` - Placement when the order store fails mid-transaction
//!
//! This library holds the fixtures both suites share.

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::Utc;
use secrecy::SecretString;
use sqlx::PgPool;

use tienda_core::{CountryId, Money, ProductId, Size, UserId};
use tienda_storefront::config::PoolConfig;
use tienda_storefront::db::{self, InMemoryStore};
use tienda_storefront::models::{AddressInput, CartLine, Product};
use tienda_storefront::services::OrderService;

/// Country every fixture address delivers to.
pub const COUNTRY: &str = "CR";

/// Order service wired to a single in-memory store.
pub type MemoryOrderService = OrderService<InMemoryStore, InMemoryStore>;

/// A product offered in every size, with a unique slug.
#[must_use]
pub fn product(title: &str, price_cents: i64, in_stock: i32) -> Product {
    Product {
        id: ProductId::generate(),
        title: title.to_owned(),
        slug: format!("{}-{}", title.to_lowercase().replace(' ', "-"), ProductId::generate()),
        description: format!("{title} for integration tests"),
        price: Money::from_cents(price_cents),
        in_stock,
        sizes: Size::ALL.to_vec(),
        created_at: Utc::now(),
    }
}

/// A cart line for `product`.
#[must_use]
pub const fn line(product: &Product, quantity: u32, size: Size) -> CartLine {
    CartLine {
        product_id: product.id,
        quantity,
        size,
    }
}

/// A complete delivery address in `country`.
///
/// # Panics
///
/// Panics if `country` is not a two-letter code.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn address_in(country: &str) -> AddressInput {
    AddressInput {
        first_name: "Ana".to_owned(),
        last_name: "Mora".to_owned(),
        address: "Avenida Central 100".to_owned(),
        address2: Some("Apt 4".to_owned()),
        postal_code: "10101".to_owned(),
        city: "San Jose".to_owned(),
        phone: "+506 8888 0000".to_owned(),
        country: CountryId::parse(country).unwrap(),
    }
}

/// A complete delivery address in [`COUNTRY`].
#[must_use]
pub fn address() -> AddressInput {
    address_in(COUNTRY)
}

/// An in-memory store holding `products` that delivers to [`COUNTRY`],
/// and an order service over it.
#[must_use]
pub fn memory_shop(products: &[Product]) -> (InMemoryStore, MemoryOrderService) {
    let store = InMemoryStore::new();
    store.add_country(address().country, "Costa Rica");
    for product in products {
        store.add_product(product.clone());
    }
    let service = OrderService::new(store.clone(), store.clone());
    (store, service)
}

/// A fresh signed-in user.
#[must_use]
pub fn shopper() -> Option<UserId> {
    Some(UserId::generate())
}

/// Connect to the test database named by `STOREFRONT_DATABASE_URL` and run
/// migrations.
///
/// # Panics
///
/// Panics if the variable is unset, the database is unreachable, or a
/// migration fails.
pub async fn pg_pool() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .expect("STOREFRONT_DATABASE_URL must be set for PostgreSQL tests");
    let pool = db::create_pool(&SecretString::from(url), &PoolConfig::default())
        .await
        .expect("Failed to connect to test database");
    db::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
