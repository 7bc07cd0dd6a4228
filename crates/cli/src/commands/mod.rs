//! CLI command implementations.

pub mod migrate;
pub mod orders;
pub mod products;
pub mod seed;

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use tienda_storefront::config::StorefrontConfig;
use tienda_storefront::db::{self, RepositoryError};
use tienda_storefront::services::{OrderQueryError, PlaceOrderError};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    InvalidSeed(usize),

    #[error(transparent)]
    Order(#[from] OrderQueryError),

    #[error(transparent)]
    Pricing(#[from] PlaceOrderError),

    #[error("Order rejected: {0}")]
    Rejected(String),
}

/// Open a connection pool using the configured database URL.
async fn connect(config: &StorefrontConfig) -> Result<PgPool, CommandError> {
    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&config.database_url, &config.pool).await?;
    Ok(pool)
}

/// Write `value` to stdout as pretty JSON.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CommandError> {
    let json = serde_json::to_string_pretty(value)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
