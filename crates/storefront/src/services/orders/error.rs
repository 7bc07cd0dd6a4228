//! Order service error types.

use serde::Serialize;
use thiserror::Error;

use tienda_core::{OrderId, ProductId};

use crate::db::RepositoryError;

/// Why an order could not be placed.
///
/// Every variant except [`PlaceOrderError::Persistence`] is a business
/// rejection the shopper can act on.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// No signed-in user.
    #[error("no user session")]
    Unauthenticated,

    /// The cart has no lines.
    #[error("the cart is empty")]
    EmptyCart,

    /// A required address field is blank.
    #[error("address field '{field}' is required")]
    InvalidAddress { field: &'static str },

    /// A line references a product missing from the catalog.
    #[error("product {product_id} does not exist")]
    ProductNotFound { product_id: ProductId },

    /// A line or aggregate quantity is zero or too large.
    #[error("invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: ProductId },

    /// Placing the order would take stock below zero.
    #[error("{product_title} does not have enough stock")]
    InsufficientStock { product_title: String },

    /// Storage failed mid-placement.
    #[error("could not save the order: {0}")]
    Persistence(#[from] RepositoryError),
}

impl PlaceOrderError {
    /// Machine-readable category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::EmptyCart => ErrorKind::EmptyCart,
            Self::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            Self::ProductNotFound { .. } => ErrorKind::ProductNotFound,
            Self::InvalidQuantity { .. } => ErrorKind::InvalidQuantity,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }

    /// Whether this is an infrastructure fault rather than a rejection.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Category reported as `reason` in a rejected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Unauthenticated,
    EmptyCart,
    InvalidAddress,
    ProductNotFound,
    InvalidQuantity,
    InsufficientStock,
    PersistenceFailure,
}

/// Errors from reading orders or recording payments.
#[derive(Debug, Error)]
pub enum OrderQueryError {
    /// No signed-in user.
    #[error("no user session")]
    Unauthenticated,

    /// The order does not exist.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The order belongs to someone else.
    #[error("order {0} belongs to another user")]
    Forbidden(OrderId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
