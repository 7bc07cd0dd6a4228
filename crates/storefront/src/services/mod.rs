//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `identity` - Resolving who is placing or reading an order
//! - `orders` - Order placement, order queries and payment recording
//! - `products` - Catalog browsing

pub mod identity;
pub mod orders;
pub mod products;

pub use identity::IdentityProvider;
pub use orders::{OrderQueryError, OrderService, PlaceOrderError, PlaceOrderOutcome};
pub use products::ProductService;
