//! Domain models for the storefront.
//!
//! These are validated domain objects; database row types live next to the
//! queries in [`crate::db`].

pub mod address;
pub mod cart;
pub mod order;
pub mod page;
pub mod product;
pub mod user;

pub use address::{AddressInput, OrderAddress};
pub use cart::{CartLine, PlaceOrderRequest};
pub use order::{NewOrder, NewOrderItem, Order, OrderDetails, OrderItem, OrderTotals};
pub use page::Page;
pub use product::{Product, StockUpdate};
pub use user::{Country, User};
