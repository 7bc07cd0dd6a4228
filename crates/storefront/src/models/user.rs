//! Order owners and delivery countries.

use serde::{Deserialize, Serialize};

use tienda_core::{CountryId, UserId};

/// A storefront customer.
///
/// Sign-in is handled upstream; the storefront only needs a row that orders
/// can point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

/// A country addresses can be delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
}
