//! Result of a placement attempt, as handed back to the caller.

use serde::Serialize;

use tienda_core::ProductId;

use super::{ErrorKind, PlaceOrderError};
use crate::models::{Order, OrderAddress, OrderItem};

/// New stock level of a product touched by a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: ProductId,
    pub new_stock: i32,
}

/// Everything a successful placement created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order: Order,
    #[serde(skip)]
    pub items: Vec<OrderItem>,
    pub address: OrderAddress,
    pub updated_stock: Vec<StockLevel>,
}

/// Why a placement was turned down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub reason: ErrorKind,
    pub message: String,
}

impl From<&PlaceOrderError> for Rejection {
    fn from(err: &PlaceOrderError) -> Self {
        let message = match err {
            // Storage details stay in logs and Sentry.
            PlaceOrderError::Persistence(_) => "the order could not be saved".to_owned(),
            other => other.to_string(),
        };
        Self {
            reason: err.kind(),
            message,
        }
    }
}

/// Outcome of [`OrderService::place_order`](super::OrderService::place_order).
///
/// Serializes as `{"ok": true, "order": .., "address": .., "updatedStock": ..}`
/// or `{"ok": false, "reason": .., "message": ..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrderOutcome {
    Placed(PlacedOrder),
    Rejected(Rejection),
}

impl PlaceOrderOutcome {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Placed(_))
    }

    /// The placed order, if any.
    #[must_use]
    pub const fn placed(&self) -> Option<&PlacedOrder> {
        match self {
            Self::Placed(placed) => Some(placed),
            Self::Rejected(_) => None,
        }
    }

    /// The rejection, if any.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Placed(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

impl From<Result<PlacedOrder, PlaceOrderError>> for PlaceOrderOutcome {
    fn from(result: Result<PlacedOrder, PlaceOrderError>) -> Self {
        match result {
            Ok(placed) => Self::Placed(placed),
            Err(err) => Self::Rejected(Rejection::from(&err)),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    ok: bool,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for PlaceOrderOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Placed(placed) => Envelope {
                ok: true,
                body: placed,
            }
            .serialize(serializer),
            Self::Rejected(rejection) => Envelope {
                ok: false,
                body: rejection,
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::RepositoryError;

    #[test]
    fn test_rejection_json() {
        let outcome = PlaceOrderOutcome::from(Err::<PlacedOrder, _>(
            PlaceOrderError::InsufficientStock {
                product_title: "Kids Tee".to_owned(),
            },
        ));
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["reason"], "InsufficientStock");
        assert_eq!(json["message"], "Kids Tee does not have enough stock");
    }

    #[test]
    fn test_persistence_message_hides_cause() {
        let rejection = Rejection::from(&PlaceOrderError::Persistence(
            RepositoryError::DataCorruption("price 1.234".to_owned()),
        ));
        assert_eq!(rejection.reason, ErrorKind::PersistenceFailure);
        assert!(!rejection.message.contains("1.234"));
    }
}
