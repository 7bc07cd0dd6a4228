//! Delivery address types.

use serde::{Deserialize, Serialize};

use tienda_core::{CountryId, OrderAddressId, OrderId};

/// Delivery address as entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub phone: String,
    pub country: CountryId,
}

impl AddressInput {
    /// Name of the first required field that is blank, if any.
    ///
    /// Field names match the JSON keys so they can be shown to the shopper.
    #[must_use]
    pub fn first_blank_field(&self) -> Option<&'static str> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("address", &self.address),
            ("postalCode", &self.postal_code),
            ("city", &self.city),
            ("phone", &self.phone),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }

    /// Second address line with blank input folded to `None`.
    #[must_use]
    pub fn address2(&self) -> Option<&str> {
        self.address2
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Delivery address persisted with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAddress {
    pub id: OrderAddressId,
    pub order_id: OrderId,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub address2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub phone: String,
    pub country_id: CountryId,
}

impl OrderAddress {
    /// Build the stored address for `order_id` from checkout input.
    #[must_use]
    pub fn from_input(id: OrderAddressId, order_id: OrderId, input: &AddressInput) -> Self {
        Self {
            id,
            order_id,
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            address: input.address.trim().to_owned(),
            address2: input.address2().map(str::to_owned),
            postal_code: input.postal_code.trim().to_owned(),
            city: input.city.trim().to_owned(),
            phone: input.phone.trim().to_owned(),
            country_id: input.country.clone(),
        }
    }
}
