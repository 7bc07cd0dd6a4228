//! Core types for Tienda.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod country;
pub mod id;
pub mod money;
pub mod size;

pub use country::{CountryId, CountryIdError};
pub use id::*;
pub use money::{Money, MoneyError, TaxRate};
pub use size::{Size, SizeError};
