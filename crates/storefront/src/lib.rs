//! Tienda Storefront library.
//!
//! Catalog browsing, checkout pricing and the order placement transaction.
//! HTTP routing and page rendering live outside this crate; callers hand in
//! a resolved identity, a cart snapshot and a delivery address.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
