//! Seed the storefront database from a YAML file.
//!
//! The file lists delivery countries, users and catalog products. Rows are
//! upserted by id, so re-running a seed file updates it in place.
//!
//! ```yaml
//! countries:
//!   - id: CR
//!     name: Costa Rica
//! users:
//!   - id: 0b7c3f4e-5a59-4d5c-9a0f-2c1f1a6e8d01
//!     email: ana@example.com
//!     name: Ana Mora
//! products:
//!   - id: 6f1d0c9e-3b0a-4e43-8d4b-7a1c2e9f5b10
//!     title: Classic Tee
//!     price: "10.00"
//!     in_stock: 25
//!     sizes: [S, M, L]
//! ```
//!
//! Prices are strings so they are read as exact decimals.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use tienda_core::{Money, ProductId, Size};
use tienda_storefront::config::StorefrontConfig;
use tienda_storefront::db::{CountryRepository, PgCatalog, UserRepository};
use tienda_storefront::models::{Country, Product, User};

use super::{CommandError, connect};

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub countries: Vec<Country>,
    pub users: Vec<User>,
    pub products: Vec<ProductSeed>,
}

/// A catalog product as written in a seed file.
#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub id: ProductId,
    pub title: String,
    /// Derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub in_stock: i32,
    #[serde(default)]
    pub sizes: Vec<Size>,
}

impl ProductSeed {
    fn slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| slugify(&self.title))
    }

    fn to_product(&self) -> Product {
        Product {
            id: self.id,
            title: self.title.trim().to_owned(),
            slug: self.slug(),
            description: self.description.clone(),
            price: self.price,
            in_stock: self.in_stock,
            sizes: self.sizes.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to `-`.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Check a seed file for problems the database would reject or that would
/// produce an unusable catalog.
#[must_use]
pub fn validate_seed(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    let mut country_ids = HashSet::new();
    for country in &seed.countries {
        if !country_ids.insert(country.id.as_str()) {
            errors.push(format!("duplicate country {}", country.id));
        }
        if country.name.trim().is_empty() {
            errors.push(format!("country {} has no name", country.id));
        }
    }

    let mut emails = HashSet::new();
    for user in &seed.users {
        if !user.email.contains('@') {
            errors.push(format!("user {} has invalid email '{}'", user.id, user.email));
        }
        if !emails.insert(user.email.to_lowercase()) {
            errors.push(format!("duplicate email {}", user.email));
        }
    }

    let mut product_ids = HashSet::new();
    let mut slugs = HashSet::new();
    for product in &seed.products {
        if !product_ids.insert(product.id) {
            errors.push(format!("duplicate product id {}", product.id));
        }
        if product.title.trim().is_empty() {
            errors.push(format!("product {} has no title", product.id));
        }
        let slug = product.slug();
        if slug.is_empty() {
            errors.push(format!("product {} has an empty slug", product.id));
        } else if !slugs.insert(slug.clone()) {
            errors.push(format!("duplicate slug {slug}"));
        }
        if product.price < Money::ZERO {
            errors.push(format!("product {} has a negative price", product.id));
        }
        if product.in_stock < 0 {
            errors.push(format!("product {} has negative stock", product.id));
        }
    }

    errors
}

/// Read, parse and validate a seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or fails validation.
pub async fn load(path: &Path) -> Result<SeedFile, CommandError> {
    info!(path = %path.display(), "Loading seed file");

    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::InvalidSeed(errors.len()));
    }

    info!(
        countries = seed.countries.len(),
        users = seed.users.len(),
        products = seed.products.len(),
        "Seed file validated successfully"
    );
    Ok(seed)
}

/// Upsert every row of `seed`.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn apply(config: &StorefrontConfig, seed: &SeedFile) -> Result<(), CommandError> {
    let pool = connect(config).await?;

    let countries = CountryRepository::new(&pool);
    for country in &seed.countries {
        countries.upsert(country).await?;
    }

    let users = UserRepository::new(&pool);
    for user in &seed.users {
        users.upsert(user).await?;
    }

    let catalog = PgCatalog::new(pool.clone());
    for product in &seed.products {
        catalog.upsert_product(&product.to_product()).await?;
    }

    info!("Seeding complete!");
    info!("  Countries: {}", seed.countries.len());
    info!("  Users: {}", seed.users.len());
    info!("  Products: {}", seed.products.len());
    Ok(())
}
