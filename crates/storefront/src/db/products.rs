//! Product catalog queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use tienda_core::{Money, ProductId, Size};

use super::{Catalog, RepositoryError};
use crate::models::Product;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    slug: String,
    description: String,
    price: Decimal,
    in_stock: i32,
    sizes: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Money::from_decimal(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        let sizes = row
            .sizes
            .iter()
            .map(|s| s.parse::<Size>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
            })?;

        Ok(Self {
            id: ProductId::new(row.id),
            title: row.title,
            slug: row.slug,
            description: row.description,
            price,
            in_stock: row.in_stock,
            sizes,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL`-backed product catalog.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Create a catalog over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product, or overwrite the one with the same id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken by another product.
    #[instrument(skip_all, fields(slug = %product.slug))]
    pub async fn upsert_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let sizes: Vec<&str> = product.sizes.iter().map(|s| s.as_str()).collect();

        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO storefront.product
                (id, title, slug, description, price, in_stock, sizes)
            VALUES ($1, $2, $3, $4, $5, $6, $7::text[]::storefront.size[])
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                slug = EXCLUDED.slug,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                in_stock = EXCLUDED.in_stock,
                sizes = EXCLUDED.sizes,
                updated_at = now()
            RETURNING id, title, slug, description, price, in_stock,
                      sizes::text[] AS sizes, created_at
            ",
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.to_decimal())
        .bind(product.in_stock)
        .bind(&sizes)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Product::try_from(row)
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    #[instrument(skip_all, fields(count = ids.len()))]
    async fn find_products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, slug, description, price, in_stock,
                   sizes::text[] AS sizes, created_at
            FROM storefront.product
            WHERE id = ANY($1)
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn list_products(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.product")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, slug, description, price, in_stock,
                   sizes::text[] AS sizes, created_at
            FROM storefront.product
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let total = u64::try_from(total)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count {total}")))?;

        Ok((products, total))
    }

    #[instrument(skip(self))]
    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, slug, description, price, in_stock,
                   sizes::text[] AS sizes, created_at
            FROM storefront.product
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(price: Decimal, sizes: &[&str]) -> ProductRow {
        ProductRow {
            id: Uuid::new_v4(),
            title: "Tee".to_owned(),
            slug: "tee".to_owned(),
            description: String::new(),
            price,
            in_stock: 4,
            sizes: sizes.iter().map(|s| (*s).to_owned()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let product = Product::try_from(row(Decimal::new(1999, 2), &["S", "XL"])).unwrap();
        assert_eq!(product.price, Money::from_cents(1999));
        assert_eq!(product.sizes, vec![Size::S, Size::XL]);
    }

    #[test]
    fn test_sub_cent_price_is_corruption() {
        let err = Product::try_from(row(Decimal::new(19_999, 3), &[])).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_unknown_size_is_corruption() {
        let err = Product::try_from(row(Decimal::ONE, &["HUGE"])).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }
}
