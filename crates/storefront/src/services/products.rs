//! Catalog browsing.

use tracing::instrument;

use crate::db::{Catalog, RepositoryError};
use crate::models::{Page, Product};

/// Products shown per catalog page unless the caller asks otherwise.
pub const DEFAULT_PER_PAGE: u32 = 12;

/// Read-only catalog queries for the shop pages.
pub struct ProductService<C> {
    catalog: C,
}

impl<C: Catalog> ProductService<C> {
    #[must_use]
    pub const fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// One page of the catalog, newest first.
    ///
    /// Page numbers below 1 are treated as 1 and `per_page` is at least 1.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, RepositoryError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = u64::from(page - 1) * u64::from(per_page);

        let (items, total_count) = self.catalog.list_products(offset, per_page).await?;
        Ok(Page::new(items, page, per_page, total_count))
    }

    /// Look up a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this slug.
    #[instrument(skip(self))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product, RepositoryError> {
        self.catalog
            .find_product_by_slug(slug)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use tienda_core::{Money, ProductId, Size};

    use super::*;
    use crate::db::InMemoryStore;

    fn seeded(count: i64) -> InMemoryStore {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for n in 0..count {
            store.add_product(Product {
                id: ProductId::generate(),
                title: format!("Tee {n}"),
                slug: format!("tee-{n}"),
                description: String::new(),
                price: Money::from_cents(1_000),
                in_stock: 3,
                sizes: vec![Size::M],
                created_at: now + Duration::seconds(n),
            });
        }
        store
    }

    #[tokio::test]
    async fn test_list_products_pages() {
        let svc = ProductService::new(seeded(25));

        let first = svc.list_products(1, 10).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_count, 25);
        assert_eq!(first.items[0].slug, "tee-24");

        let last = svc.list_products(3, 10).await.unwrap();
        assert_eq!(last.items.len(), 5);

        let clamped = svc.list_products(0, 10).await.unwrap();
        assert_eq!(clamped.current_page, 1);
    }

    #[tokio::test]
    async fn test_get_product_by_slug() {
        let svc = ProductService::new(seeded(2));

        assert_eq!(svc.get_product_by_slug("tee-1").await.unwrap().title, "Tee 1");
        assert!(matches!(
            svc.get_product_by_slug("missing").await,
            Err(RepositoryError::NotFound)
        ));
    }
}
