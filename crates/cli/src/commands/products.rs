//! Catalog browsing commands.

use tienda_storefront::config::StorefrontConfig;
use tienda_storefront::db::PgCatalog;
use tienda_storefront::services::ProductService;

use super::{CommandError, connect, print_json};

/// Print one page of the catalog as a table, followed by the pager.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the query fails.
pub async fn list(config: &StorefrontConfig, page: u32, per_page: u32) -> Result<(), CommandError> {
    let pool = connect(config).await?;
    let service = ProductService::new(PgCatalog::new(pool));

    let page = service.list_products(page, per_page).await?;
    let pager = page
        .numbers()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    #[allow(clippy::print_stdout)]
    {
        println!("{:<32} {:>10} {:>6}  SLUG", "TITLE", "PRICE", "STOCK");
        for product in &page.items {
            println!(
                "{:<32} {:>10} {:>6}  {}",
                product.title,
                product.price.display(),
                product.in_stock,
                product.slug
            );
        }
        println!();
        println!(
            "Page {}/{} ({} products): {pager}",
            page.current_page, page.total_pages, page.total_count
        );
    }
    Ok(())
}

/// Print a product as JSON.
///
/// # Errors
///
/// Returns `Repository(NotFound)` if no product has this slug.
pub async fn show(config: &StorefrontConfig, slug: &str) -> Result<(), CommandError> {
    let pool = connect(config).await?;
    let service = ProductService::new(PgCatalog::new(pool));

    let product = service.get_product_by_slug(slug).await?;
    print_json(&product)
}
