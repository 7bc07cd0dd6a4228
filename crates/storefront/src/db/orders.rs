//! Order persistence.
//!
//! Queries are checked at runtime (`query_as` with row structs) so the crate
//! builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use tienda_core::{
    CountryId, Money, OrderAddressId, OrderId, OrderItemId, ProductId, Size, UserId,
};

use super::{OrderStore, OrderTransaction, RepositoryError};
use crate::models::{
    AddressInput, NewOrder, NewOrderItem, Order, OrderAddress, OrderDetails, OrderItem,
    StockUpdate,
};

const ORDER_COLUMNS: &str = "id, user_id, items_in_order, sub_total, tax, total, \
                             is_paid, paid_at, transaction_id, created_at";

// =============================================================================
// Row types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    items_in_order: i32,
    sub_total: Decimal,
    tax: Decimal,
    total: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| {
            RepositoryError::DataCorruption(format!("order {}: invalid {what}", row.id))
        };
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            items_in_order: u32::try_from(row.items_in_order)
                .map_err(|_| corrupt("items_in_order"))?,
            sub_total: Money::from_decimal(row.sub_total).map_err(|_| corrupt("sub_total"))?,
            tax: Money::from_decimal(row.tax).map_err(|_| corrupt("tax"))?,
            total: Money::from_decimal(row.total).map_err(|_| corrupt("total"))?,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    position: i32,
    product_id: Uuid,
    quantity: i32,
    size: Size,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("order item {}: negative quantity", row.id))
        })?;
        let price = Money::from_decimal(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("order item {}: {e}", row.id))
        })?;
        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            quantity,
            size: row.size,
            price,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderAddressRow {
    id: Uuid,
    order_id: Uuid,
    first_name: String,
    last_name: String,
    address: String,
    address2: Option<String>,
    postal_code: String,
    city: String,
    phone: String,
    country_id: CountryId,
}

impl From<OrderAddressRow> for OrderAddress {
    fn from(row: OrderAddressRow) -> Self {
        Self {
            id: OrderAddressId::new(row.id),
            order_id: OrderId::new(row.order_id),
            first_name: row.first_name,
            last_name: row.last_name,
            address: row.address,
            address2: row.address2,
            postal_code: row.postal_code,
            city: row.city,
            phone: row.phone,
            country_id: row.country_id,
        }
    }
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} out of range")))
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed order store.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    type Transaction = PgOrderTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        Ok(PgOrderTransaction {
            tx: self.pool.begin().await?,
        })
    }

    #[instrument(skip(self))]
    async fn find_order(&self, id: OrderId) -> Result<Option<OrderDetails>, RepositoryError> {
        let sql = format!(r#"SELECT {ORDER_COLUMNS} FROM storefront."order" WHERE id = $1"#);
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let order = Order::try_from(row)?;

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, position, product_id, quantity, size, price
            FROM storefront.order_item
            WHERE order_id = $1
            ORDER BY position
            ",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let address = sqlx::query_as::<_, OrderAddressRow>(
            r"
            SELECT id, order_id, first_name, last_name, address, address2,
                   postal_code, city, phone, country_id
            FROM storefront.order_address
            WHERE order_id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::DataCorruption(format!("order {id} has no address")))?;

        Ok(Some(OrderDetails {
            order,
            items,
            address: address.into(),
        }))
    }

    #[instrument(skip(self))]
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            r#"SELECT {ORDER_COLUMNS} FROM storefront."order"
               WHERE user_id = $1
               ORDER BY created_at DESC, id"#
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    #[instrument(skip(self))]
    async fn set_transaction_id(
        &self,
        id: OrderId,
        transaction_id: &str,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            r#"UPDATE storefront."order" SET transaction_id = $2, updated_at = now()
               WHERE id = $1
               RETURNING {ORDER_COLUMNS}"#
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(Order::try_from)
    }

    #[instrument(skip(self))]
    async fn mark_paid(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let sql = format!(
            r#"UPDATE storefront."order"
               SET is_paid = TRUE, paid_at = COALESCE(paid_at, now()), updated_at = now()
               WHERE id = $1
               RETURNING {ORDER_COLUMNS}"#
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(Order::try_from)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An open `PostgreSQL` transaction for one placement.
///
/// Dropping it without calling `commit` rolls back.
#[derive(Debug)]
pub struct PgOrderTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    #[instrument(skip(self))]
    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<StockUpdate>, RepositoryError> {
        // The UPDATE takes the row lock; concurrent placements queue here.
        let row: Option<(Uuid, String, i32)> = sqlx::query_as(
            r"
            UPDATE storefront.product
            SET in_stock = in_stock - $2, updated_at = now()
            WHERE id = $1
            RETURNING id, title, in_stock
            ",
        )
        .bind(product_id.as_uuid())
        .bind(quantity_param(quantity)?)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|(id, title, in_stock)| StockUpdate {
            product_id: ProductId::new(id),
            title,
            in_stock,
        }))
    }

    #[instrument(skip_all, fields(user_id = %order.user_id))]
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let items_in_order = i32::try_from(order.totals.items_in_order).map_err(|_| {
            RepositoryError::Conflict("items_in_order out of range".to_owned())
        })?;
        let sql = format!(
            r#"INSERT INTO storefront."order" (user_id, items_in_order, sub_total, tax, total)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {ORDER_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.user_id.as_uuid())
            .bind(items_in_order)
            .bind(order.totals.sub_total.to_decimal())
            .bind(order.totals.tax.to_decimal())
            .bind(order.totals.total.to_decimal())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_write)?;

        Order::try_from(row)
    }

    #[instrument(skip_all, fields(order_id = %order_id, count = items.len()))]
    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let quantities = items
            .iter()
            .map(|item| quantity_param(item.quantity))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO storefront.order_item (order_id, position, product_id, quantity, size, price) ",
        );
        builder.push_values(
            items.iter().zip(quantities).zip(0_i32..),
            |mut row, ((item, quantity), position)| {
                row.push_bind(order_id.as_uuid())
                    .push_bind(position)
                    .push_bind(item.product_id.as_uuid())
                    .push_bind(quantity)
                    .push_bind(item.size)
                    .push_bind(item.price.to_decimal());
            },
        );
        builder.push(" RETURNING id, order_id, position, product_id, quantity, size, price");

        let mut rows = builder
            .build_query_as::<OrderItemRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_write)?;
        rows.sort_by_key(|r| r.position);

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    #[instrument(skip_all, fields(order_id = %order_id))]
    async fn insert_order_address(
        &mut self,
        order_id: OrderId,
        address: &AddressInput,
    ) -> Result<OrderAddress, RepositoryError> {
        let row = sqlx::query_as::<_, OrderAddressRow>(
            r"
            INSERT INTO storefront.order_address
                (order_id, first_name, last_name, address, address2,
                 postal_code, city, phone, country_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, order_id, first_name, last_name, address, address2,
                      postal_code, city, phone, country_id
            ",
        )
        .bind(order_id.as_uuid())
        .bind(address.first_name.trim())
        .bind(address.last_name.trim())
        .bind(address.address.trim())
        .bind(address.address2())
        .bind(address.postal_code.trim())
        .bind(address.city.trim())
        .bind(address.phone.trim())
        .bind(&address.country)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(row.into())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
