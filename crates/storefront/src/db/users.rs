//! User and country repositories.
//!
//! Both tables are reference data for orders: an order points at its owner
//! and its delivery address points at a country.

use sqlx::PgPool;
use uuid::Uuid;

use tienda_core::{CountryId, UserId};

use super::RepositoryError;
use crate::models::{Country, User};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            email: row.email,
            name: row.name,
        }
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, name
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Insert a user or update the email and name of an existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email belongs to another user.
    pub async fn upsert(&self, user: &User) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO storefront.user (id, email, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email, name = EXCLUDED.name, updated_at = now()
            RETURNING id, email, name
            ",
        )
        .bind(user.id.as_uuid())
        .bind(user.email.trim().to_lowercase())
        .bind(user.name.trim())
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(row.into())
    }
}

/// Repository for deliverable countries.
pub struct CountryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CountryRepository<'a> {
    /// Create a new country repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a country or rename an existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, country: &Country) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.country (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            ",
        )
        .bind(&country.id)
        .bind(&country.name)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Every country, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Country>, RepositoryError> {
        let rows: Vec<(CountryId, String)> =
            sqlx::query_as("SELECT id, name FROM storefront.country ORDER BY name")
                .fetch_all(self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Country { id, name })
            .collect())
    }
}
