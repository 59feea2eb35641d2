//! PostgreSQL adapter for Storekeep
//!
//! Implements [`StoreRepository`] over the `store`, `product` and
//! `product_store` tables. The schema ships as embedded sqlx migrations; call
//! [`PostgresStoreRepository::migrate`] once at startup.
//!
//! The `store_mgrid_key` unique constraint and the `product_store` foreign
//! keys are reported as [`QueryError::ConstraintViolation`] carrying the
//! constraint name. Every other database failure is logged and returned as
//! [`QueryError::StoreFailure`].

#![forbid(unsafe_code)]

use std::time::Duration;

use nutype::nutype;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{query, Pool, Postgres, Row};
use storekeep_types::{
    ManagerId, Operation, ProductId, ProductListing, QueryError, Store, StoreId, StoreProposal,
    StoreRepository,
};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Startup failures of the Postgres adapter.
#[derive(Debug, Error)]
pub enum PostgresStoreError {
    /// The pool could not open a connection.
    #[error("failed to create postgres connection pool")]
    ConnectionFailed(#[source] sqlx::Error),

    /// `SELECT 1` failed on an established pool.
    #[error("postgres did not answer the startup ping")]
    PingFailed(#[source] sqlx::Error),

    /// The embedded migrations could not be applied.
    #[error("failed to apply postgres migrations")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
}

/// Maximum number of database connections in the pool.
///
/// Backed by `NonZeroU32`, so a pool of zero connections cannot be expressed.
#[nutype(derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRef, Into))]
pub struct MaxConnections(std::num::NonZeroU32);

/// Configuration for the [`PostgresStoreRepository`] connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Maximum number of connections in the pool (default: 10)
    pub max_connections: MaxConnections,
    /// Timeout for acquiring a connection from the pool (default: 30 seconds)
    pub acquire_timeout: Duration,
    /// Idle timeout for connections in the pool (default: 10 minutes)
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        const DEFAULT_MAX_CONNECTIONS: std::num::NonZeroU32 = match std::num::NonZeroU32::new(10) {
            Some(v) => v,
            None => unreachable!(),
        };

        Self {
            max_connections: MaxConnections::new(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// [`StoreRepository`] over a pooled Postgres connection.
///
/// Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PostgresStoreRepository {
    pool: Pool<Postgres>,
}

impl PostgresStoreRepository {
    /// Connect with the default pool configuration.
    pub async fn new<S: Into<String>>(connection_string: S) -> Result<Self, PostgresStoreError> {
        Self::with_config(connection_string, PostgresConfig::default()).await
    }

    /// Connect with a custom pool configuration.
    pub async fn with_config<S: Into<String>>(
        connection_string: S,
        config: PostgresConfig,
    ) -> Result<Self, PostgresStoreError> {
        let connection_string = connection_string.into();
        let max_connections: std::num::NonZeroU32 = config.max_connections.into();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.get())
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&connection_string)
            .await
            .map_err(PostgresStoreError::ConnectionFailed)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub const fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Check that the database answers a trivial query.
    pub async fn ping(&self) -> Result<(), PostgresStoreError> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(PostgresStoreError::PingFailed)?;
        Ok(())
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), PostgresStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(PostgresStoreError::MigrationFailed)?;
        info!("[postgres.migrated] store schema is up to date");
        Ok(())
    }
}

impl StoreRepository for PostgresStoreRepository {
    #[instrument(name = "postgres.list_stores", skip(self))]
    async fn list_stores(&self) -> Result<Vec<Store>, QueryError> {
        let rows = query("SELECT sid, location, mgrid FROM store ORDER BY sid")
            .fetch_all(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::ListStores))?;

        rows.iter()
            .map(|row| decode_store(row, Operation::ListStores))
            .collect()
    }

    #[instrument(name = "postgres.find_store", skip(self))]
    async fn find_store(&self, store_id: StoreId) -> Result<Option<Store>, QueryError> {
        let row = query("SELECT sid, location, mgrid FROM store WHERE sid = $1")
            .bind(store_id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::FindStore))?;

        row.as_ref()
            .map(|row| decode_store(row, Operation::FindStore))
            .transpose()
    }

    #[instrument(name = "postgres.stores_managed_by", skip(self))]
    async fn stores_managed_by(
        &self,
        manager_id: &ManagerId,
        excluding: Option<StoreId>,
    ) -> Result<Vec<StoreId>, QueryError> {
        let rows = query(
            "SELECT sid FROM store WHERE mgrid = $1 AND ($2::INTEGER IS NULL OR sid <> $2) ORDER BY sid",
        )
        .bind(manager_id.as_ref())
        .bind(excluding.map(StoreId::into_inner))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::FindAssignedStores))?;

        rows.iter()
            .map(|row| decode_store_id(row, Operation::FindAssignedStores))
            .collect()
    }

    #[instrument(name = "postgres.insert_store", skip(self, proposal))]
    async fn insert_store(&self, proposal: &StoreProposal) -> Result<StoreId, QueryError> {
        let row = query("INSERT INTO store (location, mgrid) VALUES ($1, $2) RETURNING sid")
            .bind(proposal.location.as_ref())
            .bind(proposal.manager_id.as_ref().map(AsRef::<str>::as_ref))
            .fetch_one(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::InsertStore))?;

        decode_store_id(&row, Operation::InsertStore)
    }

    #[instrument(name = "postgres.update_store", skip(self, proposal))]
    async fn update_store(
        &self,
        store_id: StoreId,
        proposal: &StoreProposal,
    ) -> Result<bool, QueryError> {
        let row = query("UPDATE store SET location = $1, mgrid = $2 WHERE sid = $3 RETURNING sid")
            .bind(proposal.location.as_ref())
            .bind(proposal.manager_id.as_ref().map(AsRef::<str>::as_ref))
            .bind(store_id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::UpdateStore))?;

        Ok(row.is_some())
    }

    #[instrument(name = "postgres.list_products", skip(self))]
    async fn list_products(&self) -> Result<Vec<ProductListing>, QueryError> {
        let rows = query(
            "SELECT p.pid, p.productdesc, s.sid, s.location, ps.price \
             FROM product p \
             LEFT JOIN product_store ps ON ps.pid = p.pid \
             LEFT JOIN store s ON s.sid = ps.sid \
             ORDER BY p.pid, s.sid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::ListProducts))?;

        rows.iter().map(decode_listing).collect()
    }

    #[instrument(name = "postgres.product_links", skip(self))]
    async fn product_links(&self, product_id: &ProductId) -> Result<usize, QueryError> {
        let row = query("SELECT COUNT(*) AS links FROM product_store WHERE pid = $1")
            .bind(product_id.as_ref())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::CountProductLinks))?;

        let links: i64 = row
            .try_get("links")
            .map_err(|error| map_sqlx_error(error, Operation::CountProductLinks))?;
        usize::try_from(links).map_err(|error| QueryError::DecodeFailed {
            operation: Operation::CountProductLinks,
            detail: error.to_string(),
        })
    }

    #[instrument(name = "postgres.delete_product", skip(self))]
    async fn delete_product(&self, product_id: &ProductId) -> Result<bool, QueryError> {
        let row = query("DELETE FROM product WHERE pid = $1 RETURNING pid")
            .bind(product_id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::DeleteProduct))?;

        Ok(row.is_some())
    }
}

fn decode_store_id(row: &PgRow, operation: Operation) -> Result<StoreId, QueryError> {
    let sid: i32 = row
        .try_get("sid")
        .map_err(|error| map_sqlx_error(error, operation))?;
    Ok(StoreId::new(sid))
}

fn decode_store(row: &PgRow, operation: Operation) -> Result<Store, QueryError> {
    let location: String = row
        .try_get("location")
        .map_err(|error| map_sqlx_error(error, operation))?;
    let mgrid: Option<String> = row
        .try_get("mgrid")
        .map_err(|error| map_sqlx_error(error, operation))?;

    // Rows written outside the service may hold blank or malformed ids.
    let manager_id = match mgrid {
        Some(raw) if !raw.trim().is_empty() => {
            Some(
                ManagerId::try_new(raw).map_err(|error| QueryError::DecodeFailed {
                    operation,
                    detail: error.to_string(),
                })?,
            )
        }
        _ => None,
    };

    Ok(Store {
        id: decode_store_id(row, operation)?,
        location,
        manager_id,
    })
}

fn decode_listing(row: &PgRow) -> Result<ProductListing, QueryError> {
    const OPERATION: Operation = Operation::ListProducts;

    let pid: String = row
        .try_get("pid")
        .map_err(|error| map_sqlx_error(error, OPERATION))?;
    let product_id = ProductId::try_new(pid).map_err(|error| QueryError::DecodeFailed {
        operation: OPERATION,
        detail: error.to_string(),
    })?;
    let sid: Option<i32> = row
        .try_get("sid")
        .map_err(|error| map_sqlx_error(error, OPERATION))?;

    Ok(ProductListing {
        product_id,
        description: row
            .try_get("productdesc")
            .map_err(|error| map_sqlx_error(error, OPERATION))?,
        store_id: sid.map(StoreId::new),
        location: row
            .try_get("location")
            .map_err(|error| map_sqlx_error(error, OPERATION))?,
        price: row
            .try_get("price")
            .map_err(|error| map_sqlx_error(error, OPERATION))?,
    })
}

fn map_sqlx_error(error: sqlx::Error, operation: Operation) -> QueryError {
    match &error {
        sqlx::Error::Database(db_error) => {
            let code = db_error.code();
            if matches!(
                code.as_deref(),
                Some(UNIQUE_VIOLATION | FOREIGN_KEY_VIOLATION)
            ) {
                let constraint = db_error.constraint().unwrap_or_default().to_string();
                warn!(
                    operation = %operation,
                    constraint = %constraint,
                    "[postgres.constraint_violation] write rejected by schema constraint"
                );
                return QueryError::ConstraintViolation {
                    operation,
                    constraint,
                };
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            error!(
                error = %error,
                operation = %operation,
                "[postgres.decode_error] row did not match the expected shape"
            );
            return QueryError::DecodeFailed {
                operation,
                detail: error.to_string(),
            };
        }
        _ => {}
    }

    error!(
        error = %error,
        operation = %operation,
        "[postgres.database_error] database operation failed"
    );
    QueryError::StoreFailure { operation }
}
