use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Comparable, ComparableQuery};
use crate::services::store::{ComparableStore, StoreError};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::SqlxError(sqlx::Error::PoolTimedOut) => {
                StoreError::Unavailable("connection pool timed out".to_string())
            }
            PostgresError::SqlxError(sqlx::Error::ColumnDecode { index, source }) => {
                StoreError::InvalidResponse(format!("column {}: {}", index, source))
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// PostgreSQL-backed comparable listings store
///
/// The `comparable_listings` table is owned by the ingestion pipeline; this
/// client only ever reads from it.
pub struct PostgresClient {
    pool: PgPool,
}

const COMPARABLES_QUERY: &str = r#"
    SELECT price::BIGINT AS price, mileage_km::INTEGER AS mileage_km, year::INTEGER AS year
    FROM comparable_listings
    WHERE lower(brand) = lower($1)
      AND model ILIKE $2 ESCAPE '\'
      AND year BETWEEN $3 AND $4
      AND active = true
      AND price > 0
    ORDER BY year DESC
    LIMIT $5
"#;

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    ///
    /// Connections are opened lazily so the service can start, and fall back to
    /// brand-tier estimates, while the database is unreachable.
    pub fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL comparable listings store");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
    }

    /// Fetch active, positively priced listings for a brand/model/year window
    pub async fn query_comparables(
        &self,
        query: &ComparableQuery,
    ) -> Result<Vec<Comparable>, PostgresError> {
        if query.year_min > query.year_max {
            return Err(PostgresError::InvalidInput(format!(
                "year window {}..{} is empty",
                query.year_min, query.year_max
            )));
        }

        let rows = sqlx::query(COMPARABLES_QUERY)
            .bind(query.brand.trim())
            .bind(model_pattern(&query.model))
            .bind(query.year_min)
            .bind(query.year_max)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let comparables = rows
            .iter()
            .map(|row| {
                let mileage: Option<i32> = row.try_get("mileage_km")?;
                Ok(Comparable {
                    price: row.try_get("price")?,
                    mileage_km: mileage.and_then(|m| u32::try_from(m).ok()),
                    year: row.try_get("year")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        tracing::debug!(
            "Found {} comparables for {} {} ({}-{})",
            comparables.len(),
            query.brand,
            query.model,
            query.year_min,
            query.year_max
        );

        Ok(comparables)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl ComparableStore for PostgresClient {
    async fn find_comparables(&self, query: &ComparableQuery) -> Result<Vec<Comparable>, StoreError> {
        self.query_comparables(query).await.map_err(Into::into)
    }
}

/// Build an ILIKE substring pattern, escaping the wildcard characters
fn model_pattern(model: &str) -> String {
    let escaped = model
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_pattern_wraps_substring() {
        assert_eq!(model_pattern(" Corolla "), "%Corolla%");
    }

    #[test]
    fn test_model_pattern_escapes_wildcards() {
        assert_eq!(model_pattern("100%_x"), "%100\\%\\_x%");
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        let err: StoreError = PostgresError::SqlxError(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
