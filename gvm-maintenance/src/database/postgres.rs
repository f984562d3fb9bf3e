use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

use super::{SqlStore, StoreError};

/// PostgreSQL store behind a small lazily connected pool. Connecting lazily
/// keeps the filesystem probes usable while the server is down.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(database_url)
            .context("Invalid database URL")?;

        info!("Database pool configured (lazy connect)");
        Ok(Self { pool })
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => StoreError::Statement(db.to_string()),
        sqlx::Error::RowNotFound
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Statement(err.to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl SqlStore for PgStore {
    async fn fetch_text(&self, sql: &str) -> Result<Option<String>, StoreError> {
        debug!("fetch_text: {}", sql.trim());
        let value = sqlx::query_scalar::<_, Option<String>>(sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(value.flatten())
    }

    async fn fetch_count(&self, sql: &str) -> Result<i64, StoreError> {
        debug!("fetch_count: {}", sql.trim());
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn execute(&self, sql: &str) -> Result<(), StoreError> {
        debug!("execute: {}", sql.trim());
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}
