//! Postgres binding for the work collection.
//!
//! Each collection is one table. The pool is shared by the poller's sessions
//! and the operator commands.

pub mod session;
pub mod work;

use crate::error::{Error, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use session::PgSession;

/// Validated table name for a work collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionName(String);

impl CollectionName {
    pub const DEFAULT: &'static str = "work_items";

    /// Accepts `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes (the Postgres
    /// identifier limit).
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid_head && valid_tail && name.len() <= 63 {
            Ok(Self(name))
        } else {
            Err(Error::InvalidCollection(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted identifier for interpolation into SQL.
    pub(crate) fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl Default for CollectionName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Database handle bound to one collection.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
    collection: CollectionName,
}

impl Db {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str, collection: CollectionName) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool, collection })
    }

    /// Create the collection table and its status index (idempotent).
    pub async fn ensure_collection(&self) -> Result<()> {
        let table = self.collection.quoted();
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                correlation_key TEXT NOT NULL,
                status TEXT NOT NULL,
                payload JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL,
                last_modified_at TIMESTAMPTZ NOT NULL,
                version BIGINT NOT NULL DEFAULT 0
            )"
        );
        sqlx::query(&create).execute(&self.pool).await?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS \"{}_status_idx\" ON {table} (status, created_at)",
            self.collection.as_str()
        );
        sqlx::query(&index).execute(&self.pool).await?;
        Ok(())
    }

    /// Simple health check: run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
