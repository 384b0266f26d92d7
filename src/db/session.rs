//! Poll-cycle sessions over Postgres: the candidate read and the
//! conditional-update claim.
//!
//! The claim is one `UPDATE ... WHERE id = $id AND status = $ready`.
//! Postgres row locking makes that statement a compare-and-swap: when two
//! sessions race on the same row, the loser re-evaluates the predicate after
//! the winner commits and matches nothing.

use super::Db;
use super::work::{COLUMNS, WorkItemRow};
use crate::error::Result;
use crate::model::{Status, WorkId, WorkItem};
use crate::store::{DocumentStore, StoreSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

enum Conn {
    /// Every statement autocommits on a pooled connection.
    Pool(PgPool),
    /// Statements share one transaction; each claim gets its own savepoint.
    Tx(Transaction<'static, Postgres>),
}

/// A session against one collection, autocommit or transactional.
pub struct PgSession {
    table: String,
    conn: Conn,
}

#[async_trait]
impl DocumentStore for Db {
    async fn session(&self, transactional: bool) -> Result<Box<dyn StoreSession>> {
        let conn = if transactional {
            Conn::Tx(self.pool().begin().await?)
        } else {
            Conn::Pool(self.pool().clone())
        };
        Ok(Box::new(PgSession {
            table: self.collection().quoted(),
            conn,
        }))
    }
}

#[async_trait]
impl StoreSession for PgSession {
    async fn find_by_status(&mut self, status: &Status, limit: usize) -> Result<Vec<WorkItem>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE status = $1 ORDER BY created_at, id LIMIT $2",
            self.table
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let query = sqlx::query_as::<_, WorkItemRow>(&sql)
            .bind(status.as_str())
            .bind(limit);

        let rows = match &mut self.conn {
            Conn::Pool(pool) => query.fetch_all(&*pool).await?,
            Conn::Tx(tx) => query.fetch_all(&mut **tx).await?,
        };
        Ok(rows.into_iter().map(WorkItemRow::into_work_item).collect())
    }

    async fn update_status(
        &mut self,
        id: WorkId,
        from: &Status,
        to: &Status,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET status = $1,
                last_modified_at = GREATEST($2, last_modified_at + interval '1 microsecond'),
                version = version + 1
             WHERE id = $3 AND status = $4",
            self.table
        );
        let query = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(at)
            .bind(id.0)
            .bind(from.as_str());

        let modified = match &mut self.conn {
            Conn::Pool(pool) => query.execute(&*pool).await?.rows_affected(),
            Conn::Tx(tx) => {
                // A failed statement aborts the whole transaction unless it is
                // fenced by a savepoint; dropping the savepoint rolls it back.
                let mut savepoint = sqlx::Connection::begin(&mut **tx).await?;
                let modified = query.execute(&mut *savepoint).await?.rows_affected();
                savepoint.commit().await?;
                modified
            }
        };
        Ok(modified)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        match self.conn {
            Conn::Pool(_) => Ok(()),
            Conn::Tx(tx) => {
                tx.commit().await?;
                Ok(())
            }
        }
    }
}
