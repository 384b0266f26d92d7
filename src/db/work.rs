//! Work item operations: submit, lookup, listing.

use crate::error::{Error, Result};
use crate::model::{NewWorkItem, Status, WorkId, WorkItem};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use uuid::Uuid;

/// Columns selected for every work item read.
pub(crate) const COLUMNS: &str =
    "id, correlation_key, status, payload, created_at, last_modified_at, version";

impl super::Db {
    /// Insert a new work item. It lands in `ready` unless the builder set a status.
    pub async fn submit_work(&self, new: NewWorkItem, ready: &Status) -> Result<WorkItem> {
        let item = new.into_item(ready, chrono::Utc::now());

        let sql = format!(
            "INSERT INTO {} ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.collection().quoted()
        );
        sqlx::query(&sql)
            .bind(item.id.0)
            .bind(&item.correlation_key)
            .bind(item.status.as_str())
            .bind(&item.payload)
            .bind(item.created_at)
            .bind(item.last_modified_at)
            .bind(item.version)
            .execute(self.pool())
            .await?;

        metrics::work_submitted().add(
            1,
            &[KeyValue::new("collection", self.collection().to_string())],
        );

        Ok(item)
    }

    /// Get a work item by ID.
    pub async fn get_work_item(&self, id: WorkId) -> Result<WorkItem> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE id = $1",
            self.collection().quoted()
        );
        let row: Option<WorkItemRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await?;

        row.map(WorkItemRow::into_work_item)
            .ok_or_else(|| Error::NotFound(format!("work item {id}")))
    }

    /// List work items, newest first, optionally filtered by status.
    pub async fn list_work_items(
        &self,
        status: Option<&Status>,
        limit: i64,
    ) -> Result<Vec<WorkItem>> {
        let table = self.collection().quoted();
        let rows: Vec<WorkItemRow> = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM {table} WHERE status = $1 ORDER BY created_at DESC LIMIT $2"
                );
                sqlx::query_as(&sql)
                    .bind(status.as_str())
                    .bind(limit)
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                let sql = format!("SELECT {COLUMNS} FROM {table} ORDER BY created_at DESC LIMIT $1");
                sqlx::query_as(&sql)
                    .bind(limit)
                    .fetch_all(self.pool())
                    .await?
            }
        };

        Ok(rows.into_iter().map(WorkItemRow::into_work_item).collect())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
pub(crate) struct WorkItemRow {
    id: Uuid,
    correlation_key: String,
    status: String,
    payload: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
    last_modified_at: chrono::DateTime<chrono::Utc>,
    version: i64,
}

impl WorkItemRow {
    pub(crate) fn into_work_item(self) -> WorkItem {
        WorkItem {
            id: WorkId(self.id),
            correlation_key: self.correlation_key,
            status: Status::new(self.status),
            payload: self.payload,
            created_at: self.created_at,
            last_modified_at: self.last_modified_at,
            version: self.version,
        }
    }
}
