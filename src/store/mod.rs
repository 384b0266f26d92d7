//! Store seam: the two primitives the claim protocol needs from a document
//! collection.
//!
//! A [`DocumentStore`] hands out one [`StoreSession`] per poll cycle. A
//! session can read candidates by status and apply a single-document
//! conditional status update. Postgres implements these in [`crate::db`];
//! [`memory::MemoryStore`] is the in-process implementation used by tests.

pub mod memory;

use crate::error::Result;
use crate::model::{Status, WorkId, WorkItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;

/// A collection that can open poll-cycle sessions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a session. With `transactional`, everything done through the
    /// session becomes visible only on [`StoreSession::commit`]; stores
    /// without transactions may ignore the flag and autocommit.
    async fn session(&self, transactional: bool) -> Result<Box<dyn StoreSession>>;
}

/// The operations one poll cycle performs against the collection.
#[async_trait]
pub trait StoreSession: Send {
    /// Up to `limit` items whose status equals `status`, in the store's
    /// retrieval order. Pure read.
    async fn find_by_status(&mut self, status: &Status, limit: usize) -> Result<Vec<WorkItem>>;

    /// Atomically: if the item `id` has status `from`, set it to `to`, bump
    /// `last_modified_at` to [`crate::model::claim_timestamp`] of `at`, and
    /// increment the version. Returns the number of documents modified (0 or 1).
    async fn update_status(
        &mut self,
        id: WorkId,
        from: &Status,
        to: &Status,
        at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Make the session's writes durable and visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}
