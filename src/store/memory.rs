//! In-process document collection.
//!
//! Implements the same compare-and-swap semantics as the Postgres binding
//! under a mutex, so any number of sessions can race on it. Also carries
//! fault injection hooks so poll cycles can be exercised without a database.

use super::{DocumentStore, StoreSession};
use crate::error::{Error, Result};
use crate::model::{NewWorkItem, Status, WorkId, WorkItem, claim_timestamp};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    items: Vec<WorkItem>,
    updates: u64,
    failing_fetches: usize,
    failing_claims: HashSet<WorkId>,
    failing_commit: bool,
    preempted: Vec<WorkId>,
    latency: Option<Duration>,
}

/// Mutex-guarded collection. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    ready: Status,
    owned: Status,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty collection using the default ready/owned literals.
    pub fn new() -> Self {
        Self::with_statuses(Status::ready(), Status::owned())
    }

    pub fn with_statuses(ready: Status, owned: Status) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            ready,
            owned,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new item, in the ready status unless the builder says otherwise.
    pub fn submit(&self, new: NewWorkItem) -> WorkItem {
        let item = new.into_item(&self.ready, Utc::now());
        self.lock().items.push(item.clone());
        item
    }

    /// Insert a fully specified document as-is.
    pub fn insert(&self, item: WorkItem) {
        self.lock().items.push(item);
    }

    pub fn get(&self, id: WorkId) -> Result<WorkItem> {
        self.lock()
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("work item {id}")))
    }

    /// Snapshot of every item in insertion order.
    pub fn items(&self) -> Vec<WorkItem> {
        self.lock().items.clone()
    }

    pub fn list_by_status(&self, status: &Status) -> Vec<WorkItem> {
        self.lock()
            .items
            .iter()
            .filter(|item| &item.status == status)
            .cloned()
            .collect()
    }

    /// Number of documents modified through sessions so far.
    pub fn update_count(&self) -> u64 {
        self.lock().updates
    }

    /// Make the next `n` fetches fail with a transient fault.
    pub fn fail_next_fetches(&self, n: usize) {
        self.lock().failing_fetches = n;
    }

    /// Make the next claim attempt on `id` fail with a transient fault.
    pub fn fail_claim(&self, id: WorkId) {
        self.lock().failing_claims.insert(id);
    }

    /// Make the next session commit fail with a transient fault. Writes
    /// already applied stay applied, like a commit whose outcome is unknown.
    pub fn fail_next_commit(&self) {
        self.lock().failing_commit = true;
    }

    /// Right after the next fetch returns, move these items to the owned
    /// status as if another process had won them first.
    pub fn preempt_after_fetch(&self, ids: impl IntoIterator<Item = WorkId>) {
        self.lock().preempted.extend(ids);
    }

    /// Delay every session operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn injected(what: &str) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        format!("injected {what} fault"),
    ))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn session(&self, _transactional: bool) -> Result<Box<dyn StoreSession>> {
        Ok(Box::new(MemorySession {
            store: self.clone(),
        }))
    }
}

/// Autocommit session over a [`MemoryStore`].
struct MemorySession {
    store: MemoryStore,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn find_by_status(&mut self, status: &Status, limit: usize) -> Result<Vec<WorkItem>> {
        self.store.simulate_latency().await;

        let mut inner = self.store.lock();
        if inner.failing_fetches > 0 {
            inner.failing_fetches -= 1;
            return Err(injected("fetch"));
        }

        let batch: Vec<WorkItem> = inner
            .items
            .iter()
            .filter(|item| &item.status == status)
            .take(limit)
            .cloned()
            .collect();

        let preempted = std::mem::take(&mut inner.preempted);
        let now = Utc::now();
        for item in inner.items.iter_mut() {
            if preempted.contains(&item.id) && &item.status == status {
                item.mark_claimed(&self.store.owned, now);
            }
        }

        Ok(batch)
    }

    async fn update_status(
        &mut self,
        id: WorkId,
        from: &Status,
        to: &Status,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        self.store.simulate_latency().await;

        let mut inner = self.store.lock();
        if inner.failing_claims.remove(&id) {
            return Err(injected("claim"));
        }

        let Some(item) = inner
            .items
            .iter_mut()
            .find(|item| item.id == id && &item.status == from)
        else {
            return Ok(0);
        };
        item.status = to.clone();
        item.last_modified_at = claim_timestamp(item.last_modified_at, at);
        item.version += 1;
        inner.updates += 1;
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if std::mem::take(&mut self.store.lock().failing_commit) {
            return Err(injected("commit"));
        }
        Ok(())
    }
}
