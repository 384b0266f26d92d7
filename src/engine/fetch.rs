//! Candidate fetcher: one bounded read of ready items per cycle.

use crate::error::{Result, with_timeout};
use crate::model::{Status, WorkItem};
use crate::store::StoreSession;
use std::time::Duration;

/// Reads up to `max_batch` items in the ready status. Never claims.
#[derive(Debug, Clone)]
pub struct CandidateFetcher {
    ready: Status,
    max_batch: usize,
    timeout: Duration,
}

impl CandidateFetcher {
    pub fn new(ready: Status, max_batch: usize, timeout: Duration) -> Self {
        Self {
            ready,
            max_batch,
            timeout,
        }
    }

    /// Candidates in the store's retrieval order. Callers must not assume
    /// any priority ordering.
    pub async fn fetch(&self, session: &mut dyn StoreSession) -> Result<Vec<WorkItem>> {
        let mut batch = with_timeout(
            "fetch",
            self.timeout,
            session.find_by_status(&self.ready, self.max_batch),
        )
        .await?;
        batch.truncate(self.max_batch);
        Ok(batch)
    }
}
