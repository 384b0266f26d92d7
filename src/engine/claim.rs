//! Claimer: the ready → owned compare-and-swap on a single item.
//!
//! Correctness rests entirely on the store applying "match id AND status ==
//! ready, then set owned" as one indivisible write. Nothing here reads the
//! item first, and claimers share no in-process state, so any number of
//! them may race on the same collection.

use crate::error::{Result, with_timeout};
use crate::model::{Status, WorkItem};
use crate::store::StoreSession;
use chrono::{SubsecRound, Utc};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Claimer {
    ready: Status,
    owned: Status,
    timeout: Duration,
}

impl Claimer {
    pub fn new(ready: Status, owned: Status, timeout: Duration) -> Self {
        Self {
            ready,
            owned,
            timeout,
        }
    }

    /// Try to move `item` from ready to owned.
    ///
    /// `Ok(true)` iff the store modified exactly one document; `item` is then
    /// updated to match what was written. `Ok(false)` covers both "another
    /// worker won" and "the item is gone or no longer ready". `Err` is a
    /// store fault or timeout for this item only.
    pub async fn claim(&self, session: &mut dyn StoreSession, item: &mut WorkItem) -> Result<bool> {
        // Microsecond precision, the same as the stored column.
        let at = Utc::now().trunc_subsecs(6);
        let modified = with_timeout(
            "claim",
            self.timeout,
            session.update_status(item.id, &self.ready, &self.owned, at),
        )
        .await?;

        if modified == 1 {
            item.mark_claimed(&self.owned, at);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
