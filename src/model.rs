//! Core data model.
//!
//! A work item is a document in the shared collection. Its `status` field is
//! the only thing the claim protocol mutates: a poller wins an item by moving
//! it from the ready status to the owned status in one conditional write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A document in the work collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Store-assigned identity. Immutable.
    pub id: WorkId,

    /// Externally meaningful work identifier (e.g. an order number). Immutable.
    pub correlation_key: String,

    /// Lifecycle status. Compared and swapped by the claimer.
    pub status: Status,

    /// Document body. Opaque to the poller.
    pub payload: serde_json::Value,

    pub created_at: DateTime<Utc>,

    /// Bumped on every successful claim. Observability only.
    pub last_modified_at: DateTime<Utc>,

    /// Incremented by the store on every write. Not read by the claim logic.
    pub version: i64,
}

impl WorkItem {
    /// Mirror a won claim onto the in-memory copy, the same way the store
    /// applied it.
    pub(crate) fn mark_claimed(&mut self, owned: &Status, at: DateTime<Utc>) {
        self.status = owned.clone();
        self.last_modified_at = claim_timestamp(self.last_modified_at, at);
        self.version += 1;
    }
}

/// Timestamp written by a winning claim: the claim instant, nudged forward
/// when the stored value is already at or past it, so the field strictly
/// increases.
pub fn claim_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + chrono::Duration::microseconds(1);
    if now > floor { now } else { floor }
}

/// Newtype for work item IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkId(pub Uuid);

impl WorkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for WorkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for WorkId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(WorkId)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status literal stored on a work item.
///
/// The ready and owned literals are configuration, so this is a string
/// newtype rather than a closed enum. Terminal statuses written downstream
/// are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(String);

impl Status {
    /// Default literal for items waiting to be claimed.
    pub const DEFAULT_READY: &'static str = "NEW";
    /// Default literal for items owned by a poll cycle.
    pub const DEFAULT_OWNED: &'static str = "PROCESSING";

    pub fn new(literal: impl Into<String>) -> Self {
        Self(literal.into())
    }

    pub fn ready() -> Self {
        Self::new(Self::DEFAULT_READY)
    }

    pub fn owned() -> Self {
        Self::new(Self::DEFAULT_OWNED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Handler input produced from one claimed work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessCommand {
    pub work_id: WorkId,
    pub correlation_key: String,
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for inserting new work items into a collection.
#[derive(Debug, Clone)]
pub struct NewWorkItem {
    pub(crate) correlation_key: String,
    pub(crate) payload: serde_json::Value,
    pub(crate) status: Option<Status>,
}

impl NewWorkItem {
    pub fn new(correlation_key: impl Into<String>) -> Self {
        Self {
            correlation_key: correlation_key.into(),
            payload: serde_json::json!({}),
            status: None,
        }
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Insert with an explicit status instead of the collection's ready status.
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Materialize the document. `ready` is used when no status was set.
    pub(crate) fn into_item(self, ready: &Status, now: DateTime<Utc>) -> WorkItem {
        WorkItem {
            id: WorkId::new(),
            correlation_key: self.correlation_key,
            status: self.status.unwrap_or_else(|| ready.clone()),
            payload: self.payload,
            created_at: now,
            last_modified_at: now,
            version: 0,
        }
    }
}
