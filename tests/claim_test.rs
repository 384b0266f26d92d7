//! Claimer behavior against the in-memory collection.

use chrono::{SubsecRound, Utc};
use claimq::engine::Claimer;
use claimq::model::{NewWorkItem, Status, WorkId, WorkItem};
use claimq::store::{DocumentStore, MemoryStore};
use std::time::Duration;

fn claimer() -> Claimer {
    Claimer::new(Status::ready(), Status::owned(), Duration::from_secs(1))
}

async fn claim(store: &MemoryStore, item: &mut WorkItem) -> claimq::error::Result<bool> {
    let mut session = store.session(false).await?;
    claimer().claim(session.as_mut(), item).await
}

// ---------------------------------------------------------------------------
// At most one winner
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_on_one_item_have_exactly_one_winner() {
    let store = MemoryStore::new();
    let item = store.submit(NewWorkItem::new("order-1"));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let mut item = item.clone();
        tasks.push(tokio::spawn(async move {
            claim(&store, &mut item).await.unwrap()
        }));
    }

    let mut wins = 0;
    for task in tasks {
        if task.await.unwrap() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(store.get(item.id).unwrap().status, Status::owned());
    assert_eq!(store.update_count(), 1);
}

#[tokio::test]
async fn second_claim_on_same_item_is_lost() {
    let store = MemoryStore::new();
    let mut first = store.submit(NewWorkItem::new("order-1"));
    let mut second = first.clone();

    assert!(claim(&store, &mut first).await.unwrap());
    assert!(!claim(&store, &mut second).await.unwrap());

    // The loser's copy is left as fetched.
    assert_eq!(second.status, Status::ready());
    assert_eq!(store.get(first.id).unwrap().version, 1);
}

// ---------------------------------------------------------------------------
// Non-ready and missing items
// ---------------------------------------------------------------------------

#[tokio::test]
async fn claim_on_non_ready_item_returns_false_without_writing() {
    let store = MemoryStore::new();
    let mut item = store.submit(NewWorkItem::new("order-1").status(Status::new("DONE")));
    let before = store.get(item.id).unwrap();

    assert!(!claim(&store, &mut item).await.unwrap());

    assert_eq!(store.update_count(), 0);
    assert_eq!(store.get(item.id).unwrap(), before);
}

#[tokio::test]
async fn claim_on_missing_item_returns_false() {
    let store = MemoryStore::new();
    let template = store.submit(NewWorkItem::new("order-1"));

    let mut missing = WorkItem {
        id: WorkId::new(),
        ..template.clone()
    };
    assert!(!claim(&store, &mut missing).await.unwrap());
    assert_eq!(store.update_count(), 0);
    assert_eq!(store.get(template.id).unwrap().status, Status::ready());
}

#[tokio::test]
async fn claim_fault_surfaces_as_error_and_leaves_item_ready() {
    let store = MemoryStore::new();
    let mut item = store.submit(NewWorkItem::new("order-1"));
    store.fail_claim(item.id);

    let err = claim(&store, &mut item).await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err}");
    assert_eq!(store.get(item.id).unwrap().status, Status::ready());

    // The fault was one-shot; the next attempt wins.
    assert!(claim(&store, &mut item).await.unwrap());
}

#[tokio::test]
async fn claim_times_out_as_transient_error() {
    let store = MemoryStore::new();
    let mut item = store.submit(NewWorkItem::new("order-1"));
    store.set_latency(Duration::from_millis(200));

    let claimer = Claimer::new(Status::ready(), Status::owned(), Duration::from_millis(20));
    let mut session = store.session(false).await.unwrap();
    let err = claimer.claim(session.as_mut(), &mut item).await.unwrap_err();

    assert!(matches!(
        err,
        claimq::error::Error::Timeout {
            operation: "claim",
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn winning_claim_advances_last_modified() {
    let store = MemoryStore::new();
    let mut item = store.submit(NewWorkItem::new("order-1"));
    let before = item.last_modified_at;

    assert!(claim(&store, &mut item).await.unwrap());

    let stored = store.get(item.id).unwrap();
    assert!(stored.last_modified_at > before);
    assert_eq!(item, stored, "local copy mirrors the stored write");
}

#[tokio::test]
async fn winning_claim_advances_last_modified_even_if_stored_value_is_ahead() {
    let store = MemoryStore::new();
    let template = store.submit(NewWorkItem::new("template"));
    let future = Utc::now() + chrono::Duration::hours(1);
    let mut item = WorkItem {
        id: WorkId::new(),
        correlation_key: "order-2".to_string(),
        last_modified_at: future,
        ..template
    };
    store.insert(item.clone());

    assert!(claim(&store, &mut item).await.unwrap());
    assert!(store.get(item.id).unwrap().last_modified_at > future);
}

#[tokio::test]
async fn claim_timestamp_has_microsecond_precision() {
    let store = MemoryStore::new();
    let template = store.submit(NewWorkItem::new("template"));
    let past = (Utc::now() - chrono::Duration::minutes(5)).trunc_subsecs(6);
    let mut item = WorkItem {
        id: WorkId::new(),
        last_modified_at: past,
        ..template
    };
    store.insert(item.clone());

    assert!(claim(&store, &mut item).await.unwrap());

    let stored = store.get(item.id).unwrap();
    assert_eq!(item.last_modified_at.timestamp_subsec_nanos() % 1_000, 0);
    assert_eq!(item.last_modified_at, stored.last_modified_at);
}

#[tokio::test]
async fn losing_claim_does_not_touch_timestamp() {
    let store = MemoryStore::new();
    let mut winner = store.submit(NewWorkItem::new("order-1"));
    let mut loser = winner.clone();

    assert!(claim(&store, &mut winner).await.unwrap());
    let after_win = store.get(winner.id).unwrap().last_modified_at;

    assert!(!claim(&store, &mut loser).await.unwrap());
    assert_eq!(store.get(winner.id).unwrap().last_modified_at, after_win);
}
