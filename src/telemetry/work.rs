//! Poll cycle span helpers.

use crate::model::WorkId;
use tracing::Span;

/// Start a span covering one poll cycle.
///
/// `poll.fetched` and `poll.claimed` are declared empty and filled in via
/// [`record_cycle_counts`].
pub fn start_cycle_span(collection: &str, max_batch: usize) -> Span {
    tracing::info_span!(
        "poll.cycle",
        "poll.collection" = collection,
        "poll.max_batch" = max_batch,
        "poll.fetched" = tracing::field::Empty,
        "poll.claimed" = tracing::field::Empty,
    )
}

/// Record how many candidates the cycle fetched and won.
pub fn record_cycle_counts(span: &Span, fetched: usize, claimed: usize) {
    span.record("poll.fetched", fetched);
    span.record("poll.claimed", claimed);
}

/// Record a claim status transition as an event on the cycle span.
pub fn record_claim(span: &Span, id: WorkId, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::debug!(work.id = %id, from = from, to = to, "claimed");
    });
}
