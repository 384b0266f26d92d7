//! Metric instrument factories for claimq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"claimq"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("claimq")
}

/// Counter: work items inserted through the operator surface.
/// Labels: `collection`.
pub fn work_submitted() -> Counter<u64> {
    meter()
        .u64_counter("claimq.work.submitted")
        .with_description("Number of work items submitted")
        .build()
}

/// Counter: finished poll cycles.
/// Labels: `collection`, `outcome` (see `CycleOutcome::label`).
pub fn poll_cycles() -> Counter<u64> {
    meter()
        .u64_counter("claimq.poll.cycles")
        .with_description("Number of poll cycles run")
        .build()
}

/// Counter: individual claim attempts.
/// Labels: `collection`, `result` ("won" | "lost" | "fault").
pub fn claim_attempts() -> Counter<u64> {
    meter()
        .u64_counter("claimq.claim.attempts")
        .with_description("Number of claim attempts by result")
        .build()
}

/// Counter: claimed items handed to the work handler.
/// Labels: `collection`.
pub fn items_forwarded() -> Counter<u64> {
    meter()
        .u64_counter("claimq.items.forwarded")
        .with_description("Number of claimed items forwarded downstream")
        .build()
}

/// Histogram: poll cycle duration in milliseconds.
/// Labels: `collection`.
pub fn cycle_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("claimq.poll.cycle_duration_ms")
        .with_description("Poll cycle duration in milliseconds")
        .with_unit("ms")
        .build()
}
