//! Metric instrument factories.
//!
//! Uses the globally registered `MeterProvider`; without one installed the
//! instruments are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("jobmarket")
}

/// Counter: jobs created.
/// Labels: `category`.
pub fn jobs_created() -> Counter<u64> {
    meter()
        .u64_counter("jobmarket.jobs.created")
        .with_description("Number of job drafts created")
        .build()
}

/// Counter: job status transitions.
/// Labels: `from`, `to`.
pub fn job_state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("jobmarket.jobs.state_transitions")
        .with_description("Number of job status transitions")
        .build()
}

/// Counter: proposals submitted.
/// Labels: `result` ("ok" | "rejected").
pub fn proposals_submitted() -> Counter<u64> {
    meter()
        .u64_counter("jobmarket.proposals.submitted")
        .with_description("Number of proposals submitted")
        .build()
}

/// Counter: listing queries served.
/// Labels: `sort`.
pub fn queries() -> Counter<u64> {
    meter()
        .u64_counter("jobmarket.queries")
        .with_description("Number of listing queries")
        .build()
}

/// Histogram: engine operation duration in milliseconds.
/// Labels: `operation`, `result`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("jobmarket.operation.duration_ms")
        .with_description("Engine operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
