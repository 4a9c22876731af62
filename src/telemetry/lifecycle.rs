//! Span helpers for lifecycle operations.

use opentelemetry::KeyValue;
use tracing::Span;

use crate::model::{JobId, JobStatus};

use super::metrics;

/// Start a span for one engine operation on a job.
///
/// `job.status` is declared empty and filled by [`record_state_transition`].
pub fn start_operation_span(operation: &'static str, job_id: &JobId) -> Span {
    tracing::info_span!(
        "job.operation",
        "job.operation" = operation,
        "job.id" = %job_id,
        "job.status" = tracing::field::Empty,
    )
}

/// Record a status transition on the span and bump the transition counter.
pub fn record_state_transition(span: &Span, from: JobStatus, to: JobStatus) {
    span.record("job.status", tracing::field::display(to));
    span.in_scope(|| {
        tracing::info!(%from, %to, "state_transition");
    });
    metrics::job_state_transitions().add(
        1,
        &[
            KeyValue::new("from", from.to_string()),
            KeyValue::new("to", to.to_string()),
        ],
    );
}
