//! Lifecycle controller: every mutating operation on a job.
//!
//! Each operation validates, mutates the store as one atomic step, then
//! publishes exactly one event, tagged with the commit sequence number,
//! once the store lock is released. A failed operation publishes nothing,
//! consumes no sequence number and leaves the job untouched.

use std::time::Instant;

use chrono::Utc;
use opentelemetry::KeyValue;
use tracing::{debug, info};

use super::Engine;
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::model::*;
use crate::storage::Committed;
use crate::telemetry::lifecycle::{record_state_transition, start_operation_span};
use crate::telemetry::metrics;

/// Move `job` to `to` if the state machine allows it. Returns the old status.
fn transition(job: &mut Job, operation: &str, to: JobStatus) -> Result<JobStatus> {
    let from = job.status;
    if !from.can_transition_to(to) {
        return Err(Error::transition(operation, from));
    }
    job.status = to;
    Ok(from)
}

fn proposal_not_found(job_id: JobId, proposal_id: ProposalId) -> Error {
    Error::NotFound(format!("proposal {proposal_id} on job {job_id}"))
}

/// Run `f`, recording its duration and outcome.
fn timed<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f();
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => {
            debug!(operation, error = %e, "operation rejected");
            "error"
        }
    };
    metrics::operation_duration_ms().record(
        start.elapsed().as_secs_f64() * 1000.0,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("result", outcome),
        ],
    );
    result
}

impl Engine {
    /// Store a new draft.
    pub fn create_job(&self, new: NewJob) -> Result<Job> {
        timed("create", || {
            let Committed { job, seq, .. } = self.store.create(new)?;
            info!(job.id = %job.id, client = %job.client_id, "job created");
            metrics::jobs_created().add(1, &[KeyValue::new("category", job.category.clone())]);
            self.bus.publish(seq, EventKind::JobCreated {
                job: Box::new(job.clone()),
            });
            Ok(job)
        })
    }

    /// `draft` → `posted`. Stamps `published_at` on first publication.
    pub fn post(&self, job_id: JobId) -> Result<Job> {
        timed("post", || {
            let span = start_operation_span("post", &job_id);
            let _enter = span.enter();

            let Committed { job, output: from, seq } = self.store.mutate(job_id, |job| {
                let from = transition(job, "post", JobStatus::Posted)?;
                job.published_at.get_or_insert_with(Utc::now);
                Ok(from)
            })?;

            record_state_transition(&span, from, job.status);
            self.bus.publish(seq, EventKind::JobPosted {
                job: Box::new(job.clone()),
            });
            Ok(job)
        })
    }

    /// Append a `pending` proposal to a `posted` job.
    ///
    /// Multiple proposals from one submitter are allowed.
    pub fn submit_proposal(&self, job_id: JobId, new: NewProposal) -> Result<(Job, Proposal)> {
        timed("submit_proposal", || {
            let span = start_operation_span("submit_proposal", &job_id);
            let _enter = span.enter();

            let result = new.validate().and_then(|()| {
                self.store.mutate(job_id, |job| {
                    if job.status != JobStatus::Posted {
                        return Err(Error::transition("submit proposal", job.status));
                    }
                    let proposal = new.into_proposal(Utc::now());
                    job.proposals.push(proposal.clone());
                    Ok(proposal)
                })
            });
            let outcome = if result.is_ok() { "ok" } else { "rejected" };
            metrics::proposals_submitted().add(1, &[KeyValue::new("result", outcome)]);
            let Committed {
                job,
                output: proposal,
                seq,
            } = result?;

            info!(
                proposal.id = %proposal.id,
                submitter = %proposal.submitter_id,
                amount = proposal.amount,
                "proposal submitted"
            );
            self.bus.publish(seq, EventKind::JobApplied {
                job: Box::new(job.clone()),
                proposal: Box::new(proposal.clone()),
            });
            Ok((job, proposal))
        })
    }

    /// Award the job to one proposal and reject every other one, atomically.
    ///
    /// Of several concurrent calls on the same job at most one succeeds; the
    /// rest observe the job as `active` and fail with `InvalidTransition`.
    pub fn accept_proposal(&self, job_id: JobId, proposal_id: ProposalId) -> Result<(Job, Proposal)> {
        timed("accept_proposal", || {
            let span = start_operation_span("accept_proposal", &job_id);
            let _enter = span.enter();

            let Committed {
                job,
                output: (from, accepted),
                seq,
            } = self.store.mutate(job_id, |job| {
                let status = job
                    .proposal(proposal_id)
                    .map(|p| p.status)
                    .ok_or_else(|| proposal_not_found(job_id, proposal_id))?;
                if job.status != JobStatus::Posted {
                    return Err(Error::transition("accept proposal", job.status));
                }
                if status != ProposalStatus::Pending {
                    return Err(Error::transition("accept proposal", status));
                }

                let from = transition(job, "accept proposal", JobStatus::Active)?;
                for p in &mut job.proposals {
                    p.status = if p.id == proposal_id {
                        ProposalStatus::Accepted
                    } else {
                        ProposalStatus::Rejected
                    };
                }
                let accepted = job
                    .proposal(proposal_id)
                    .cloned()
                    .ok_or_else(|| proposal_not_found(job_id, proposal_id))?;
                job.engineer_id = Some(accepted.submitter_id.clone());
                job.engineer_name = Some(accepted.submitter_name.clone());
                Ok((from, accepted))
            })?;

            record_state_transition(&span, from, job.status);
            info!(
                proposal.id = %proposal_id,
                engineer = %accepted.submitter_id,
                rejected = job.proposals.len() - 1,
                "proposal accepted"
            );
            self.bus.publish(seq, EventKind::ProposalAccepted {
                job: Box::new(job.clone()),
                proposal: Box::new(accepted.clone()),
            });
            Ok((job, accepted))
        })
    }

    /// Withdraw a still-pending proposal from a `posted` job.
    pub fn withdraw_proposal(
        &self,
        job_id: JobId,
        proposal_id: ProposalId,
    ) -> Result<(Job, Proposal)> {
        timed("withdraw_proposal", || {
            let Committed {
                job,
                output: withdrawn,
                seq,
            } = self.store.mutate(job_id, |job| {
                let job_status = job.status;
                let proposal = job
                    .proposal_mut(proposal_id)
                    .ok_or_else(|| proposal_not_found(job_id, proposal_id))?;
                if job_status != JobStatus::Posted {
                    return Err(Error::transition("withdraw proposal", job_status));
                }
                if proposal.status != ProposalStatus::Pending {
                    return Err(Error::transition("withdraw proposal", proposal.status));
                }
                proposal.status = ProposalStatus::Withdrawn;
                Ok(proposal.clone())
            })?;

            info!(job.id = %job_id, proposal.id = %proposal_id, "proposal withdrawn");
            self.bus.publish(seq, EventKind::ProposalWithdrawn {
                job: Box::new(job.clone()),
                proposal: Box::new(withdrawn.clone()),
            });
            Ok((job, withdrawn))
        })
    }

    /// `active` → `completed`. Stamps `completed_at`.
    pub fn complete(&self, job_id: JobId) -> Result<Job> {
        timed("complete", || {
            let span = start_operation_span("complete", &job_id);
            let _enter = span.enter();

            let Committed { job, output: from, seq } = self.store.mutate(job_id, |job| {
                let from = transition(job, "complete", JobStatus::Completed)?;
                job.completed_at = Some(Utc::now());
                Ok(from)
            })?;

            record_state_transition(&span, from, job.status);
            self.bus.publish(seq, EventKind::JobCompleted {
                job: Box::new(job.clone()),
            });
            Ok(job)
        })
    }

    /// Cancel from `draft`, `posted` or `active`. The reason only travels
    /// on the event.
    pub fn cancel(&self, job_id: JobId, reason: Option<String>) -> Result<Job> {
        timed("cancel", || {
            let span = start_operation_span("cancel", &job_id);
            let _enter = span.enter();

            let Committed { job, output: from, seq } = self
                .store
                .mutate(job_id, |job| transition(job, "cancel", JobStatus::Cancelled))?;

            record_state_transition(&span, from, job.status);
            info!(reason = reason.as_deref().unwrap_or("-"), "job cancelled");
            self.bus.publish(seq, EventKind::JobCancelled {
                job: Box::new(job.clone()),
                reason,
            });
            Ok(job)
        })
    }

    /// `posted` → `expired`. Never triggered by the engine itself; callers
    /// own any staleness policy.
    pub fn expire(&self, job_id: JobId) -> Result<Job> {
        timed("expire", || {
            let span = start_operation_span("expire", &job_id);
            let _enter = span.enter();

            let Committed { job, output: from, seq } = self
                .store
                .mutate(job_id, |job| transition(job, "expire", JobStatus::Expired))?;

            record_state_transition(&span, from, job.status);
            self.bus.publish(seq, EventKind::JobExpired {
                job: Box::new(job.clone()),
            });
            Ok(job)
        })
    }

    /// Edit a job that is still `draft` or `posted`.
    ///
    /// Once a proposal has been accepted the job is `active` and every edit,
    /// budget and timeline included, fails with `InvalidTransition`.
    pub fn update(&self, job_id: JobId, patch: JobPatch) -> Result<Job> {
        timed("update", || {
            patch.validate()?;
            let touches_terms = patch.touches_terms();

            let Committed { job, seq, .. } = self.store.mutate(job_id, |job| {
                if !job.status.is_editable() {
                    return Err(Error::transition("update", job.status));
                }
                patch.apply(job);
                Ok(())
            })?;

            info!(job.id = %job_id, touches_terms, "job updated");
            self.bus.publish(seq, EventKind::JobUpdated {
                job: Box::new(job.clone()),
            });
            Ok(job)
        })
    }

    /// Move milestone `index` of an `active` job one step forward.
    pub fn advance_milestone(
        &self,
        job_id: JobId,
        index: usize,
        to: MilestoneStatus,
    ) -> Result<Job> {
        timed("advance_milestone", || {
            let Committed { job, output: from, seq } = self.store.mutate(job_id, |job| {
                if job.status != JobStatus::Active {
                    return Err(Error::transition("advance milestone", job.status));
                }
                let milestone = job.milestones.get_mut(index).ok_or_else(|| {
                    Error::NotFound(format!("milestone {index} on job {job_id}"))
                })?;
                let from = milestone.status;
                if from.next() != Some(to) {
                    return Err(Error::transition(&format!("move milestone to {to}"), from));
                }
                milestone.status = to;
                Ok(from)
            })?;

            info!(job.id = %job_id, index, %from, %to, "milestone advanced");
            self.bus.publish(seq, EventKind::JobUpdated {
                job: Box::new(job.clone()),
            });
            Ok(job)
        })
    }
}
