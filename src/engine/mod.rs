//! Core engine. The public API collaborators call.
//!
//! The engine owns the job store and the notification bus. All state
//! transitions go through [`lifecycle`]; reads work on snapshots so no
//! query or stats scan ever holds the store lock.

pub mod connection;
pub mod lifecycle;

use std::collections::HashSet;
use std::sync::Arc;

use opentelemetry::KeyValue;
use serde::Serialize;
use tokio::sync::broadcast;

pub use connection::ReconnectPolicy;

use crate::error::{Error, Result};
use crate::event::{Event, NotificationBus};
use crate::model::*;
use crate::query::{self, JobQuery, Page};
use crate::stats::{self, ReputationSource, Role, UserStats};
use crate::storage::JobStore;
use crate::telemetry::metrics;
use connection::Connection;

/// Engine tuning, usually built from [`crate::config::Config::engine_config`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Broadcast channel capacity. Slow subscribers lag past this.
    pub event_buffer: usize,
    /// Events retained for [`Engine::events_since`].
    pub event_journal: usize,
    pub reconnect: ReconnectPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_buffer: 1024,
            event_journal: 4096,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// A proposal together with the job it was submitted against.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedProposal {
    pub job_id: JobId,
    pub job_title: String,
    pub proposal: Proposal,
}

/// The marketplace engine. Owns all state and enforces all invariants.
///
/// `Send + Sync`; share it as `Arc<Engine>`.
pub struct Engine {
    store: JobStore,
    bus: NotificationBus,
    connection: Connection,
    reputation: Option<Arc<dyn ReputationSource>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: JobStore::new(),
            bus: NotificationBus::new(config.event_buffer, config.event_journal),
            connection: Connection::new(config.reconnect),
            reputation: None,
        }
    }

    /// Engine with default settings and an empty store.
    pub fn in_memory() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Merge ratings and response rates from `source` into [`Engine::stats_for`].
    pub fn with_reputation(mut self, source: Arc<dyn ReputationSource>) -> Self {
        self.reputation = Some(source);
        self
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Get a job by ID.
    pub fn get(&self, id: JobId) -> Result<Job> {
        self.store.get(id)
    }

    /// Point-in-time copy of every job, in creation order.
    pub fn snapshot(&self) -> Vec<Job> {
        self.store.snapshot()
    }

    /// Search, filter, sort and paginate. The entry point for listing UIs.
    ///
    /// Visibility is the caller's policy: jobs of every visibility and
    /// status match unless `q.filters` narrows them.
    pub fn query(&self, q: &JobQuery) -> Result<Page<Job>> {
        let snapshot = self.store.snapshot();
        let page = query::query(&snapshot, q)?;
        metrics::queries().add(1, &[KeyValue::new("sort", format!("{:?}", q.sort))]);
        Ok(page)
    }

    pub fn stats_for(&self, participant_id: &str, role: Role) -> UserStats {
        let snapshot = self.store.snapshot();
        let stats = stats::stats_for(&snapshot, participant_id, role);
        match &self.reputation {
            Some(source) => stats.with_reputation(source.reputation(participant_id, role)),
            None => stats,
        }
    }

    /// Jobs posted by a client, newest first.
    pub fn jobs_for_client(&self, client_id: &str) -> Vec<Job> {
        newest_first(
            self.store
                .snapshot()
                .into_iter()
                .filter(|j| j.client_id == client_id)
                .collect(),
        )
    }

    /// Jobs awarded to a provider, newest first.
    pub fn jobs_for_engineer(&self, engineer_id: &str) -> Vec<Job> {
        newest_first(
            self.store
                .snapshot()
                .into_iter()
                .filter(|j| j.engineer_id.as_deref() == Some(engineer_id))
                .collect(),
        )
    }

    /// Public, posted jobs, most recently published first.
    pub fn featured_jobs(&self, limit: usize) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|j| j.status == JobStatus::Posted && j.visibility == Visibility::Public)
            .collect();
        jobs.sort_by(|a, b| {
            let a_at = a.published_at.unwrap_or(a.created_at);
            let b_at = b.published_at.unwrap_or(b.created_at);
            b_at.cmp(&a_at)
        });
        jobs.truncate(limit);
        jobs
    }

    /// Public jobs sharing the category or any tag with `job_id`, newest
    /// first, excluding the job itself.
    pub fn similar_jobs(&self, job_id: JobId, limit: usize) -> Result<Vec<Job>> {
        let snapshot = self.store.snapshot();
        let target = snapshot
            .iter()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;

        let tags: HashSet<String> = target.tags.iter().map(|t| t.to_lowercase()).collect();
        let category = target.category.clone();

        let mut similar: Vec<Job> = snapshot
            .iter()
            .filter(|j| j.id != job_id && j.visibility == Visibility::Public)
            .filter(|j| {
                (!category.is_empty() && j.category.eq_ignore_ascii_case(&category))
                    || j.tags.iter().any(|t| tags.contains(&t.to_lowercase()))
            })
            .cloned()
            .collect();
        similar = newest_first(similar);
        similar.truncate(limit);
        Ok(similar)
    }

    /// Every proposal a provider has submitted, across all jobs.
    pub fn proposals_by_submitter(&self, submitter_id: &str) -> Vec<SubmittedProposal> {
        self.store
            .snapshot()
            .into_iter()
            .flat_map(|job| {
                let job_id = job.id;
                let job_title = job.title;
                job.proposals
                    .into_iter()
                    .filter(|p| p.submitter_id == submitter_id)
                    .map(move |proposal| SubmittedProposal {
                        job_id,
                        job_title: job_title.clone(),
                        proposal,
                    })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Live event stream. Events arrive after the change has committed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Journaled events after sequence number `since`.
    pub fn events_since(&self, since: u64) -> Vec<Event> {
        self.bus.events_since(since)
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    jobs
}
