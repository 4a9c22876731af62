//! Structured events emitted by the engine after every committed change.
//!
//! Consumers subscribe to the bus to drive UI refreshes, messaging or
//! analytics. Events are published only once the store's write lock has
//! been released, so a slow subscriber can never hold up a mutation.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::model::{Job, Proposal};

/// A structured event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Store commit sequence number. Contiguous, so consumers can detect gaps.
    pub seq: u64,
    /// When this event was published.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    JobCreated {
        job: Box<Job>,
    },
    JobPosted {
        job: Box<Job>,
    },
    JobApplied {
        job: Box<Job>,
        proposal: Box<Proposal>,
    },
    ProposalAccepted {
        job: Box<Job>,
        proposal: Box<Proposal>,
    },
    ProposalWithdrawn {
        job: Box<Job>,
        proposal: Box<Proposal>,
    },
    JobCompleted {
        job: Box<Job>,
    },
    JobCancelled {
        job: Box<Job>,
        reason: Option<String>,
    },
    JobExpired {
        job: Box<Job>,
    },
    JobUpdated {
        job: Box<Job>,
    },
}

impl EventKind {
    /// The job carried by every event.
    pub fn job(&self) -> &Job {
        match self {
            EventKind::JobCreated { job }
            | EventKind::JobPosted { job }
            | EventKind::JobApplied { job, .. }
            | EventKind::ProposalAccepted { job, .. }
            | EventKind::ProposalWithdrawn { job, .. }
            | EventKind::JobCompleted { job }
            | EventKind::JobCancelled { job, .. }
            | EventKind::JobExpired { job }
            | EventKind::JobUpdated { job } => job,
        }
    }

    /// Stable wire name, matching the serde tag.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::JobCreated { .. } => "job_created",
            EventKind::JobPosted { .. } => "job_posted",
            EventKind::JobApplied { .. } => "job_applied",
            EventKind::ProposalAccepted { .. } => "proposal_accepted",
            EventKind::ProposalWithdrawn { .. } => "proposal_withdrawn",
            EventKind::JobCompleted { .. } => "job_completed",
            EventKind::JobCancelled { .. } => "job_cancelled",
            EventKind::JobExpired { .. } => "job_expired",
            EventKind::JobUpdated { .. } => "job_updated",
        }
    }
}

/// Post-commit fan-out of engine events.
///
/// Live subscribers receive events over a broadcast channel. A bounded
/// journal of recent events lets late subscribers catch up by sequence
/// number.
///
/// Events carry the store's commit sequence number. Writers may reach the
/// bus in a different order than they committed, so an event is held back
/// until every lower sequence number has been published; subscribers and
/// the journal always see commit order with no gaps.
pub struct NotificationBus {
    sender: broadcast::Sender<Event>,
    state: Mutex<BusState>,
    journal_capacity: usize,
}

struct BusState {
    /// Next sequence number to release.
    next_seq: u64,
    /// Published ahead of a lower, still-missing sequence number.
    held: BTreeMap<u64, Event>,
    journal: VecDeque<Event>,
}

impl NotificationBus {
    pub fn new(buffer: usize, journal_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self {
            sender,
            state: Mutex::new(BusState {
                next_seq: 1,
                held: BTreeMap::new(),
                journal: VecDeque::with_capacity(journal_capacity),
            }),
            journal_capacity,
        }
    }

    /// Publish the event for commit `seq`. Must not be called while holding
    /// the store lock.
    ///
    /// Returns the event; delivery waits until `seq` is next in line.
    pub fn publish(&self, seq: u64, kind: EventKind) -> Event {
        let event = Event {
            seq,
            timestamp: Utc::now(),
            kind,
        };

        let mut state = self.state.lock();
        if seq < state.next_seq || state.held.contains_key(&seq) {
            warn!(seq, "duplicate event sequence dropped");
            return event;
        }
        state.held.insert(seq, event.clone());

        loop {
            let next = state.next_seq;
            let Some(ready) = state.held.remove(&next) else {
                break;
            };
            state.next_seq += 1;
            if self.journal_capacity > 0 {
                if state.journal.len() == self.journal_capacity {
                    state.journal.pop_front();
                }
                state.journal.push_back(ready.clone());
            }
            debug!(
                seq = ready.seq,
                event = ready.kind.name(),
                job.id = %ready.kind.job().id,
                "event published"
            );
            // Sent under the lock so receivers see sequence order.
            // No receivers is fine.
            let _ = self.sender.send(ready);
        }
        event
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Journaled events with `seq > since`, oldest first.
    pub fn events_since(&self, since: u64) -> Vec<Event> {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|e| e.seq > since)
            .cloned()
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NotificationBus")
            .field("next_seq", &state.next_seq)
            .field("held", &state.held.len())
            .field("journal_capacity", &self.journal_capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
