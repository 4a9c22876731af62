//! In-memory job store.
//!
//! Single source of truth for all job state. One `RwLock` per store:
//! writers (`create`, `mutate`) are serialized, readers copy out and
//! release immediately. All writes go through the engine.
//!
//! Every successful write is stamped with a commit sequence number taken
//! under the write lock, so sequence order is commit order.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::*;

/// Storage backend. Owns every job.
#[derive(Debug, Default)]
pub struct JobStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    jobs: HashMap<JobId, Job>,
    /// Creation order, for stable snapshots.
    order: Vec<JobId>,
    /// Last commit sequence number handed out.
    commits: u64,
}

impl Tables {
    fn next_commit(&mut self) -> u64 {
        self.commits += 1;
        self.commits
    }
}

/// Result of a committed write.
#[derive(Debug, Clone)]
pub struct Committed<R> {
    /// The job as stored after the write.
    pub job: Job,
    /// Whatever the write closure returned.
    pub output: R,
    /// Store-wide commit sequence number, starting at 1.
    pub seq: u64,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a draft, assign identity and timestamps, store it as `draft`.
    pub fn create(&self, new: NewJob) -> Result<Committed<()>> {
        new.validate()?;
        let job = new.into_job(Utc::now());

        let mut tables = self.inner.write();
        let seq = tables.next_commit();
        tables.order.push(job.id);
        tables.jobs.insert(job.id, job.clone());
        Ok(Committed {
            job,
            output: (),
            seq,
        })
    }

    /// Get a job by ID.
    pub fn get(&self, id: JobId) -> Result<Job> {
        self.inner
            .read()
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("job {id}")))
    }

    /// Apply `f` to one job atomically with respect to every other writer.
    ///
    /// `f` works on a copy. The copy replaces the stored job (with a fresh
    /// `updated_at`) only if `f` returns `Ok`; on `Err` the store is left
    /// exactly as it was and no sequence number is consumed.
    pub fn mutate<R, F>(&self, id: JobId, f: F) -> Result<Committed<R>>
    where
        F: FnOnce(&mut Job) -> Result<R>,
    {
        let mut tables = self.inner.write();
        let stored = tables
            .jobs
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("job {id}")))?;

        let mut working = stored.clone();
        let output = f(&mut working)?;
        working.updated_at = Utc::now();
        *stored = working.clone();
        let seq = tables.next_commit();
        Ok(Committed {
            job: working,
            output,
            seq,
        })
    }

    /// Independent copy of every job, in creation order.
    pub fn snapshot(&self) -> Vec<Job> {
        let tables = self.inner.read();
        tables
            .order
            .iter()
            .filter_map(|id| tables.jobs.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> NewJob {
        NewJob::new("client-1", "Dana", title).budget(Budget::new(100.0, 200.0))
    }

    #[test]
    fn create_assigns_identity_and_draft_status() {
        let store = JobStore::new();
        let job = store.create(draft("Fence repair")).unwrap().job;
        assert_eq!(job.status, JobStatus::Draft);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.published_at.is_none());
        assert_eq!(store.get(job.id).unwrap(), job);
    }

    #[test]
    fn create_rejects_missing_client() {
        let store = JobStore::new();
        let err = store
            .create(NewJob::new("", "Dana", "Fence repair"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = JobStore::new();
        assert!(matches!(store.get(JobId::new()), Err(Error::NotFound(_))));
    }

    #[test]
    fn failed_mutation_leaves_job_untouched() {
        let store = JobStore::new();
        let job = store.create(draft("Fence repair")).unwrap().job;

        let result: Result<Committed<()>> = store.mutate(job.id, |j| {
            j.title = "half-applied".to_string();
            Err(Error::Other("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.get(job.id).unwrap(), job);
    }

    #[test]
    fn successful_mutation_stamps_updated_at() {
        let store = JobStore::new();
        let job = store.create(draft("Fence repair")).unwrap().job;

        let updated = store
            .mutate(job.id, |j| {
                j.title = "Gate repair".to_string();
                Ok(())
            })
            .unwrap()
            .job;
        assert_eq!(updated.title, "Gate repair");
        assert!(updated.updated_at >= job.updated_at);
        assert_eq!(store.get(job.id).unwrap(), updated);
    }

    #[test]
    fn snapshot_keeps_creation_order_and_is_independent() {
        let store = JobStore::new();
        let a = store.create(draft("a")).unwrap().job;
        let b = store.create(draft("b")).unwrap().job;

        let mut snap = store.snapshot();
        assert_eq!(
            snap.iter().map(|j| j.id).collect::<Vec<_>>(),
            vec![a.id, b.id]
        );

        snap[0].title = "changed".to_string();
        assert_eq!(store.get(a.id).unwrap().title, "a");
    }

    #[test]
    fn commit_sequence_counts_only_successful_writes() {
        let store = JobStore::new();
        let first = store.create(draft("a")).unwrap();
        assert_eq!(first.seq, 1);

        let failed: Result<Committed<()>> =
            store.mutate(first.job.id, |_| Err(Error::Other("no".to_string())));
        assert!(failed.is_err());
        assert!(store.create(NewJob::new("", "Dana", "x")).is_err());

        let second = store.mutate(first.job.id, |_| Ok(())).unwrap();
        assert_eq!(second.seq, 2);
        assert_eq!(store.create(draft("b")).unwrap().seq, 3);
    }
}
