//! Per-participant summary metrics.
//!
//! Counts and totals are derived from a store snapshot. Rating and
//! response rate are not owned by this engine: they stay `None` unless a
//! [`ReputationSource`] supplies them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Job, JobStatus};

/// Which side of a job the participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Provider,
}

impl Role {
    fn participates(self, job: &Job, participant_id: &str) -> bool {
        match self {
            Role::Client => job.client_id == participant_id,
            Role::Provider => job.engineer_id.as_deref() == Some(participant_id),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Provider => write!(f, "provider"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "provider" | "engineer" => Ok(Role::Provider),
            other => Err(Error::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_jobs: usize,
    pub posted_jobs: usize,
    pub active_jobs: usize,
    pub completed_jobs: usize,
    pub cancelled_jobs: usize,
    /// Sum of budget ceilings of completed jobs.
    pub total_earnings: f64,
    /// `None` means unavailable, not zero.
    pub average_rating: Option<f64>,
    pub response_rate: Option<f64>,
}

/// Reputation figures owned by another service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reputation {
    pub average_rating: Option<f64>,
    pub response_rate: Option<f64>,
}

/// Collaborator that knows ratings and response rates.
pub trait ReputationSource: Send + Sync {
    fn reputation(&self, participant_id: &str, role: Role) -> Option<Reputation>;
}

pub fn stats_for(jobs: &[Job], participant_id: &str, role: Role) -> UserStats {
    let mut stats = UserStats::default();
    for job in jobs.iter().filter(|j| role.participates(j, participant_id)) {
        stats.total_jobs += 1;
        match job.status {
            JobStatus::Posted => stats.posted_jobs += 1,
            JobStatus::Active => stats.active_jobs += 1,
            JobStatus::Completed => {
                stats.completed_jobs += 1;
                stats.total_earnings += job.budget.max;
            }
            JobStatus::Cancelled => stats.cancelled_jobs += 1,
            _ => {}
        }
    }
    stats
}

impl UserStats {
    pub fn with_reputation(mut self, reputation: Option<Reputation>) -> Self {
        if let Some(r) = reputation {
            self.average_rating = r.average_rating;
            self.response_rate = r.response_rate;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Budget, NewJob};
    use chrono::Utc;

    fn job(client: &str, engineer: Option<&str>, status: JobStatus, max: f64) -> Job {
        let mut job = NewJob::new(client, "Client", "Work")
            .budget(Budget::new(0.0, max))
            .into_job(Utc::now());
        job.engineer_id = engineer.map(str::to_string);
        job.status = status;
        job
    }

    #[test]
    fn counts_by_role() {
        let jobs = vec![
            job("c1", Some("e1"), JobStatus::Completed, 500.0),
            job("c1", Some("e2"), JobStatus::Active, 300.0),
            job("c1", None, JobStatus::Posted, 100.0),
            job("c2", Some("e1"), JobStatus::Completed, 250.0),
        ];

        let client = stats_for(&jobs, "c1", Role::Client);
        assert_eq!(client.total_jobs, 3);
        assert_eq!(client.active_jobs, 1);
        assert_eq!(client.posted_jobs, 1);
        assert_eq!(client.completed_jobs, 1);
        assert_eq!(client.total_earnings, 500.0);

        let provider = stats_for(&jobs, "e1", Role::Provider);
        assert_eq!(provider.total_jobs, 2);
        assert_eq!(provider.completed_jobs, 2);
        assert_eq!(provider.total_earnings, 750.0);
        assert_eq!(provider.average_rating, None);
        assert_eq!(provider.response_rate, None);
    }

    #[test]
    fn reputation_is_merged_when_available() {
        let stats = UserStats::default().with_reputation(Some(Reputation {
            average_rating: Some(4.5),
            response_rate: Some(0.9),
        }));
        assert_eq!(stats.average_rating, Some(4.5));
        assert_eq!(stats.response_rate, Some(0.9));
    }
}
