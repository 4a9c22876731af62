//! Proposals: provider bids against a posted job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Attachment, ProposalId, is_blank, is_valid_amount};
use crate::error::{Error, Result};

/// A bid submitted by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub submitter_id: String,
    pub submitter_name: String,
    /// Rating captured when the proposal was submitted. Not kept in sync
    /// with the reputation service.
    pub submitter_rating: Option<f64>,
    pub amount: f64,
    pub timeline_days: u32,
    pub cover_letter: String,
    pub attachments: Vec<Attachment>,
    pub status: ProposalStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Withdrawn => "withdrawn",
        };
        write!(f, "{s}")
    }
}

/// Builder for proposals. The engine assigns the id, status and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProposal {
    pub submitter_id: String,
    pub submitter_name: String,
    #[serde(default)]
    pub submitter_rating: Option<f64>,
    pub amount: f64,
    pub timeline_days: u32,
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl NewProposal {
    pub fn new(
        submitter_id: impl Into<String>,
        submitter_name: impl Into<String>,
        amount: f64,
        timeline_days: u32,
    ) -> Self {
        Self {
            submitter_id: submitter_id.into(),
            submitter_name: submitter_name.into(),
            submitter_rating: None,
            amount,
            timeline_days,
            cover_letter: String::new(),
            attachments: Vec::new(),
        }
    }

    pub fn cover_letter(mut self, text: impl Into<String>) -> Self {
        self.cover_letter = text.into();
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.submitter_rating = Some(rating);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if is_blank(&self.submitter_id) || is_blank(&self.submitter_name) {
            return Err(Error::InvalidInput(
                "proposal requires submitter id and name".to_string(),
            ));
        }
        if !is_valid_amount(self.amount) {
            return Err(Error::InvalidInput(format!(
                "proposal amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        if self.timeline_days == 0 {
            return Err(Error::InvalidInput(
                "proposal timeline must be at least one day".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_proposal(self, submitted_at: DateTime<Utc>) -> Proposal {
        Proposal {
            id: ProposalId::new(),
            submitter_id: self.submitter_id,
            submitter_name: self.submitter_name,
            submitter_rating: self.submitter_rating,
            amount: self.amount,
            timeline_days: self.timeline_days,
            cover_letter: self.cover_letter,
            attachments: self.attachments,
            status: ProposalStatus::Pending,
            submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_submitter() {
        let err = NewProposal::new(" ", "Ana", 100.0, 3).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn rejects_nan_amount_and_zero_days() {
        assert!(NewProposal::new("p1", "Ana", f64::NAN, 3).validate().is_err());
        assert!(NewProposal::new("p1", "Ana", 10.0, 0).validate().is_err());
    }

    #[test]
    fn new_proposal_starts_pending() {
        let p = NewProposal::new("p1", "Ana", 100.0, 3).into_proposal(Utc::now());
        assert_eq!(p.status, ProposalStatus::Pending);
    }
}
