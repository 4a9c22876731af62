//! Jobs and their embedded value types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{JobId, Proposal, ProposalId, is_blank, is_valid_amount};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A job posting tracked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier.
    pub id: JobId,

    pub title: String,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// Display order is preserved; matching ignores it.
    pub tags: Vec<String>,

    pub client_id: String,
    pub client_name: String,
    /// Set when a proposal is accepted.
    pub engineer_id: Option<String>,
    pub engineer_name: Option<String>,

    pub location: Location,
    pub budget: Budget,
    pub timeline: Timeline,
    pub requirements: Requirements,
    pub visibility: Visibility,

    pub milestones: Vec<Milestone>,
    /// Submission order. Append-only; only statuses change afterwards.
    pub proposals: Vec<Proposal>,
    pub attachments: Vec<Attachment>,

    /// Current lifecycle status.
    pub status: JobStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// First entry into `posted`.
    pub published_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.id == id)
    }

    pub(crate) fn proposal_mut(&mut self, id: ProposalId) -> Option<&mut Proposal> {
        self.proposals.iter_mut().find(|p| p.id == id)
    }

    /// The accepted proposal, if any.
    pub fn accepted_proposal(&self) -> Option<&Proposal> {
        self.proposals
            .iter()
            .find(|p| p.status == super::ProposalStatus::Accepted)
    }

    /// Advisory total of milestone amounts. Never compared against the budget.
    pub fn milestone_total(&self) -> f64 {
        self.milestones.iter().map(|m| m.amount).sum()
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet visible to providers.
    Draft,
    /// Open for proposals.
    Posted,
    /// A proposal was accepted; work is under way.
    Active,
    /// Part of the shared vocabulary; no engine operation enters it.
    Pending,
    /// Done. Terminal.
    Completed,
    /// Withdrawn by the client or an operator. Terminal.
    Cancelled,
    /// Closed without an accepted proposal. Terminal.
    Expired,
}

impl JobStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Draft, Posted)
                | (Draft, Cancelled)
                | (Posted, Active)      // proposal accepted
                | (Posted, Cancelled)
                | (Posted, Expired)     // externally triggered
                | (Active, Completed)
                | (Active, Cancelled)
        )
    }

    /// Is this a terminal status?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Expired
        )
    }

    /// Descriptive fields may only be edited before work starts.
    pub fn is_editable(self) -> bool {
        matches!(self, JobStatus::Draft | JobStatus::Posted)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Draft => "draft",
            JobStatus::Posted => "posted",
            JobStatus::Active => "active",
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(JobStatus::Draft),
            "posted" => Ok(JobStatus::Posted),
            "active" => Ok(JobStatus::Active),
            "pending" => Ok(JobStatus::Pending),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" | "canceled" => Ok(JobStatus::Cancelled),
            "expired" => Ok(JobStatus::Expired),
            other => Err(Error::InvalidInput(format!("unknown job status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub address: String,
    pub coordinates: Option<Coordinates>,
    pub city: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pricing {
    #[default]
    Fixed,
    Hourly,
    Milestone,
}

/// Budget range. `min <= max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub pricing: Pricing,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency: default_currency(),
            pricing: Pricing::Fixed,
        }
    }
}

impl Budget {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    pub fn pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Does `[min, max]` intersect this budget? Missing bounds are open.
    pub fn overlaps(&self, min: Option<f64>, max: Option<f64>) -> bool {
        let lower_ok = max.is_none_or(|max| self.min <= max);
        let upper_ok = min.is_none_or(|min| self.max >= min);
        lower_ok && upper_ok
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !is_valid_amount(self.min) || !is_valid_amount(self.max) {
            return Err(Error::InvalidInput(
                "budget bounds must be non-negative numbers".to_string(),
            ));
        }
        if self.min > self.max {
            return Err(Error::InvalidInput(format!(
                "budget minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Urgency tier. Declaration order is the sort order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Standard,
    Priority,
    Emergency,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Urgency::Standard => "standard",
            Urgency::Priority => "priority",
            Urgency::Emergency => "emergency",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Urgency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Urgency::Standard),
            "priority" => Ok(Urgency::Priority),
            "emergency" => Ok(Urgency::Emergency),
            other => Err(Error::InvalidInput(format!("unknown urgency: {other}"))),
        }
    }
}

/// Schedule for the work. `start_date <= end_date` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeline {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub estimated_days: u32,
    pub urgency: Urgency,
}

impl Timeline {
    pub(crate) fn validate(&self) -> Result<()> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(Error::InvalidInput(format!(
                "timeline start {start} is after end {end}"
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    pub experience: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub special: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    InviteOnly,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::InviteOnly => "invite_only",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "invite_only" => Ok(Visibility::InviteOnly),
            other => Err(Error::InvalidInput(format!("unknown visibility: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MilestoneStatus,
}

impl Milestone {
    pub fn new(title: impl Into<String>, amount: f64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            amount,
            due_date: None,
            status: MilestoneStatus::Pending,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Approved,
}

impl MilestoneStatus {
    /// Milestones only move forward, one step at a time.
    pub fn next(self) -> Option<MilestoneStatus> {
        match self {
            MilestoneStatus::Pending => Some(MilestoneStatus::InProgress),
            MilestoneStatus::InProgress => Some(MilestoneStatus::Completed),
            MilestoneStatus::Completed => Some(MilestoneStatus::Approved),
            MilestoneStatus::Approved => None,
        }
    }
}

impl std::fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Approved => "approved",
        };
        write!(f, "{s}")
    }
}

/// Opaque file reference. The engine never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for new jobs. The engine's public API for creating drafts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub client_id: String,
    pub client_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl NewJob {
    pub fn new(
        client_id: impl Into<String>,
        client_name: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            title: title.into(),
            description: String::new(),
            category: String::new(),
            subcategory: None,
            tags: Vec::new(),
            location: Location::default(),
            budget: Budget::default(),
            timeline: Timeline::default(),
            requirements: Requirements::default(),
            visibility: Visibility::Public,
            milestones: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.location.city = city.into();
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.timeline.urgency = urgency;
        self
    }

    pub fn requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn skill(mut self, skill: impl Into<String>) -> Self {
        self.requirements.skills.push(skill.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn milestone(mut self, milestone: Milestone) -> Self {
        self.milestones.push(milestone);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if is_blank(&self.client_id) || is_blank(&self.client_name) {
            return Err(Error::InvalidInput(
                "job requires client id and name".to_string(),
            ));
        }
        if is_blank(&self.title) {
            return Err(Error::InvalidInput("job requires a title".to_string()));
        }
        self.budget.validate()?;
        self.timeline.validate()?;
        validate_milestones(&self.milestones)
    }

    pub(crate) fn into_job(self, now: DateTime<Utc>) -> Job {
        Job {
            id: JobId::new(),
            title: self.title,
            description: self.description,
            category: self.category,
            subcategory: self.subcategory,
            tags: self.tags,
            client_id: self.client_id,
            client_name: self.client_name,
            engineer_id: None,
            engineer_name: None,
            location: self.location,
            budget: self.budget,
            timeline: self.timeline,
            requirements: self.requirements,
            visibility: self.visibility,
            milestones: self.milestones,
            proposals: Vec::new(),
            attachments: self.attachments,
            status: JobStatus::Draft,
            created_at: now,
            updated_at: now,
            published_at: None,
            completed_at: None,
        }
    }
}

fn validate_milestones(milestones: &[Milestone]) -> Result<()> {
    for m in milestones {
        if is_blank(&m.title) {
            return Err(Error::InvalidInput("milestone requires a title".to_string()));
        }
        if !is_valid_amount(m.amount) {
            return Err(Error::InvalidInput(format!(
                "milestone '{}' amount must be a non-negative number",
                m.title
            )));
        }
        if m.status != MilestoneStatus::Pending {
            return Err(Error::InvalidInput(format!(
                "milestone '{}' must start pending, got {}",
                m.title, m.status
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Replacement values for an editable job. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub location: Option<Location>,
    pub budget: Option<Budget>,
    pub timeline: Option<Timeline>,
    pub requirements: Option<Requirements>,
    pub visibility: Option<Visibility>,
    pub milestones: Option<Vec<Milestone>>,
    pub attachments: Option<Vec<Attachment>>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.subcategory.is_none()
            && self.tags.is_none()
            && self.location.is_none()
            && self.budget.is_none()
            && self.timeline.is_none()
            && self.requirements.is_none()
            && self.visibility.is_none()
            && self.milestones.is_none()
            && self.attachments.is_none()
    }

    /// Does this patch touch the commercial terms proposals were priced on?
    pub fn touches_terms(&self) -> bool {
        self.budget.is_some() || self.timeline.is_some()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput("patch has no changes".to_string()));
        }
        if self.title.as_deref().is_some_and(is_blank) {
            return Err(Error::InvalidInput("job requires a title".to_string()));
        }
        if let Some(budget) = &self.budget {
            budget.validate()?;
        }
        if let Some(timeline) = &self.timeline {
            timeline.validate()?;
        }
        if let Some(milestones) = &self.milestones {
            validate_milestones(milestones)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, job: &mut Job) {
        if let Some(v) = self.title {
            job.title = v;
        }
        if let Some(v) = self.description {
            job.description = v;
        }
        if let Some(v) = self.category {
            job.category = v;
        }
        if let Some(v) = self.subcategory {
            job.subcategory = v;
        }
        if let Some(v) = self.tags {
            job.tags = v;
        }
        if let Some(v) = self.location {
            job.location = v;
        }
        if let Some(v) = self.budget {
            job.budget = v;
        }
        if let Some(v) = self.timeline {
            job.timeline = v;
        }
        if let Some(v) = self.requirements {
            job.requirements = v;
        }
        if let Some(v) = self.visibility {
            job.visibility = v;
        }
        if let Some(v) = self.milestones {
            job.milestones = v;
        }
        if let Some(v) = self.attachments {
            job.attachments = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use JobStatus::*;
        assert!(Draft.can_transition_to(Posted));
        assert!(Posted.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Posted.can_transition_to(Expired));
        assert!(!Draft.can_transition_to(Active));
        assert!(!Draft.can_transition_to(Expired));
        assert!(!Active.can_transition_to(Posted));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use JobStatus::*;
        let all = [Draft, Posted, Active, Pending, Completed, Cancelled, Expired];
        for from in [Completed, Cancelled, Expired] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn urgency_orders_by_tier() {
        assert!(Urgency::Standard < Urgency::Priority);
        assert!(Urgency::Priority < Urgency::Emergency);
    }

    #[test]
    fn budget_overlap_with_open_bounds() {
        let b = Budget::new(12_000.0, 15_000.0);
        assert!(b.overlaps(Some(14_000.0), Some(20_000.0)));
        assert!(b.overlaps(None, Some(12_000.0)));
        assert!(!b.overlaps(Some(15_001.0), None));
        assert!(!b.overlaps(Some(1.0), Some(11_999.0)));
        assert!(b.overlaps(None, None));
    }

    #[test]
    fn budget_min_above_max_is_invalid() {
        assert!(Budget::new(10.0, 5.0).validate().is_err());
        assert!(Budget::new(5.0, 5.0).validate().is_ok());
    }

    #[test]
    fn timeline_start_after_end_is_invalid() {
        let t = Timeline {
            start_date: NaiveDate::from_ymd_opt(2025, 3, 2),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            ..Timeline::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(JobPatch::default().validate().is_err());
    }

    #[test]
    fn status_parses_both_spellings() {
        assert_eq!("Canceled".parse::<JobStatus>().unwrap(), JobStatus::Cancelled);
        assert!("bogus".parse::<JobStatus>().is_err());
    }
}
