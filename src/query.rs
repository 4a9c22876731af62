//! Search, filter, sort and pagination over a store snapshot.
//!
//! Everything here is a pure function of its arguments. Inputs are borrowed
//! and never modified; results are fresh vectors of cloned jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Job, JobStatus, Urgency, Visibility};

/// Conjunctive filter. Every `None` (or empty `skills`) predicate is
/// vacuously true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFilters {
    /// Exact category, ignoring ASCII case.
    pub category: Option<String>,
    /// Substring of the job's city, ignoring case.
    pub location: Option<String>,
    /// Requested budget range; matches jobs whose range intersects it.
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub urgency: Option<Urgency>,
    pub status: Option<JobStatus>,
    /// Substring of the experience requirement, ignoring case.
    pub experience: Option<String>,
    /// Matches if the job requires any of these skills.
    pub skills: Vec<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub visibility: Option<Visibility>,
}

impl JobFilters {
    pub fn matches(&self, job: &Job) -> bool {
        if self
            .category
            .as_ref()
            .is_some_and(|c| !job.category.eq_ignore_ascii_case(c))
        {
            return false;
        }
        if self
            .location
            .as_ref()
            .is_some_and(|l| !contains_ignore_case(&job.location.city, l))
        {
            return false;
        }
        if !job.budget.overlaps(self.budget_min, self.budget_max) {
            return false;
        }
        if self.urgency.is_some_and(|u| job.timeline.urgency != u) {
            return false;
        }
        if self.status.is_some_and(|s| job.status != s) {
            return false;
        }
        if self
            .experience
            .as_ref()
            .is_some_and(|e| !contains_ignore_case(&job.requirements.experience, e))
        {
            return false;
        }
        if !self.skills.is_empty() {
            let any = self.skills.iter().any(|wanted| {
                job.requirements
                    .skills
                    .iter()
                    .any(|have| have.eq_ignore_ascii_case(wanted))
            });
            if !any {
                return false;
            }
        }
        if self.created_from.is_some_and(|from| job.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| job.created_at > to) {
            return false;
        }
        if self.visibility.is_some_and(|v| job.visibility != v) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// No scoring model exists; behaves as newest first.
    #[default]
    Relevance,
    CreatedAt,
    /// Budget ceiling.
    Budget,
    Urgency,
}

impl std::str::FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortKey::Relevance),
            "date" | "created" | "created_at" => Ok(SortKey::CreatedAt),
            "budget" => Ok(SortKey::Budget),
            "urgency" => Ok(SortKey::Urgency),
            other => Err(Error::InvalidInput(format!("unknown sort key: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl std::str::FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(Error::InvalidInput(format!("unknown sort direction: {other}"))),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the full result set before pagination.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

/// Everything a listing screen asks for in one call.
///
/// The default query applies no visibility or status filter: private,
/// invite-only and draft jobs are included. Public storefronts set
/// `filters.visibility` and `filters.status` explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQuery {
    pub text: Option<String>,
    pub filters: JobFilters,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            text: None,
            filters: JobFilters::default(),
            sort: SortKey::Relevance,
            direction: SortDirection::Descending,
            page: 1,
            page_size: 20,
        }
    }
}

impl JobQuery {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn filters(mut self, filters: JobFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn sort(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = key;
        self.direction = direction;
        self
    }

    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Case-insensitive substring match on title, description and tags.
/// Absent or blank text returns the input unchanged.
pub fn search(jobs: &[Job], text: Option<&str>) -> Vec<Job> {
    let needle = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_lowercase(),
        _ => return jobs.to_vec(),
    };
    jobs.iter()
        .filter(|job| {
            job.title.to_lowercase().contains(&needle)
                || job.description.to_lowercase().contains(&needle)
                || job.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

pub fn filter(jobs: &[Job], filters: &JobFilters) -> Vec<Job> {
    jobs.iter().filter(|j| filters.matches(j)).cloned().collect()
}

/// Stable sort; ties keep their input order.
pub fn sort(jobs: &[Job], key: SortKey, direction: SortDirection) -> Vec<Job> {
    let mut sorted = jobs.to_vec();
    let direction = match key {
        SortKey::Relevance => SortDirection::Descending,
        _ => direction,
    };
    sorted.sort_by(|a, b| {
        let ord = match key {
            SortKey::Relevance | SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Budget => a.budget.max.total_cmp(&b.budget.max),
            SortKey::Urgency => a.timeline.urgency.cmp(&b.timeline.urgency),
        };
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    sorted
}

/// 1-indexed page of `items`. Pages past the end are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Result<Page<T>> {
    if page == 0 || page_size == 0 {
        return Err(Error::InvalidInput(format!(
            "page and page size must be positive, got page={page} page_size={page_size}"
        )));
    }
    let total = items.len();
    let start = (page - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    Ok(Page {
        items: items[start..end].to_vec(),
        total,
        page,
        page_size,
        has_more: page.saturating_mul(page_size) < total,
    })
}

/// filter → text search → sort → paginate.
pub fn query(jobs: &[Job], q: &JobQuery) -> Result<Page<Job>> {
    let filtered = filter(jobs, &q.filters);
    let found = search(&filtered, q.text.as_deref());
    let sorted = sort(&found, q.sort, q.direction);
    paginate(&sorted, q.page, q.page_size)
}
