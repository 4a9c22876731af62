//! Integration tests for search, filtering, sorting and pagination.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jobmarket::engine::Engine;
use jobmarket::error::ErrorKind;
use jobmarket::model::*;
use jobmarket::query::{self, JobFilters, JobQuery, SortDirection, SortKey};
use proptest::prelude::*;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// Create jobs through the engine, then pin `created_at` so ordering is
/// deterministic. Job `i` is `i` hours newer than job 0.
fn catalog(engine: &Engine, drafts: Vec<NewJob>) -> Vec<Job> {
    for draft in drafts {
        engine.create_job(draft).unwrap();
    }
    let mut jobs = engine.snapshot();
    for (i, job) in jobs.iter_mut().enumerate() {
        job.created_at = base_time() + Duration::hours(i as i64);
    }
    jobs
}

fn marketplace() -> Vec<Job> {
    let engine = Engine::in_memory();
    catalog(
        &engine,
        vec![
            NewJob::new("c1", "Dana", "Lot line survey")
                .category("Surveying")
                .city("Portland")
                .budget(Budget::new(1_000.0, 2_000.0)),
            NewJob::new("c2", "Eve", "Panel upgrade")
                .category("Electrical")
                .city("Salem")
                .urgency(Urgency::Emergency)
                .skill("wiring")
                .budget(Budget::new(3_000.0, 4_500.0)),
            NewJob::new("c1", "Dana", "Topographic survey")
                .category("surveying")
                .city("Portland")
                .description("Drone capture of a hillside lot")
                .budget(Budget::new(5_000.0, 9_000.0)),
            NewJob::new("c3", "Fay", "Bathroom tile")
                .category("Tiling")
                .city("Eugene")
                .tag("bathroom")
                .urgency(Urgency::Priority)
                .budget(Budget::new(800.0, 1_200.0)),
            NewJob::new("c4", "Gus", "Boundary staking")
                .category("Surveying")
                .city("Bend")
                .budget(Budget::new(600.0, 900.0)),
            NewJob::new("c5", "Hal", "Septic site survey")
                .category("Excavation")
                .city("Medford")
                .budget(Budget::new(2_000.0, 3_000.0)),
            NewJob::new("c4", "Gus", "Corner monument reset")
                .category("Surveying")
                .city("Bend")
                .description("Re-survey two lot corners after grading")
                .budget(Budget::new(1_500.0, 2_500.0)),
        ],
    )
}

#[test]
fn survey_text_within_category_first_page_is_newest_two() {
    let jobs = marketplace();

    // "Boundary staking" is Surveying without the word; "Septic site
    // survey" has the word outside the category. Neither may match.
    let q = JobQuery::default()
        .text("survey")
        .filters(JobFilters {
            category: Some("Surveying".to_string()),
            ..JobFilters::default()
        })
        .sort(SortKey::CreatedAt, SortDirection::Descending)
        .page(1, 2);
    let page = query::query(&jobs, &q).unwrap();

    assert_eq!(page.total, 3);
    assert!(page.has_more);
    let titles: Vec<_> = page.items.iter().map(|j| j.title.as_str()).collect();
    assert_eq!(titles, ["Corner monument reset", "Topographic survey"]);

    let second = query::query(&jobs, &q.clone().page(2, 2)).unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(!second.has_more);
    assert_eq!(second.items[0].title, "Lot line survey");
}

#[test]
fn category_filter_alone_includes_jobs_without_the_word() {
    let jobs = marketplace();
    let q = JobQuery::default().filters(JobFilters {
        category: Some("surveying".to_string()),
        ..JobFilters::default()
    });
    assert_eq!(query::query(&jobs, &q).unwrap().total, 4);
}

#[test]
fn query_does_not_modify_input() {
    let jobs = marketplace();
    let before = jobs.clone();

    let q = JobQuery::default()
        .text("survey")
        .sort(SortKey::Budget, SortDirection::Ascending);
    query::query(&jobs, &q).unwrap();

    assert_eq!(jobs, before);
}

#[test]
fn text_search_covers_title_description_and_tags() {
    let jobs = marketplace();

    assert_eq!(query::search(&jobs, Some("DRONE")).len(), 1);
    assert_eq!(query::search(&jobs, Some("bathroom")).len(), 1);
    assert_eq!(query::search(&jobs, Some("survey")).len(), 4);
    assert_eq!(query::search(&jobs, Some("   ")).len(), jobs.len());
    assert_eq!(query::search(&jobs, None).len(), jobs.len());
    assert!(query::search(&jobs, Some("plumbing")).is_empty());
}

#[test]
fn filters_combine() {
    let jobs = marketplace();

    let in_portland = JobFilters {
        location: Some("portland".to_string()),
        ..JobFilters::default()
    };
    assert_eq!(query::filter(&jobs, &in_portland).len(), 2);

    let affordable = JobFilters {
        budget_max: Some(1_000.0),
        ..JobFilters::default()
    };
    let titles: Vec<_> = query::filter(&jobs, &affordable)
        .into_iter()
        .map(|j| j.title)
        .collect();
    assert_eq!(titles, ["Lot line survey", "Bathroom tile", "Boundary staking"]);

    let electrician = JobFilters {
        skills: vec!["WIRING".to_string(), "plumbing".to_string()],
        urgency: Some(Urgency::Emergency),
        ..JobFilters::default()
    };
    assert_eq!(query::filter(&jobs, &electrician).len(), 1);

    let window = JobFilters {
        created_from: Some(base_time() + Duration::hours(1)),
        created_to: Some(base_time() + Duration::hours(3)),
        ..JobFilters::default()
    };
    assert_eq!(query::filter(&jobs, &window).len(), 3);

    let nothing_posted = JobFilters {
        status: Some(JobStatus::Posted),
        ..JobFilters::default()
    };
    assert!(query::filter(&jobs, &nothing_posted).is_empty());
}

#[test]
fn sort_by_budget_and_urgency() {
    let jobs = marketplace();

    let by_budget = query::sort(&jobs, SortKey::Budget, SortDirection::Descending);
    assert_eq!(by_budget[0].title, "Topographic survey");
    assert_eq!(by_budget.last().unwrap().title, "Boundary staking");

    let by_urgency = query::sort(&jobs, SortKey::Urgency, SortDirection::Descending);
    assert_eq!(by_urgency[0].timeline.urgency, Urgency::Emergency);
    assert_eq!(by_urgency[1].timeline.urgency, Urgency::Priority);
    // Ties keep input order.
    assert_eq!(by_urgency[2].title, "Lot line survey");
}

#[test]
fn relevance_is_newest_first_regardless_of_direction() {
    let jobs = marketplace();
    let sorted = query::sort(&jobs, SortKey::Relevance, SortDirection::Ascending);
    assert_eq!(sorted[0].title, "Corner monument reset");
}

#[test]
fn engine_query_rejects_page_zero() {
    let engine = Engine::in_memory();
    let err = engine
        .query(&JobQuery::default().page(0, 10))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn engine_query_sees_committed_state() {
    let engine = Engine::in_memory();
    let job = engine
        .create_job(NewJob::new("c1", "Dana", "Shed roof").category("Roofing"))
        .unwrap();
    engine.post(job.id).unwrap();

    let q = JobQuery::default().filters(JobFilters {
        status: Some(JobStatus::Posted),
        ..JobFilters::default()
    });
    let page = engine.query(&q).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, job.id);
}

#[test]
fn default_listing_is_unrestricted_until_visibility_is_filtered() {
    let engine = Engine::in_memory();
    let public = engine
        .create_job(NewJob::new("c1", "Dana", "Gazebo"))
        .unwrap();
    engine.post(public.id).unwrap();
    let private = engine
        .create_job(NewJob::new("c1", "Dana", "Vault").visibility(Visibility::Private))
        .unwrap();
    engine.post(private.id).unwrap();
    engine
        .create_job(NewJob::new("c1", "Dana", "Invite only").visibility(Visibility::InviteOnly))
        .unwrap();

    assert_eq!(engine.query(&JobQuery::default()).unwrap().total, 3);

    let storefront = JobQuery::default().filters(JobFilters {
        visibility: Some(Visibility::Public),
        status: Some(JobStatus::Posted),
        ..JobFilters::default()
    });
    let page = engine.query(&storefront).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, public.id);
}

proptest! {
    #[test]
    fn pages_partition_the_input(len in 0usize..60, page_size in 1usize..15) {
        let items: Vec<usize> = (0..len).collect();
        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let p = query::paginate(&items, page, page_size).unwrap();
            prop_assert_eq!(p.total, len);
            prop_assert!(p.items.len() <= page_size);
            seen.extend(p.items);
            if !p.has_more {
                break;
            }
            page += 1;
        }
        prop_assert_eq!(seen, items);
    }
}
