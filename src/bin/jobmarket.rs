//! jobmarket CLI: load a fixture into an in-process engine and inspect it.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use jobmarket::config::Config;
use jobmarket::engine::Engine;
use jobmarket::model::{Job, JobId, JobStatus, NewJob, NewProposal, Urgency};
use jobmarket::query::{JobFilters, JobQuery, Page, SortDirection, SortKey};
use jobmarket::stats::Role;
use jobmarket::telemetry::{TelemetryConfig, init_telemetry};
use serde::Deserialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "jobmarket", about = "Job marketplace engine")]
struct Cli {
    /// TOML fixture with `[[job]]` entries
    #[arg(long, global = true, default_value = "jobs.toml")]
    fixture: PathBuf,
    /// Optional TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search, filter, sort and page through jobs
    List {
        /// Free-text search over title, description and tags
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// City substring
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        status: Option<JobStatus>,
        #[arg(long)]
        urgency: Option<Urgency>,
        /// Required skill (repeatable; any match)
        #[arg(long = "skill")]
        skills: Vec<String>,
        #[arg(long)]
        budget_min: Option<f64>,
        #[arg(long)]
        budget_max: Option<f64>,
        /// relevance | date | budget | urgency
        #[arg(long, default_value = "relevance")]
        sort: SortKey,
        /// asc | desc
        #[arg(long, default_value = "desc")]
        direction: SortDirection,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },
    /// Show a job
    Show {
        /// Job ID (full UUID or prefix)
        id: String,
    },
    /// Summary metrics for a participant
    Stats {
        participant: String,
        /// client | provider
        #[arg(long, default_value = "client")]
        role: Role,
    },
    /// Public posted jobs, newest first
    Featured {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Jobs similar to the given one
    Similar {
        id: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Events emitted while loading the fixture
    Events {
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

/// One `[[job]]` entry: the draft plus what to do with it after creation.
#[derive(Debug, Deserialize)]
struct FixtureJob {
    #[serde(flatten)]
    job: NewJob,
    #[serde(default)]
    post: bool,
    #[serde(default, rename = "proposal")]
    proposals: Vec<NewProposal>,
    /// Index into `proposals` to accept.
    accept: Option<usize>,
    #[serde(default)]
    complete: bool,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default, rename = "job")]
    jobs: Vec<FixtureJob>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let _guard = init_telemetry(TelemetryConfig::from_config(&config))?;

    let engine = Engine::new(config.engine_config());
    engine.connect()?;
    load_fixture(&engine, &cli.fixture)?;

    match cli.command {
        Command::List {
            text,
            category,
            city,
            status,
            urgency,
            skills,
            budget_min,
            budget_max,
            sort,
            direction,
            page,
            page_size,
        } => {
            let query = JobQuery {
                text,
                filters: JobFilters {
                    category,
                    location: city,
                    status,
                    urgency,
                    skills,
                    budget_min,
                    budget_max,
                    ..JobFilters::default()
                },
                sort,
                direction,
                page,
                page_size,
            };
            let page = engine.query(&query)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_page(&page);
            }
        }
        Command::Show { id } => {
            let job = engine.get(resolve_id(&engine, &id)?)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                print_job(&job);
            }
        }
        Command::Stats { participant, role } => {
            let stats = engine.stats_for(&participant, role);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                let unavailable = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{v:.2}"));
                println!("Participant: {participant} ({role})");
                println!("Total:       {}", stats.total_jobs);
                println!("Posted:      {}", stats.posted_jobs);
                println!("Active:      {}", stats.active_jobs);
                println!("Completed:   {}", stats.completed_jobs);
                println!("Cancelled:   {}", stats.cancelled_jobs);
                println!("Earnings:    {:.2}", stats.total_earnings);
                println!("Rating:      {}", unavailable(stats.average_rating));
                println!("Response:    {}", unavailable(stats.response_rate));
            }
        }
        Command::Featured { limit } => print_jobs(&engine.featured_jobs(limit), cli.json)?,
        Command::Similar { id, limit } => {
            let jobs = engine.similar_jobs(resolve_id(&engine, &id)?, limit)?;
            print_jobs(&jobs, cli.json)?;
        }
        Command::Events { since } => {
            for event in engine.events_since(since) {
                if cli.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    let job = event.kind.job();
                    println!(
                        "{:>4}  {}  {:<18}  {}  {}",
                        event.seq,
                        event.timestamp.format("%H:%M:%S%.3f"),
                        event.kind.name(),
                        &job.id.to_string()[..8],
                        job.status
                    );
                }
            }
        }
    }

    engine.disconnect()?;
    Ok(())
}

fn load_fixture(engine: &Engine, path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read fixture {}: {e}", path.display()))?;
    let fixture: Fixture = toml::from_str(&raw)?;

    for entry in fixture.jobs {
        let job = engine.create_job(entry.job)?;
        if !entry.post {
            continue;
        }
        engine.post(job.id)?;

        let mut proposal_ids = Vec::with_capacity(entry.proposals.len());
        for proposal in entry.proposals {
            let (_, p) = engine.submit_proposal(job.id, proposal)?;
            proposal_ids.push(p.id);
        }
        if let Some(index) = entry.accept {
            let Some(&proposal_id) = proposal_ids.get(index) else {
                anyhow::bail!("job '{}' accepts proposal {index}, which does not exist", job.title);
            };
            engine.accept_proposal(job.id, proposal_id)?;
            if entry.complete {
                engine.complete(job.id)?;
            }
        }
    }

    info!(jobs = engine.snapshot().len(), fixture = %path.display(), "fixture loaded");
    Ok(())
}

/// Support prefix matching, like `git` short hashes.
fn resolve_id(engine: &Engine, id_str: &str) -> anyhow::Result<JobId> {
    if let Ok(id) = id_str.parse::<JobId>() {
        return Ok(id);
    }
    let jobs = engine.snapshot();
    let matches: Vec<_> = jobs
        .iter()
        .filter(|job| job.id.to_string().starts_with(id_str))
        .collect();
    match matches.len() {
        0 => anyhow::bail!("no job matching prefix '{id_str}'"),
        1 => Ok(matches[0].id),
        n => anyhow::bail!("{n} jobs match prefix '{id_str}', be more specific"),
    }
}

fn print_jobs(jobs: &[Job], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(jobs)?);
        return Ok(());
    }
    print_table(jobs);
    println!("\n{} job(s)", jobs.len());
    Ok(())
}

fn print_page(page: &Page<Job>) {
    if page.items.is_empty() {
        println!("No jobs found.");
        return;
    }
    print_table(&page.items);
    println!(
        "\npage {} ({} per page), {} total{}",
        page.page,
        page.page_size,
        page.total,
        if page.has_more { ", more available" } else { "" }
    );
}

fn print_table(jobs: &[Job]) {
    println!(
        "{:<8}  {:<30}  {:<14}  {:<10}  {:<9}  {:>12}  CREATED",
        "ID", "TITLE", "CATEGORY", "STATUS", "URGENCY", "BUDGET MAX"
    );
    println!("{}", "-".repeat(108));

    for job in jobs {
        let short_id = &job.id.to_string()[..8];
        let title: String = job.title.chars().take(30).collect();
        let category: String = job.category.chars().take(14).collect();
        println!(
            "{:<8}  {:<30}  {:<14}  {:<10}  {:<9}  {:>12.2}  {}",
            short_id,
            title,
            category,
            job.status,
            job.timeline.urgency,
            job.budget.max,
            job.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_job(job: &Job) {
    println!("ID:          {}", job.id);
    println!("Title:       {}", job.title);
    println!("Category:    {}", job.category);
    if let Some(sub) = &job.subcategory {
        println!("Subcategory: {sub}");
    }
    println!("Status:      {}", job.status);
    println!("Visibility:  {}", job.visibility);
    println!("Client:      {} ({})", job.client_name, job.client_id);
    if let (Some(id), Some(name)) = (&job.engineer_id, &job.engineer_name) {
        println!("Engineer:    {name} ({id})");
    }
    println!("City:        {}", job.location.city);
    println!(
        "Budget:      {:.2}-{:.2} {} ({:?})",
        job.budget.min, job.budget.max, job.budget.currency, job.budget.pricing
    );
    println!("Urgency:     {}", job.timeline.urgency);
    if !job.tags.is_empty() {
        println!("Tags:        {}", job.tags.join(", "));
    }
    if !job.requirements.skills.is_empty() {
        println!("Skills:      {}", job.requirements.skills.join(", "));
    }
    println!("Created:     {}", job.created_at);
    println!("Updated:     {}", job.updated_at);
    if let Some(at) = job.published_at {
        println!("Published:   {at}");
    }
    if let Some(at) = job.completed_at {
        println!("Completed:   {at}");
    }
    if !job.milestones.is_empty() {
        println!("---");
        for (i, m) in job.milestones.iter().enumerate() {
            println!("Milestone {i}: {} {:.2} [{}]", m.title, m.amount, m.status);
        }
    }
    if !job.proposals.is_empty() {
        println!("---");
        for p in &job.proposals {
            println!(
                "Proposal {}  {:<20}  {:>10.2}  {:>3}d  {}",
                &p.id.to_string()[..8],
                p.submitter_name,
                p.amount,
                p.timeline_days,
                p.status
            );
        }
    }
}
