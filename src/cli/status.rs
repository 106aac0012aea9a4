//! Status command: database location, last run and provider counters

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Settings;
use crate::error::Result;
use crate::models::JobStatus;
use crate::models::display::ProviderDisplay;
use crate::output::{self, formatters, table};
use crate::storage::{JobRunRecord, ProviderEventRecord, SqliteStore};

#[derive(Debug, Serialize)]
struct StatusReport {
    database: PathBuf,
    database_exists: bool,
    instruments: PathBuf,
    scheduler_enabled: bool,
    refresh_interval_seconds: u64,
    latest_job: Option<JobRunRecord>,
    provider_stats: Vec<ProviderEventRecord>,
}

pub fn run(opts: &GlobalOptions) -> Result<()> {
    let settings = opts.apply(Settings::from_env());
    let database = settings.resolve_database_path()?;
    let database_exists = database.exists();

    let (latest_job, provider_stats) = if database_exists {
        let store = SqliteStore::open_at(&database)?;
        (
            store.recent_job_runs(1)?.into_iter().next(),
            store.latest_provider_stats()?,
        )
    } else {
        (None, Vec::new())
    };

    let report = StatusReport {
        database,
        database_exists,
        instruments: settings.instruments_path.clone(),
        scheduler_enabled: settings.scheduler_enabled,
        refresh_interval_seconds: settings.refresh_interval_seconds,
        latest_job,
        provider_stats,
    };

    if opts.format == OutputFormat::Json {
        return output::print_json(&report);
    }

    println!("{}\n", "Ekodash Status".bold());
    println!("Database: {}", report.database.display().to_string().cyan());
    println!("Instruments: {}", report.instruments.display().to_string().cyan());
    println!();

    if report.scheduler_enabled {
        println!(
            "{} Scheduler enabled (every {}s)",
            "✓".green(),
            report.refresh_interval_seconds
        );
    } else {
        println!("{} Scheduler disabled", "○".dimmed());
    }

    if !report.database_exists {
        println!("{} Database not created yet", "○".dimmed());
        println!("  → Run 'ekodash refresh' to populate it");
        return Ok(());
    }

    match report.latest_job {
        Some(ref job) => {
            let marker = match job.status {
                JobStatus::Success => "✓".green(),
                JobStatus::Partial => "⚠".yellow(),
                JobStatus::Running => "○".dimmed(),
                JobStatus::Failed => "✗".red(),
            };
            println!(
                "{} Last refresh {} at {} ({} ok, {} failed)",
                marker,
                job.status,
                formatters::format_time(Some(job.started_at)),
                job.ok_count,
                job.fail_count
            );
        }
        None => println!("{} No refresh runs recorded", "○".dimmed()),
    }

    if !report.provider_stats.is_empty() {
        let rows: Vec<ProviderDisplay> = report
            .provider_stats
            .iter()
            .map(ProviderDisplay::from)
            .collect();
        println!();
        println!("{}", table::format_numeric_table(&rows, 1));
    }
    println!();

    Ok(())
}
