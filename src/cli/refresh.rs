//! Refresh command: one tick, then the outcome and health

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{AppContext, OutputFormat};
use crate::error::Result;
use crate::health::HealthReport;
use crate::models::display::{JobRunDisplay, ProviderDisplay};
use crate::models::{JobRunOutcome, JobStatus};
use crate::output::{self, formatters, table};

#[derive(Serialize)]
struct RefreshReport<'a> {
    outcome: &'a JobRunOutcome,
    health: HealthReport,
}

pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = AppContext::new(opts)?;
    let store = ctx.open_store()?;
    let database = ctx.database_path()?;

    let outcome = ctx.refresher(store).refresh_once().await?;
    let health = HealthReport::collect(&ctx.cache, &ctx.monitor)
        .with_database(database.display().to_string());

    let providers: Vec<ProviderDisplay> = health
        .provider_stats
        .iter()
        .map(ProviderDisplay::from)
        .collect();

    match ctx.format {
        OutputFormat::Json => output::print_json(&RefreshReport {
            outcome: &outcome,
            health,
        })?,
        OutputFormat::Table => {
            println!("{}", table::format_table(&[JobRunDisplay::from(&outcome)]));
            println!("{}", table::format_numeric_table(&providers, 1));
        }
        OutputFormat::Pretty => {
            let marker = match outcome.status {
                JobStatus::Success => "✓".green(),
                _ => "⚠".yellow(),
            };
            println!(
                "{} Refresh {} in {} ({} ok, {} failed)",
                marker,
                outcome.status.to_string().bold(),
                formatters::format_duration_ms(outcome.duration_ms),
                outcome.ok_count,
                outcome.fail_count
            );
            if let Some(ref notes) = outcome.notes {
                println!("  {}", notes.dimmed());
            }

            if health.is_stale {
                println!("{} Data is stale (no fresh summary yet)", "✗".red());
            } else {
                println!(
                    "{} Last fresh update {}",
                    "✓".green(),
                    formatters::format_time(health.last_update)
                );
            }
            println!();
            println!("{}", table::format_numeric_table(&providers, 1));
        }
    }

    Ok(())
}
