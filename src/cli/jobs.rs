//! Jobs command

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Settings;
use crate::error::Result;
use crate::models::display::JobRunDisplay;
use crate::output::{self, table};
use crate::storage::SqliteStore;

pub fn run(opts: &GlobalOptions, limit: usize) -> Result<()> {
    let path = opts.apply(Settings::from_env()).resolve_database_path()?;
    if !path.exists() {
        if opts.format == OutputFormat::Json {
            return output::print_json::<[JobRunDisplay]>(&[]);
        }
        println!(
            "{} No database at {} yet; run 'ekodash refresh' first",
            "○".dimmed(),
            path.display()
        );
        return Ok(());
    }

    let runs = SqliteStore::open_at(&path)?.recent_job_runs(limit)?;
    match opts.format {
        OutputFormat::Json => output::print_json(&runs)?,
        _ => {
            let rows: Vec<JobRunDisplay> = runs.iter().map(JobRunDisplay::from).collect();
            println!("{}", table::format_table(&rows));
        }
    }

    Ok(())
}
