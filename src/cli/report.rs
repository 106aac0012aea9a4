//! Report command: macro assessment from the newest stored snapshots

use colored::{ColoredString, Colorize};

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::display::DataPointDisplay;
use crate::output::{self, formatters, table};
use crate::report::{self, Assessment, Level};
use crate::storage::{SnapshotReader, SqliteStore};

pub fn run(opts: &GlobalOptions, markdown: bool) -> Result<()> {
    let path = opts.apply(Settings::from_env()).resolve_database_path()?;
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "No database at {}; run 'ekodash refresh' first",
            path.display()
        )));
    }

    let rows = SqliteStore::open_at(&path)?.latest_snapshots()?;
    let assessment = report::assess(&rows);

    if markdown {
        print!("{}", assessment.to_markdown());
        return Ok(());
    }

    let points = DataPointDisplay::rows(&assessment.data_points);
    match opts.format {
        OutputFormat::Json => output::print_json(&assessment)?,
        OutputFormat::Table => println!("{}", table::format_table(&points)),
        OutputFormat::Pretty => {
            print_assessment(&assessment);
            if !points.is_empty() {
                println!();
                println!("{}", table::format_table(&points));
            }
        }
    }

    Ok(())
}

fn level_label(level: Level) -> ColoredString {
    match level {
        Level::Positive => level.as_str().green(),
        Level::Mixed => level.as_str().yellow(),
        Level::Cautious => level.as_str().red(),
        Level::Unknown => level.as_str().dimmed(),
    }
}

fn print_assessment(assessment: &Assessment) {
    println!("{}\n", "US macro assessment".bold());
    println!(
        "Level: {} (score {})",
        level_label(assessment.level).bold(),
        assessment.score
    );
    if assessment.fetched_at.is_some() {
        println!("Latest fetch: {}", formatters::format_time(assessment.fetched_at));
    }
    println!("Summary: {}", assessment.summary);
    println!();
    println!("{}", "Drivers:".bold());
    for reason in &assessment.reasons {
        println!("  - {}", reason);
    }
}
