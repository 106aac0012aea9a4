//! Summary and series share the response header printed in pretty mode

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::cli::{AppContext, OutputFormat};
use crate::error::Result;
use crate::models::Module;
use crate::models::display::SummaryDisplay;
use crate::output::{self, formatters, table};
use crate::services::{ResponseMeta, StaleReason};

pub async fn run(opts: &GlobalOptions, module: Module) -> Result<()> {
    let ctx = AppContext::new(opts)?;
    let response = ctx.dashboard()?.summary(module).await?;

    let rows: Vec<SummaryDisplay> = response.items.iter().map(SummaryDisplay::from).collect();
    match ctx.format {
        OutputFormat::Json => output::print_json(&response)?,
        OutputFormat::Table => println!("{}", table::format_numeric_table(&rows, 2)),
        OutputFormat::Pretty => {
            print_header(module.as_str(), &response.meta);
            println!("{}", table::format_numeric_table(&rows, 2));
        }
    }

    Ok(())
}

/// One status line above a table.
pub(crate) fn print_header(title: &str, meta: &ResponseMeta) {
    let freshness = match meta.stale_reason {
        StaleReason::None => format!("{} fresh", "✓".green()),
        StaleReason::ProviderError => {
            format!("{} some values stale (provider error)", "⚠".yellow())
        }
        StaleReason::GlobalThreshold => format!("{} stale (no recent update)", "✗".red()),
    };
    let origin = if meta.cached {
        format!("cached {} ago", formatters::format_age(meta.age_seconds))
    } else {
        "fetched now".to_string()
    };

    println!(
        "{}  {}  {}  {}",
        title.bold(),
        meta.source.dimmed(),
        origin.dimmed(),
        freshness
    );
}
