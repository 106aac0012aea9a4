//! Serve command: run the refresh scheduler until interrupted

use colored::Colorize;
use log::info;

use crate::cli::AppContext;
use crate::cli::args::GlobalOptions;
use crate::error::Result;

pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = AppContext::new(opts)?;

    if !ctx.settings.scheduler_enabled {
        eprintln!(
            "{} Scheduler disabled by EKODASH_DISABLE_SCHEDULER, nothing to run",
            "⚠".yellow()
        );
        return Ok(());
    }

    let store = ctx.open_store()?;
    let scheduler = ctx.scheduler(store);
    scheduler.start();

    eprintln!(
        "{} Refreshing every {}s into {}",
        "✓".green(),
        scheduler.interval().as_secs(),
        ctx.database_path()?.display().to_string().cyan()
    );
    eprintln!("  Press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, waiting for the current tick");
    scheduler.stop().await;
    eprintln!("{} Scheduler stopped", "✓".green());

    Ok(())
}
