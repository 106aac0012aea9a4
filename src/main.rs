//! Ekodash - market and macro dashboard data refresher

use anyhow::Context;
use clap::Parser;

mod cache;
mod cli;
mod client;
mod clock;
mod config;
mod error;
mod health;
mod metrics;
mod models;
mod output;
mod report;
mod scheduler;
mod services;
mod storage;

use cli::args::GlobalOptions;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);
    let name = command_name(&cli.command);

    let result = match cli.command {
        Commands::Serve => cli::serve::run(&opts).await,
        Commands::Refresh => cli::refresh::run(&opts).await,
        Commands::Summary { module } => cli::summary::run(&opts, module).await,
        Commands::Series { module, id, range } => cli::series::run(&opts, module, &id, range).await,
        Commands::Instruments { module } => cli::instruments::run(&opts, module),
        Commands::Jobs { limit } => cli::jobs::run(&opts, limit),
        Commands::Status => cli::status::run(&opts),
        Commands::Report { markdown } => cli::report::run(&opts, markdown),
        Commands::Version => {
            println!("ekodash version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    result.with_context(|| format!("'{}' failed", name))
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Serve => "serve",
        Commands::Refresh => "refresh",
        Commands::Summary { .. } => "summary",
        Commands::Series { .. } => "series",
        Commands::Instruments { .. } => "instruments",
        Commands::Jobs { .. } => "jobs",
        Commands::Status => "status",
        Commands::Report { .. } => "report",
        Commands::Version => "version",
    }
}
