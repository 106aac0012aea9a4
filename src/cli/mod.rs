//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::{Module, RangeKey};

pub mod args;
pub mod context;
pub mod instruments;
pub mod jobs;
pub mod refresh;
pub mod report;
pub mod serve;
pub mod series;
pub mod status;
pub mod summary;

pub use args::OutputFormat;
pub use context::AppContext;

/// Ekodash - market and macro dashboard data refresher
#[derive(Parser, Debug)]
#[command(name = "ekodash")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "EKODASH_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Instrument configuration file (YAML)
    #[arg(long, global = true, env = "EKODASH_INSTRUMENTS", hide_env = true)]
    pub instruments: Option<PathBuf>,

    /// SQLite database file for refresh history
    #[arg(long, global = true, env = "EKODASH_DATABASE", hide_env = true)]
    pub database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "EKODASH_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the refresh scheduler until Ctrl-C
    Serve,

    /// Run a single refresh tick and report the outcome
    Refresh,

    /// Show the summary for a module (commodities, mag7, inflation)
    Summary {
        /// Module name
        module: Module,
    },

    /// Show a chart series for one instrument
    Series {
        /// Module name (commodities, inflation)
        module: Module,

        /// Instrument id from the instrument configuration
        id: String,

        /// Time range (1m, 3m, 6m, 1y)
        #[arg(long, short = 'r', default_value = "1y")]
        range: RangeKey,
    },

    /// List configured instruments
    Instruments {
        /// Only instruments of this module
        #[arg(long, short = 'm')]
        module: Option<Module>,
    },

    /// Show recent refresh job runs
    Jobs {
        /// Maximum number of runs to show
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,
    },

    /// Show database location, latest job run and provider stats
    Status,

    /// Assess the US macro picture from the newest stored snapshots
    Report {
        /// Print a Markdown document instead of the selected format
        #[arg(long)]
        markdown: bool,
    },

    /// Display version information
    Version,
}
