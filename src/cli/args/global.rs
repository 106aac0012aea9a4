//! Global CLI options shared across all commands

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::Settings;

/// Global flags, captured once after parsing.
///
/// Precedence for file locations: CLI flag > environment variable > default.
/// Clap already folds the environment into the flags; [`GlobalOptions::apply`]
/// writes whatever was given over the [`Settings`] read from the environment.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub format: OutputFormat,

    /// Instrument YAML override
    pub instruments: Option<PathBuf>,

    /// SQLite file override
    pub database: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            instruments: cli.instruments.clone(),
            database: cli.database.clone(),
        }
    }

    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(ref path) = self.instruments {
            settings.instruments_path = path.clone();
        }
        if let Some(ref path) = self.database {
            settings.database_path = Some(path.clone());
        }
        settings
    }
}
