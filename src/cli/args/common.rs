//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - tables with a colored status header
    #[default]
    Pretty,
    /// Table format - rows only, no header
    Table,
    /// JSON format - structured for scripts, wrapped in a metadata envelope
    Json,
}
