//! Instrument configuration loaded from YAML

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::models::Module;

/// Default instrument file, relative to the working directory.
pub const DEFAULT_INSTRUMENTS_PATH: &str = "config/instruments.example.yaml";

/// One configured instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Stable identifier used in cache keys and the database
    pub id: String,

    /// Display name
    #[serde(alias = "name_sv")]
    pub name: String,

    /// Ticker (Yahoo) or series code (FRED)
    pub ticker: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_symbol: Option<String>,

    /// Decimal places for displayed values
    #[serde(default = "default_precision")]
    pub precision: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_group: Option<String>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_module")]
    pub module: Module,
}

fn default_precision() -> u32 {
    2
}

fn default_module() -> Module {
    Module::Commodities
}

/// Top-level layout of the instruments file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentsFile {
    pub instruments: Vec<Instrument>,
}

impl InstrumentsFile {
    /// Load and validate an instruments file.
    pub fn load_from(path: &Path) -> Result<Vec<Instrument>> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse instruments from YAML text.
    pub fn parse(contents: &str) -> Result<Vec<Instrument>> {
        let file: InstrumentsFile = serde_yaml::from_str(contents).map_err(ConfigError::from)?;

        let mut seen = std::collections::HashSet::new();
        for instrument in &file.instruments {
            if instrument.id.trim().is_empty() {
                return Err(ConfigError::Invalid("instrument id must not be empty".into()).into());
            }
            if !seen.insert(instrument.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate instrument id '{}'",
                    instrument.id
                ))
                .into());
            }
        }

        Ok(file.instruments)
    }
}

/// Supplies the current instrument list to each refresh tick.
pub trait InstrumentSource: Send + Sync {
    fn load(&self) -> Result<Vec<Instrument>>;
}

/// Re-reads a YAML file on every call, so edits apply on the next tick.
#[derive(Debug, Clone)]
pub struct YamlInstruments {
    path: PathBuf,
}

impl YamlInstruments {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InstrumentSource for YamlInstruments {
    fn load(&self) -> Result<Vec<Instrument>> {
        InstrumentsFile::load_from(&self.path)
    }
}

/// Fixed instrument list.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticInstruments(pub Vec<Instrument>);

#[cfg(test)]
impl InstrumentSource for StaticInstruments {
    fn load(&self) -> Result<Vec<Instrument>> {
        Ok(self.0.clone())
    }
}

/// Instruments belonging to `module`, ordered by `sort_order`.
pub fn for_module(instruments: &[Instrument], module: Module) -> Vec<Instrument> {
    let mut selected: Vec<Instrument> = instruments
        .iter()
        .filter(|item| item.module == module)
        .cloned()
        .collect();
    selected.sort_by_key(|item| item.sort_order);
    selected
}
