//! Instruments command

use log::debug;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::{InstrumentsFile, Settings, instruments::for_module};
use crate::error::Result;
use crate::models::Module;
use crate::models::display::InstrumentDisplay;
use crate::output;

pub fn run(opts: &GlobalOptions, module: Option<Module>) -> Result<()> {
    let settings = opts.apply(Settings::from_env());
    debug!("Loading instruments from {}", settings.instruments_path.display());

    let mut instruments = InstrumentsFile::load_from(&settings.instruments_path)?;
    if let Some(module) = module {
        instruments = for_module(&instruments, module);
    }

    match opts.format {
        OutputFormat::Json => output::print_json(&instruments)?,
        format => {
            let rows: Vec<InstrumentDisplay> =
                instruments.iter().map(InstrumentDisplay::from).collect();
            output::print(&rows, format)?;
        }
    }

    Ok(())
}
