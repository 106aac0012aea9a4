//! Series command

use crate::cli::args::GlobalOptions;
use crate::cli::summary::print_header;
use crate::cli::{AppContext, OutputFormat};
use crate::error::Result;
use crate::models::display::SeriesPointDisplay;
use crate::models::{Module, RangeKey};
use crate::output::{self, table};

pub async fn run(opts: &GlobalOptions, module: Module, id: &str, range: RangeKey) -> Result<()> {
    let ctx = AppContext::new(opts)?;
    let response = ctx.dashboard()?.series(module, id, range).await?;

    let rows: Vec<SeriesPointDisplay> = response
        .points
        .iter()
        .map(SeriesPointDisplay::from)
        .collect();
    match ctx.format {
        OutputFormat::Json => output::print_json(&response)?,
        OutputFormat::Table => println!("{}", table::format_numeric_table(&rows, 1)),
        OutputFormat::Pretty => {
            print_header(&format!("{} {}", id, range), &response.meta);
            println!("{}", table::format_numeric_table(&rows, 1));
        }
    }

    Ok(())
}
