//! Display models for table and JSON output
//!
//! Display models flatten domain types into CLI-friendly rows with column
//! names and pre-formatted values.

mod instrument;
mod job;
mod provider;
mod quote;
mod report;

pub use instrument::InstrumentDisplay;
pub use job::JobRunDisplay;
pub use provider::ProviderDisplay;
pub use quote::{SeriesPointDisplay, SummaryDisplay};
pub use report::DataPointDisplay;
