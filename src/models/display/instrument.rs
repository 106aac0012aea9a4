//! Instrument display model

use serde::Serialize;
use tabled::Tabled;

use crate::config::Instrument;

#[derive(Debug, Clone, Tabled, Serialize)]
pub struct InstrumentDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "TICKER")]
    pub ticker: String,

    #[tabled(rename = "MODULE")]
    pub module: String,

    #[tabled(rename = "UNIT")]
    pub unit: String,

    #[tabled(rename = "PRECISION")]
    pub precision: u32,

    #[tabled(rename = "ORDER")]
    pub sort_order: i32,
}

impl From<&Instrument> for InstrumentDisplay {
    fn from(item: &Instrument) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            ticker: item.ticker.clone(),
            module: item.module.to_string(),
            unit: item.unit_label.clone().unwrap_or_default(),
            precision: item.precision,
            sort_order: item.sort_order,
        }
    }
}
