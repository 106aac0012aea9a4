//! Cache key layout

use crate::models::{Module, RangeKey};

/// Key holding a module's summary list.
pub fn summary_key(module: Module) -> String {
    format!("{}_summary", module)
}

/// Key holding one instrument's chart series for a range.
///
/// Commodity and equity series share the `series:` prefix; inflation series
/// are kept apart under `inflation_series:`.
pub fn series_key(module: Module, instrument_id: &str, range: RangeKey) -> String {
    let prefix = match module {
        Module::Inflation => "inflation_series",
        Module::Commodities | Module::Mag7 => "series",
    };
    format!("{}:{}:{}", prefix, instrument_id, range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_keys() {
        assert_eq!(summary_key(Module::Commodities), "commodities_summary");
        assert_eq!(summary_key(Module::Mag7), "mag7_summary");
        assert_eq!(summary_key(Module::Inflation), "inflation_summary");
    }

    #[test]
    fn test_series_keys_by_module() {
        assert_eq!(
            series_key(Module::Commodities, "gold", RangeKey::ThreeMonths),
            "series:gold:3m"
        );
        assert_eq!(
            series_key(Module::Inflation, "inflation_us", RangeKey::SixMonths),
            "inflation_series:inflation_us:6m"
        );
    }

    #[test]
    fn test_series_keys_differ_by_range() {
        assert_ne!(
            series_key(Module::Commodities, "gold", RangeKey::OneMonth),
            series_key(Module::Commodities, "gold", RangeKey::OneYear)
        );
    }
}
