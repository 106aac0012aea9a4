//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::{Columns, Rows}},
};

/// Format rows as a rounded table, or a placeholder line when empty
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Like [`format_table`], with the given columns right-aligned for numbers
pub fn format_numeric_table<T: Tabled>(data: &[T], first_numeric: usize) -> String {
    if data.is_empty() {
        return format_table(data);
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(first_numeric..)).with(Alignment::right()))
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}
