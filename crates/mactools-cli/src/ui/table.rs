//! Table rendering with comfy-table.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{CellAlignment, ContentArrangement, Table};

use super::theme::format_size;

/// A table with the house style: condensed UTF-8 borders, headers, dynamic width.
pub fn build<H, R, C>(headers: &[H], rows: R) -> Table
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<C>>,
    C: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| h.as_ref().to_string()));
    for row in rows {
        table.add_row(row);
    }
    table
}

/// Two-column `label | size` table with right-aligned sizes.
pub fn sizes(rows: &[(&str, u64)]) -> Table {
    let mut table = build(
        &["Location", "Size"],
        rows.iter()
            .map(|(label, bytes)| vec![(*label).to_string(), format_size(*bytes)]),
    );
    if let Some(column) = table.column_mut(1) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
}
