//! Terminal tables for command output.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

/// Build a table with highlighted headers.
pub fn build_table<S: AsRef<str>>(headers: &[S], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h.as_ref()).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    for row in rows {
        table.add_row(row);
    }
    table
}

pub fn print_table<S: AsRef<str>>(headers: &[S], rows: Vec<Vec<String>>) {
    println!("{}", build_table(headers, rows));
}
