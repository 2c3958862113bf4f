use anyhow::{Context, Result};
use clap::Args;
use ledgerline_protocol::ParsedTable;
use ledgerline_worker::parse_file;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use super::output::print_table;
use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Object key used to pick the schema entry
    #[arg(long)]
    pub key: String,

    /// Local file to parse
    #[arg(long)]
    pub file: PathBuf,

    /// Rows shown per segment
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run(config: &ConfigArgs, args: &ParseArgs) -> Result<ExitCode> {
    let catalog = config.config_source()?.load().context("Failed to load schema document")?;
    let file_name = args.key.rsplit('/').next().unwrap_or(&args.key);
    let schema = catalog.resolve(file_name)?;

    let body = fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let text = String::from_utf8_lossy(&body);
    let tables = parse_file(&schema.segments, &text, &args.key)?;

    println!("Entry '{}' ({} segments)", schema.name, tables.len());
    for segment in &schema.segments {
        if let Some(table) = tables.get(&segment.name) {
            print_segment(table, args.limit);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_segment(table: &ParsedTable, limit: usize) {
    println!();
    println!("{} ({} rows)", table.name(), table.row_count());
    let headers: Vec<&str> = table.field_names().collect();
    let rows = (0..table.row_count().min(limit))
        .map(|row| {
            table
                .columns()
                .iter()
                .map(|c| c.values[row].as_ref().map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();
    print_table(&headers, rows);
    if table.row_count() > limit {
        println!("... {} more rows", table.row_count() - limit);
    }
}
