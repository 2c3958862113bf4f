use anyhow::Result;
use clap::Args;
use ledgerline_schema::FileSchema;
use std::process::ExitCode;
use tracing::info;

use super::output::print_table;
use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also report which entry this object key resolves to
    #[arg(long)]
    pub key: Option<String>,
}

pub fn run(config: &ConfigArgs, args: &CheckArgs) -> Result<ExitCode> {
    let source = config.config_source()?;
    let catalog = match source.load() {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("Schema document {} is invalid:", source.describe());
            eprintln!("  {} ({})", err, err.reason());
            return Ok(ExitCode::from(1));
        }
    };
    info!(source = %source.describe(), entries = catalog.entries().len(), "Schema document compiled");

    let rows = catalog.entries().iter().map(summary_row).collect();
    print_table(
        &["Entry", "Pattern", "Segments", "Validators", "Constraints", "Producers"],
        rows,
    );

    if let Some(key) = &args.key {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        match catalog.resolve(file_name) {
            Ok(schema) => println!("{} resolves to entry '{}'", key, schema.name),
            Err(err) => {
                eprintln!("{}", err);
                return Ok(ExitCode::from(1));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn summary_row(schema: &FileSchema) -> Vec<String> {
    let segments: Vec<String> = schema
        .segments
        .iter()
        .map(|s| format!("{} ({}, {} fields)", s.name, s.kind.as_str(), s.fields.len()))
        .collect();
    let constraints: Vec<String> = schema
        .constraints
        .iter()
        .map(|c| format!("{} [{}]", c.name, c.kind.name()))
        .collect();
    let producers: Vec<&str> = schema.output.producers.iter().map(|p| p.name()).collect();
    vec![
        schema.name.clone(),
        schema.pattern.as_str().to_string(),
        segments.join("\n"),
        (schema.validators.len() + schema.output.validators.len()).to_string(),
        constraints.join("\n"),
        producers.join(", "),
    ]
}
