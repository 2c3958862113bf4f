use anyhow::{Context, Result};
use clap::Args;
use ledgerline::{local_collaborators, LocalPaths};
use ledgerline_protocol::InvocationEvent;
use ledgerline_worker::Executor;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use uuid::Uuid;

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Bucket the source file landed in
    #[arg(long)]
    pub bucket: String,

    /// Object key of the source file
    #[arg(long)]
    pub key: String,

    /// Request id echoed in the response (random when omitted)
    #[arg(long)]
    pub request_id: Option<String>,

    /// Parent directory for per-invocation scratch files
    #[arg(long, env = "LEDGERLINE_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// JSON file of `name -> {username, password}` credentials
    #[arg(long, env = "LEDGERLINE_SECRETS_FILE")]
    pub secrets_file: Option<PathBuf>,

    /// Directory receiving broker sessions as JSON-lines files
    #[arg(long, env = "LEDGERLINE_BROKER_ROOT", default_value = "broker")]
    pub broker_root: PathBuf,
}

/// Exit code for a response status: 0 success, 2 invalid data, 1 otherwise.
pub fn exit_code(status_code: u16) -> u8 {
    match status_code {
        200 => 0,
        400 => 2,
        _ => 1,
    }
}

pub fn run(config: &ConfigArgs, args: &RunArgs) -> Result<ExitCode> {
    let collaborators = local_collaborators(&LocalPaths {
        storage_root: config.storage_root.clone(),
        secrets_file: args.secrets_file.clone(),
        broker_root: args.broker_root.clone(),
    })?;
    let mut executor = Executor::new(config.config_source()?, collaborators);
    if let Some(dir) = &args.work_dir {
        executor = executor.with_work_dir(dir);
    }

    let request_id = args
        .request_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let event = InvocationEvent::new(args.bucket.clone(), args.key.clone(), request_id);
    let response = executor.execute(&event);
    info!(
        status = response.status_code(),
        kind = response.kind(),
        "Invocation finished"
    );

    let rendered = serde_json::to_string_pretty(&response).context("Failed to encode response")?;
    println!("{}", rendered);
    Ok(ExitCode::from(exit_code(response.status_code())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_status() {
        assert_eq!(exit_code(200), 0);
        assert_eq!(exit_code(400), 2);
        assert_eq!(exit_code(500), 1);
    }
}
