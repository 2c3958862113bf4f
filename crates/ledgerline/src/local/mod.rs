//! Local collaborators.
//!
//! - [`LocalObjectStore`]: buckets are directories under a storage root
//! - [`FileSecretStore`]: credentials from a JSON file
//! - [`LocalDigestFunction`]: sha2 digests computed in-process
//! - [`SqlxRelationalStore`]: sqlx `Any` driver on a private runtime
//! - [`JsonlBroker`]: one JSON-lines file per broker session

mod broker;
mod digest;
mod relational;
mod secrets;
mod storage;

pub use broker::JsonlBroker;
pub use digest::{digest_hex, LocalDigestFunction};
pub use relational::SqlxRelationalStore;
pub use secrets::FileSecretStore;
pub use storage::LocalObjectStore;

use anyhow::{Context, Result};
use ledgerline_protocol::Collaborators;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the local collaborators keep their state.
#[derive(Debug, Clone)]
pub struct LocalPaths {
    pub storage_root: PathBuf,
    pub secrets_file: Option<PathBuf>,
    pub broker_root: PathBuf,
}

/// Wire every collaborator against the local filesystem.
pub fn local_collaborators(paths: &LocalPaths) -> Result<Collaborators> {
    let relational = SqlxRelationalStore::new().context("Failed to start relational store runtime")?;
    Ok(Collaborators {
        object_store: Arc::new(LocalObjectStore::new(&paths.storage_root)),
        secrets: Arc::new(match &paths.secrets_file {
            Some(path) => FileSecretStore::new(path),
            None => FileSecretStore::empty(),
        }),
        hasher: Arc::new(LocalDigestFunction::new()),
        relational: Arc::new(relational),
        broker: Arc::new(JsonlBroker::new(&paths.broker_root)),
    })
}
