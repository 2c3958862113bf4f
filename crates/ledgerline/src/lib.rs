//! Ledgerline command line support.
//!
//! The binary runs the pipeline outside any cloud environment. [`local`]
//! supplies filesystem- and process-backed collaborators so a single
//! invocation can be replayed against a directory tree.

pub mod local;

pub use local::{
    digest_hex, local_collaborators, FileSecretStore, JsonlBroker, LocalDigestFunction, LocalObjectStore,
    LocalPaths, SqlxRelationalStore,
};
