//! Ledgerline Test Utilities
//!
//! In-memory stand-ins for every external collaborator, plus fixture
//! builders for fixed-width files.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ledgerline_test_utils::{fixed_width_line, FakeServices};
//!
//! let fakes = FakeServices::new();
//! fakes.store.put("inbox", "PAY_1.txt", fixed_width_line(&[("H", 1), ("20240131", 8)]));
//! let collaborators = fakes.collaborators();
//! ```

pub mod broker;
pub mod fixtures;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use broker::{RecordedSession, RecordingBroker};
pub use fixtures::{fixed_width_file, fixed_width_line, FakeServices};
pub use services::{FixedHashFunction, ScriptedRelationalStore, StaticSecretStore};
pub use storage::MemoryObjectStore;

use std::sync::{Mutex, MutexGuard};

/// Lock that survives a panicking test thread.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
