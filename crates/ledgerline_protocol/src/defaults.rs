//! Canonical default values shared across the pipeline.

/// Output group name that produces flat records instead of keyed groups.
pub const ROOT_GROUP: &str = "root";
/// Field name that makes the NaN validators inspect every cell of a segment.
pub const ALL_FIELDS: &str = "ALL";

pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";
pub const DEFAULT_TIMEZONE: &str = "Asia/Singapore";

pub const DEFAULT_HASH_FUNCTION: &str = "FileTransformerHash";
pub const DEFAULT_SQL_PORT: u16 = 3306;
pub const DEFAULT_SQL_ENGINE: &str = "mysql";
pub const FILE_NAME_TOKEN: &str = "file_name";

pub const DEFAULT_BROKER_CLIENT_ID: &str = "default-client";
pub const DEFAULT_BROKER_BATCH_SIZE: usize = 1000;
/// Unordered broker batches above this many records are sharded.
pub const DEFAULT_SHARD_THRESHOLD: usize = 100_000;
pub const BROKER_SHARD_COUNT: usize = 4;

pub const DEFAULT_SUMMARY_SAMPLE_SIZE: usize = 1;
