//! Narrow interfaces to the external collaborators.
//!
//! The pipeline never talks to storage, secrets, hashing, databases or the
//! broker directly; the binary wires concrete implementations into
//! [`Collaborators`] and tests use in-memory fakes.

use crate::error::ServiceError;
use crate::table::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

pub trait ObjectStore: Send + Sync {
    fn download(&self, bucket: &str, key: &str) -> ServiceResult<Vec<u8>>;

    fn upload(&self, bucket: &str, key: &str, body: &[u8]) -> ServiceResult<()>;

    /// Whether the object exists. With `date_check`, it must also have been
    /// last modified today.
    fn exists(&self, bucket: &str, key: &str, date_check: bool) -> ServiceResult<bool>;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait SecretStore: Send + Sync {
    fn get_secret(&self, name: &str) -> ServiceResult<Credentials>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HashRequest {
    pub absolute_path: String,
    pub algorithm: String,
    pub use_line_ending_conversion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashResponse {
    pub status_code: u16,
    pub body: String,
}

pub trait HashFunction: Send + Sync {
    fn invoke(&self, function_name: &str, request: &HashRequest) -> ServiceResult<HashResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub engine: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub credentials: Credentials,
}

/// Tabular query result; every cell rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one named column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<Option<String>>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).cloned().flatten())
                .collect(),
        )
    }
}

pub trait RelationalStore: Send + Sync {
    fn query(&self, connection: &ConnectionInfo, sql: &str) -> ServiceResult<QueryResult>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub client_id: String,
    pub cluster_name: Option<String>,
    pub broker_urls: Vec<String>,
    pub batch_size: usize,
    pub credentials: Option<Credentials>,
}

/// One open, authenticated broker connection. Sessions are never shared
/// between threads.
pub trait BrokerSession: Send {
    fn publish(&mut self, topic: &str, record: &Record) -> ServiceResult<()>;

    fn flush(&mut self) -> ServiceResult<()>;

    fn close(self: Box<Self>) -> ServiceResult<()>;
}

pub trait Broker: Send + Sync {
    fn connect(&self, config: &BrokerConfig) -> ServiceResult<Box<dyn BrokerSession>>;
}

/// Collaborator handles for one invocation.
#[derive(Clone)]
pub struct Collaborators {
    pub object_store: Arc<dyn ObjectStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub hasher: Arc<dyn HashFunction>,
    pub relational: Arc<dyn RelationalStore>,
    pub broker: Arc<dyn Broker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_result_column_by_name() {
        let result = QueryResult {
            columns: vec!["id".into(), "amount".into()],
            rows: vec![
                vec![Some("1".into()), Some("10".into())],
                vec![Some("2".into()), None],
            ],
        };
        assert_eq!(
            result.column("amount"),
            Some(vec![Some("10".to_string()), None])
        );
        assert_eq!(result.column("missing"), None);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            username: "svc".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("svc"));
        assert!(!rendered.contains("hunter2"));
    }
}
