//! Secret, hash and relational fakes.

use ledgerline_protocol::{
    ConnectionInfo, Credentials, HashFunction, HashRequest, HashResponse, QueryResult,
    RelationalStore, SecretStore, ServiceError, ServiceResult,
};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::lock;

#[derive(Debug, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, Credentials>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: &str, username: &str, password: &str) -> Self {
        self.secrets.insert(
            name.to_string(),
            Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn get_secret(&self, name: &str) -> ServiceResult<Credentials> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("secret {}", name)))
    }
}

/// Answers every invocation with the same response.
#[derive(Debug)]
pub struct FixedHashFunction {
    response: HashResponse,
    requests: Mutex<Vec<(String, HashRequest)>>,
}

impl FixedHashFunction {
    pub fn new(digest: &str) -> Self {
        Self {
            response: HashResponse {
                status_code: 200,
                body: digest.to_string(),
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.response.status_code = status_code;
        self
    }

    pub fn requests(&self) -> Vec<(String, HashRequest)> {
        lock(&self.requests).clone()
    }
}

impl Default for FixedHashFunction {
    fn default() -> Self {
        Self::new("")
    }
}

impl HashFunction for FixedHashFunction {
    fn invoke(&self, function_name: &str, request: &HashRequest) -> ServiceResult<HashResponse> {
        lock(&self.requests).push((function_name.to_string(), request.clone()));
        Ok(self.response.clone())
    }
}

/// Returns the first scripted result whose fragment occurs in the query.
/// Unscripted queries return an empty result.
#[derive(Debug, Default)]
pub struct ScriptedRelationalStore {
    script: Vec<(String, QueryResult)>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, fragment: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
        let result = QueryResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        };
        self.script.push((fragment.to_string(), result));
        self
    }

    /// Every SQL statement received, in order.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }
}

impl RelationalStore for ScriptedRelationalStore {
    fn query(&self, _connection: &ConnectionInfo, sql: &str) -> ServiceResult<QueryResult> {
        lock(&self.executed).push(sql.to_string());
        Ok(self
            .script
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }
}
