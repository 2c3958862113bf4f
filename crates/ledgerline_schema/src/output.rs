//! Result templates, generators and producer specs.

use ledgerline_protocol::defaults::{
    DEFAULT_BROKER_BATCH_SIZE, DEFAULT_BROKER_CLIENT_ID, DEFAULT_SHARD_THRESHOLD,
    DEFAULT_SUMMARY_SAMPLE_SIZE,
};
use ledgerline_protocol::{TransformError, TransformResult};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::args::{ArgumentOwner, Arguments};
use crate::model::FieldRef;
use crate::rules::ValidationRule;

/// Synthetic per-row value producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Uuid,
    IncrementalId,
    Timestamp,
}

impl GeneratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::Uuid => "UuidGenerator",
            GeneratorKind::IncrementalId => "IncrementalIdGenerator",
            GeneratorKind::Timestamp => "TimestampGenerator",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UuidGenerator" | "Uuid" | "uuid" => Ok(GeneratorKind::Uuid),
            "IncrementalIdGenerator" | "IncrementalId" | "incremental_id" => {
                Ok(GeneratorKind::IncrementalId)
            }
            "TimestampGenerator" | "Timestamp" | "timestamp" => Ok(GeneratorKind::Timestamp),
            _ => Err(format!("Unknown generator '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Reference(FieldRef),
    Generator(GeneratorKind),
}

impl FieldSource {
    /// `"<segment>.<field>"` or a generator name.
    pub fn parse(expression: &str) -> TransformResult<Self> {
        if FieldRef::is_reference(expression) {
            expression.parse().map(FieldSource::Reference)
        } else {
            expression
                .trim()
                .parse()
                .map(FieldSource::Generator)
                .map_err(TransformError::InvalidConfig)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFieldSpec {
    pub output_name: String,
    pub source: FieldSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultGroup {
    pub name: String,
    pub fields: Vec<ResultFieldSpec>,
}

impl ResultGroup {
    /// Source segments this group reads from.
    pub fn referenced_segments(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| match &f.source {
            FieldSource::Reference(r) => Some(r.segment.as_str()),
            FieldSource::Generator(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobFormat {
    /// One JSON array.
    #[default]
    Json,
    /// One JSON object per line.
    Jsonl,
}

impl BlobFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobFormat::Json => "json",
            BlobFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for BlobFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(BlobFormat::Json),
            "jsonl" | "ndjson" => Ok(BlobFormat::Jsonl),
            _ => Err(format!("Unknown blob format '{}'. Valid: json, jsonl", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerTarget {
    pub topic: String,
    pub secret_name: Option<String>,
    pub cluster_name: Option<String>,
    pub broker_urls: Vec<String>,
    pub client_id: String,
    pub batch_size: usize,
    pub ordered: bool,
    pub shard_threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerSpec {
    Console,
    ObjectStore {
        bucket: String,
        /// May contain `{file_name}` and `{request_id}`.
        key: String,
        format: BlobFormat,
    },
    Broker(BrokerTarget),
    Summary {
        sample_size: usize,
    },
}

impl ProducerSpec {
    pub fn name(&self) -> &'static str {
        match self {
            ProducerSpec::Console => "Console",
            ProducerSpec::ObjectStore { .. } => "ObjectStore",
            ProducerSpec::Broker(_) => "Broker",
            ProducerSpec::Summary { .. } => "Summary",
        }
    }
}

pub fn compile_producer(name: &str, values: &Map<String, Value>) -> TransformResult<ProducerSpec> {
    let args = Arguments::new(ArgumentOwner::Producer, name, values);
    let spec = match name {
        "Console" | "ConsoleResult" => ProducerSpec::Console,
        "ObjectStore" | "S3Result" => {
            let format = match args.optional_text(&["format"])? {
                Some(raw) => raw.parse().map_err(|e: String| args.invalid("format", e))?,
                None => BlobFormat::default(),
            };
            ProducerSpec::ObjectStore {
                bucket: args.required_text(&["bucket"])?,
                key: args.required_text(&["key"])?,
                format,
            }
        }
        "Broker" | "MSKScramResult" => {
            let cluster_name = args.optional_text(&["cluster_name", "clusterName"])?;
            let broker_urls = args.string_list(&["broker_urls", "brokerUrls"])?;
            if cluster_name.is_none() && broker_urls.is_empty() {
                return Err(TransformError::missing_config(format!(
                    "{} requires either cluster_name or broker_urls",
                    name
                )));
            }
            let batch_size = args
                .optional_usize(&["batch_size", "batchSize"])?
                .unwrap_or(DEFAULT_BROKER_BATCH_SIZE);
            if batch_size == 0 {
                return Err(args.invalid("batch_size", "must be greater than zero"));
            }
            ProducerSpec::Broker(BrokerTarget {
                topic: args.required_text(&["topic"])?,
                secret_name: args.optional_text(&["secret_name", "secretName"])?,
                cluster_name,
                broker_urls,
                client_id: args
                    .optional_text(&["client_id", "clientId"])?
                    .unwrap_or_else(|| DEFAULT_BROKER_CLIENT_ID.to_string()),
                batch_size,
                ordered: args.optional_bool(&["ordered"])?.unwrap_or(true),
                shard_threshold: args
                    .optional_usize(&["shard_threshold", "shardThreshold"])?
                    .unwrap_or(DEFAULT_SHARD_THRESHOLD),
            })
        }
        "Summary" | "SummaryResult" => ProducerSpec::Summary {
            sample_size: args
                .optional_usize(&["sample_size"])?
                .unwrap_or(DEFAULT_SUMMARY_SAMPLE_SIZE),
        },
        other => {
            return Err(TransformError::invalid_config(format!(
                "Unknown producer '{}'",
                other
            )))
        }
    };
    Ok(spec)
}

/// The output half of a file entry.
#[derive(Debug, Clone)]
pub struct ResultSchema {
    /// Empty means the parsed source tables are emitted unchanged.
    pub groups: Vec<ResultGroup>,
    pub validators: Vec<ValidationRule>,
    pub producers: Vec<ProducerSpec>,
}

impl ResultSchema {
    pub fn group(&self, name: &str) -> Option<&ResultGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

pub fn check_formatter(name: Option<&str>) -> TransformResult<()> {
    match name {
        None | Some("DefaultArrayResultFormatter") | Some("DefaultArray") | Some("default") => {
            Ok(())
        }
        Some(other) => Err(TransformError::invalid_config(format!(
            "Unknown result formatter '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn field_source_parsing() {
        assert_eq!(
            FieldSource::parse("header.date").unwrap(),
            FieldSource::Reference(FieldRef::new("header", "date"))
        );
        assert_eq!(
            FieldSource::parse("UuidGenerator").unwrap(),
            FieldSource::Generator(GeneratorKind::Uuid)
        );
        assert!(matches!(
            FieldSource::parse("SnowflakeGenerator"),
            Err(TransformError::InvalidConfig(_))
        ));
    }

    #[test]
    fn broker_defaults_and_legacy_keys() {
        let spec = compile_producer(
            "MSKScramResult",
            &map(json!({"topic": "payments", "clusterName": "c1", "secretName": "s"})),
        )
        .unwrap();
        match spec {
            ProducerSpec::Broker(target) => {
                assert_eq!(target.client_id, "default-client");
                assert_eq!(target.batch_size, 1000);
                assert!(target.ordered);
                assert_eq!(target.shard_threshold, 100_000);
                assert_eq!(target.secret_name.as_deref(), Some("s"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(compile_producer("Broker", &map(json!({"topic": "t"}))).is_err());
    }

    #[test]
    fn object_store_format() {
        let spec = compile_producer(
            "S3Result",
            &map(json!({"bucket": "out", "key": "{file_name}.jsonl", "format": "jsonl"})),
        )
        .unwrap();
        assert_eq!(
            spec,
            ProducerSpec::ObjectStore {
                bucket: "out".into(),
                key: "{file_name}.jsonl".into(),
                format: BlobFormat::Jsonl
            }
        );
        assert!(compile_producer("Kinesis", &Map::new()).is_err());
    }
}
