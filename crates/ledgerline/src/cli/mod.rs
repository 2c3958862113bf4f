//! Subcommands and the arguments they share.

pub mod check;
pub mod output;
pub mod parse;
pub mod run;

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use ledgerline::LocalObjectStore;
use ledgerline_worker::{ConfigSource, LocalConfigSource, ObjectStoreConfigSource};
use std::path::PathBuf;
use std::sync::Arc;

/// Where the schema document is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigType {
    /// `--config-name` is a path on disk
    Local,
    /// `--config-name` is a key in `--config-bucket` under the storage root
    External,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[arg(long, global = true, value_enum, env = "LEDGERLINE_CONFIG_TYPE", default_value = "local")]
    pub config_type: ConfigType,

    /// Schema document path (local) or object key (external)
    #[arg(long, global = true, env = "LEDGERLINE_CONFIG_NAME", default_value = "transformer.yaml")]
    pub config_name: String,

    /// Bucket holding the schema document (external only)
    #[arg(long, global = true, env = "LEDGERLINE_CONFIG_BUCKET")]
    pub config_bucket: Option<String>,

    /// Root directory of the local object store; buckets are subdirectories
    #[arg(long, global = true, env = "LEDGERLINE_STORAGE_ROOT", default_value = ".")]
    pub storage_root: PathBuf,
}

impl ConfigArgs {
    pub fn object_store(&self) -> Arc<LocalObjectStore> {
        Arc::new(LocalObjectStore::new(&self.storage_root))
    }

    pub fn config_source(&self) -> Result<Box<dyn ConfigSource>> {
        Ok(match self.config_type {
            ConfigType::Local => Box::new(LocalConfigSource::new(&self.config_name)),
            ConfigType::External => {
                let Some(bucket) = &self.config_bucket else {
                    bail!("--config-bucket (LEDGERLINE_CONFIG_BUCKET) is required with --config-type external");
                };
                // Side files sit next to the document inside the bucket directory.
                let document = self.storage_root.join(bucket).join(&self.config_name);
                let base_dir = document.parent().map(PathBuf::from).unwrap_or_default();
                Box::new(
                    ObjectStoreConfigSource::new(
                        self.object_store(),
                        bucket.clone(),
                        self.config_name.clone(),
                    )
                    .with_base_dir(base_dir),
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DOCUMENT: &str = r#"
files:
  payments:
    pattern: PAY_\d+\.txt
    source:
      body:
        formatter: body_only
        format:
          - name: id
            spec: "0,4"
    output:
      producer:
        - name: Console
      format:
        include: groups.yaml
"#;

    fn args(storage_root: &std::path::Path, bucket: Option<&str>) -> ConfigArgs {
        ConfigArgs {
            config_type: ConfigType::External,
            config_name: "schemas/transformer.yaml".into(),
            config_bucket: bucket.map(String::from),
            storage_root: storage_root.to_path_buf(),
        }
    }

    #[test]
    fn external_documents_include_side_files_from_their_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let schemas = dir.path().join("config/schemas");
        fs::create_dir_all(&schemas).unwrap();
        fs::write(schemas.join("transformer.yaml"), DOCUMENT).unwrap();
        fs::write(schemas.join("groups.yaml"), "root:\n  - name: id\n    value: body.id\n").unwrap();

        let catalog = args(dir.path(), Some("config")).config_source().unwrap().load().unwrap();
        assert!(catalog.resolve("PAY_7.txt").is_ok());
        assert!(args(dir.path(), None).config_source().is_err());
    }
}
