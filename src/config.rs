//! Run settings, read from the environment. The tool takes no flags.

use std::{env, fs::File, path::PathBuf};

use crate::{loader::LoadPolicy, migration::Migration, schema::TableSchema};

pub const DATABASE_KEY: &str = "THINGSEED_DATABASE";
pub const ROWS_KEY: &str = "THINGSEED_ROWS";
pub const BATCH_SIZE_KEY: &str = "THINGSEED_BATCH_SIZE";
pub const POLICY_KEY: &str = "THINGSEED_POLICY";
pub const SCHEMA_KEY: &str = "THINGSEED_SCHEMA";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("THINGSEED_POLICY: {0}")]
    InvalidPolicy(String),
    #[error("cannot read schema file {}: {source}", .path.display())]
    SchemaFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse schema file {}: {source}", .path.display())]
    SchemaJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    pub database: PathBuf,
    pub rows: usize,
    pub batch_size: usize,
    pub policy: LoadPolicy,
    pub schema_path: Option<PathBuf>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        let defaults = Migration::default();
        Self {
            database: PathBuf::from("things.db"),
            rows: defaults.rows,
            batch_size: defaults.batch_size,
            policy: defaults.policy,
            schema_path: None,
        }
    }
}

impl SeedConfig {
    /// # Errors
    ///
    /// On unparsable values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for missing keys.
    ///
    /// # Errors
    ///
    /// On unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let number = |key: &'static str, default: usize| -> Result<usize, ConfigError> {
            lookup(key).map_or(Ok(default), |value| {
                value
                    .trim()
                    .replace('_', "")
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { key, value })
            })
        };

        let policy = match lookup(POLICY_KEY) {
            Some(value) => value.parse().map_err(ConfigError::InvalidPolicy)?,
            None => defaults.policy,
        };

        Ok(Self {
            database: lookup(DATABASE_KEY).map_or(defaults.database, PathBuf::from),
            rows: number(ROWS_KEY, defaults.rows)?,
            batch_size: number(BATCH_SIZE_KEY, defaults.batch_size)?,
            policy,
            schema_path: lookup(SCHEMA_KEY).map(PathBuf::from),
        })
    }

    /// The schema file when one is configured, the `things` table otherwise.
    ///
    /// # Errors
    ///
    /// When the schema file cannot be read or parsed.
    pub fn table_schema(&self) -> Result<TableSchema, ConfigError> {
        let Some(path) = &self.schema_path else {
            return Ok(TableSchema::things());
        };

        let file = File::open(path).map_err(|source| ConfigError::SchemaFile {
            path: path.clone(),
            source,
        })?;
        serde_json::from_reader(file).map_err(|source| ConfigError::SchemaJson {
            path: path.clone(),
            source,
        })
    }

    /// # Errors
    ///
    /// When the schema file cannot be read or parsed.
    pub fn migration(&self) -> Result<Migration, ConfigError> {
        Ok(
            Migration::new(self.table_schema()?, self.rows, self.batch_size)
                .with_policy(self.policy),
        )
    }
}
