use crate::defaults;
pub use clap::Parser;
use serde::Deserialize;
use std::{
    fs::File,
    io::Error,
    path::{Path, PathBuf},
};
use strum::{AsRefStr, EnumString};
use thiserror::Error;

/// Error type returned by configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error processing file: {0:?}")]
    ConfigFileError(#[from] Error),
    #[error("Error processing YAML file: {0:?}")]
    SerdeYamlError(#[from] serde_yaml::Error),
    #[error("At least one schema must be exposed")]
    NoSchemas,
    #[error("Page size limit must be greater than zero")]
    InvalidPageSizeLimit,
}

pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

#[derive(Debug, EnumString, AsRefStr)]
pub enum EnvVar {
    #[strum(serialize = "DYNATTR_SCHEMAS")]
    Schemas,
}

pub fn env_or_default(var: EnvVar, default: String) -> String {
    std::env::var(var.as_ref()).unwrap_or(default)
}

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "dynattr-schema",
    about = "Print the GraphQL schema derived from an introspected database"
)]
pub struct SchemaArgs {
    #[clap(short, long, parse(from_os_str), help = "Schema builder config file.")]
    pub config: Option<PathBuf>,
    #[clap(
        short,
        long,
        parse(from_os_str),
        help = "Introspection result, as JSON."
    )]
    pub introspection: PathBuf,
    #[clap(long, help = "Comma separated list of database schemas to expose.")]
    pub schemas: Option<String>,
    #[clap(
        long,
        help = "Sort nulls last when a sort entry uses the DEFAULT null ordering."
    )]
    pub order_by_nulls_last: bool,
    #[clap(
        long,
        help = "Largest page a collection field may return.",
        default_value_t = defaults::PAGE_SIZE_LIMIT
    )]
    pub page_size_limit: u64,
    #[clap(short, long, help = "Enable verbose logging.")]
    pub verbose: bool,
}

fn default_schemas() -> Vec<String> {
    vec![defaults::SCHEMA.to_string()]
}

fn default_page_size_limit() -> u64 {
    defaults::PAGE_SIZE_LIMIT
}

fn split_schemas(schemas: &str) -> Vec<String> {
    schemas
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Schema builder configuration.
#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
pub struct SchemaConfig {
    /// Database schemas whose tables and procedures are exposed.
    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,

    /// Whether `DEFAULT` null ordering renders as `NULLS LAST`.
    #[serde(default)]
    pub order_by_nulls_last: bool,

    /// Largest `first` accepted by collection fields.
    #[serde(default = "default_page_size_limit")]
    pub page_size_limit: u64,

    #[serde(default)]
    pub verbose: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            schemas: default_schemas(),
            order_by_nulls_last: defaults::ORDER_BY_NULLS_LAST,
            page_size_limit: defaults::PAGE_SIZE_LIMIT,
            verbose: false,
        }
    }
}

impl From<SchemaArgs> for SchemaConfig {
    fn from(args: SchemaArgs) -> Self {
        let schemas = args.schemas.unwrap_or_else(|| {
            env_or_default(EnvVar::Schemas, defaults::SCHEMA.to_string())
        });

        SchemaConfig {
            schemas: split_schemas(&schemas),
            order_by_nulls_last: args.order_by_nulls_last,
            page_size_limit: args.page_size_limit,
            verbose: args.verbose,
        }
    }
}

impl SchemaConfig {
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let file = File::open(path)?;
        let config: SchemaConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.schemas.is_empty() {
            return Err(ConfigError::NoSchemas);
        }
        if self.page_size_limit == 0 {
            return Err(ConfigError::InvalidPageSizeLimit);
        }
        Ok(())
    }
}
