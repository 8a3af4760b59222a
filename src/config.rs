use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::sql_generator::dialect::SqlServerDialect;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Targeted SQL Server release. Ordered oldest first so feature gates can
/// compare with `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SqlVersion {
    #[serde(rename = "2000")]
    Sql2000,
    #[serde(rename = "2005")]
    Sql2005,
    #[serde(rename = "2008")]
    Sql2008,
    #[serde(rename = "2012")]
    Sql2012,
}

impl fmt::Display for SqlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = match self {
            SqlVersion::Sql2000 => "2000",
            SqlVersion::Sql2005 => "2005",
            SqlVersion::Sql2008 => "2008",
            SqlVersion::Sql2012 => "2012",
        };
        write!(f, "SQL Server {}", year)
    }
}

#[derive(Debug, Error)]
#[error("unknown SQL Server version '{0}' (expected 2000, 2005, 2008 or 2012)")]
pub struct UnknownSqlVersion(String);

impl FromStr for SqlVersion {
    type Err = UnknownSqlVersion;

    /// Accepts release years and the matching major version numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = trimmed
            .strip_prefix("sql")
            .or_else(|| trimmed.strip_prefix("SQL"))
            .unwrap_or(trimmed);
        match normalized {
            "2000" | "8" => Ok(SqlVersion::Sql2000),
            "2005" | "9" => Ok(SqlVersion::Sql2005),
            "2008" | "10" => Ok(SqlVersion::Sql2008),
            "2012" | "11" => Ok(SqlVersion::Sql2012),
            _ => Err(UnknownSqlVersion(s.to_string())),
        }
    }
}

/// Dialects this build knows how to target.
const KNOWN_DIALECTS: &[&str] = &["sqlserver"];

fn validate_dialect_name(name: &str) -> Result<(), ValidationError> {
    if KNOWN_DIALECTS.contains(&name.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_dialect"))
    }
}

/// SQL generator configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Targeted server release; gates version-specific syntax
    pub sql_version: SqlVersion,

    /// Maximum tree depth the translator walks before giving up
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Max depth must be between 1 and 10000"
    ))]
    pub max_depth: u32,

    /// Dialect family; only `sqlserver` is shipped
    #[validate(
        length(min = 1, message = "Dialect name cannot be empty"),
        custom(function = "validate_dialect_name")
    )]
    pub dialect_name: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sql_version: SqlVersion::Sql2008,
            max_depth: 200,
            dialect_name: "sqlserver".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            sql_version: parse_env_var("RELSQL_SQL_VERSION", "2008")?,
            max_depth: parse_env_var("RELSQL_MAX_DEPTH", "200")?,
            dialect_name: env::var("RELSQL_DIALECT").unwrap_or_else(|_| "sqlserver".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let sql_version = cli
            .sql_version
            .parse()
            .map_err(|e: UnknownSqlVersion| ConfigError::Parse {
                field: "sql_version".to_string(),
                value: cli.sql_version.clone(),
                source: Box::new(e),
            })?;
        let config = Self {
            sql_version,
            max_depth: cli.max_depth,
            dialect_name: "sqlserver".to_string(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Dialect matching this configuration
    pub fn dialect(&self) -> SqlServerDialect {
        SqlServerDialect::new(self.sql_version)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub sql_version: String,
    pub max_depth: u32,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
