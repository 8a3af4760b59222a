//! Dialect capability interface.
//!
//! The translation core only asks a dialect five things: whether an operator
//! may reuse its input statement, how to expand a statement's default
//! columns, how to print a statement's clauses, how to print literals and
//! identifiers, and which server version is targeted. Every method except
//! [`SqlDialect::version`] has a SQL Server default, so an alternate front
//! end overrides only what differs.

use crate::config::SqlVersion;
use crate::query_tree::{Literal, PrimitiveType};

use super::alias::{AliasArena, AliasId};
use super::column_expansion;
use super::errors::SqlGenError;
use super::renderer::{RenameCounters, SqlWriter};
use super::select_statement::{SelectStatement, StatementOperator};

pub trait SqlDialect {
    fn name(&self) -> &str {
        "sqlserver"
    }

    fn version(&self) -> SqlVersion;

    /// Statement-minimization predicate.
    fn is_compatible(&self, statement: &SelectStatement, operator: StatementOperator) -> bool {
        statement.is_compatible_with(operator)
    }

    /// Fill an empty SELECT list from the statement's FROM extents and return
    /// the column aliases written.
    fn expand_columns(
        &self,
        statement: &mut SelectStatement,
        aliases: &mut AliasArena,
        counters: &mut RenameCounters,
    ) -> Vec<AliasId> {
        column_expansion::expand_default_columns(self, statement, aliases, counters)
    }

    /// Print SELECT/FROM/WHERE/GROUP BY/ORDER BY of one statement.
    fn write_clauses(
        &self,
        statement: &SelectStatement,
        writer: &mut SqlWriter<'_>,
    ) -> Result<(), SqlGenError> {
        writer.write_standard_clauses(statement)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn escape_literal(&self, literal: &Literal) -> Result<String, SqlGenError> {
        let text = match literal {
            Literal::Boolean(true) => "CAST(1 AS bit)".to_string(),
            Literal::Boolean(false) => "CAST(0 AS bit)".to_string(),
            Literal::Int32(value) => value.to_string(),
            Literal::Int64(value) => format!("CAST({} AS bigint)", value),
            Literal::Decimal(text) => {
                let numeric = !text.is_empty()
                    && text
                        .chars()
                        .enumerate()
                        .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && c == '-'));
                if !numeric {
                    return Err(SqlGenError::unsupported(format!(
                        "decimal literal '{}'",
                        text
                    )));
                }
                text.clone()
            }
            Literal::Double(value) => {
                if !value.is_finite() {
                    return Err(SqlGenError::unsupported(format!(
                        "non-finite float literal {}",
                        value
                    )));
                }
                format!("CAST({:?} AS float)", value)
            }
            Literal::String(value) => format!("N'{}'", value.replace('\'', "''")),
            Literal::DateTime(value) => {
                let ty = if self.version() >= SqlVersion::Sql2008 {
                    "datetime2"
                } else {
                    "datetime"
                };
                format!("convert({}, '{}', 121)", ty, value.replace('\'', "''"))
            }
            Literal::Guid(value) => {
                format!("CAST('{}' AS uniqueidentifier)", value.replace('\'', "''"))
            }
        };
        Ok(text)
    }

    /// Type name used in CAST targets.
    fn type_name(&self, ty: PrimitiveType) -> Result<String, SqlGenError> {
        let modern = self.version() >= SqlVersion::Sql2005;
        let name = match ty {
            PrimitiveType::Boolean => "bit",
            PrimitiveType::Byte => "tinyint",
            PrimitiveType::Int16 => "smallint",
            PrimitiveType::Int32 => "int",
            PrimitiveType::Int64 => "bigint",
            PrimitiveType::Decimal => "decimal(18, 2)",
            PrimitiveType::Double => "float",
            PrimitiveType::String if modern => "nvarchar(max)",
            PrimitiveType::String => "nvarchar(4000)",
            PrimitiveType::DateTime if self.version() >= SqlVersion::Sql2008 => "datetime2",
            PrimitiveType::DateTime => "datetime",
            PrimitiveType::DateTimeOffset => {
                self.require_version("datetimeoffset", SqlVersion::Sql2008)?;
                "datetimeoffset"
            }
            PrimitiveType::Time => {
                self.require_version("time", SqlVersion::Sql2008)?;
                "time"
            }
            PrimitiveType::Guid => "uniqueidentifier",
            PrimitiveType::Binary if modern => "varbinary(max)",
            PrimitiveType::Binary => "varbinary(8000)",
        };
        Ok(name.to_string())
    }

    fn require_version(&self, feature: &str, required: SqlVersion) -> Result<(), SqlGenError> {
        if self.version() < required {
            return Err(SqlGenError::DialectLimitation {
                feature: feature.to_string(),
                required,
                configured: self.version(),
            });
        }
        Ok(())
    }
}

/// Microsoft SQL Server, 2000 through 2012.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlServerDialect {
    pub version: SqlVersion,
}

impl SqlServerDialect {
    pub fn new(version: SqlVersion) -> Self {
        SqlServerDialect { version }
    }
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        SqlServerDialect::new(SqlVersion::Sql2008)
    }
}

impl SqlDialect for SqlServerDialect {
    fn version(&self) -> SqlVersion {
        self.version
    }
}
