//! Query tree to SQL Server text.
//!
//! [`generate_sql`] translates a typed relational tree into a
//! [`SelectStatement`](select_statement::SelectStatement) tree, merging
//! operators into as few statements as the dialect allows, then renders it
//! in a second pass that settles every extent and column alias name.

use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::query_tree::Expr;

pub mod alias;
mod column_expansion;
pub mod dialect;
mod errors;
pub mod fragment;
pub mod function_registry;
mod naming_scopes;
pub mod renderer;
pub mod select_statement;
mod translator;
#[cfg(test)]
mod tests;

pub use dialect::{SqlDialect, SqlServerDialect};
pub use errors::SqlGenError;
pub use function_registry::{get_aggregate_name, get_function_mapping};
pub use translator::Translator;

/// One column of the result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    /// Field of the query's element type
    pub field: String,
    /// Column name in the emitted SQL, after renaming
    pub column: String,
}

/// Output of one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedSql {
    pub sql: String,
    pub columns: Vec<ResultColumn>,
}

/// Compile `query` with the SQL Server dialect selected by `config`.
pub fn generate_sql(query: &Expr, config: &GeneratorConfig) -> Result<GeneratedSql, SqlGenError> {
    let dialect = config.dialect();
    generate_sql_with_dialect(query, &dialect, config.max_depth as usize)
}

/// Compile `query` with a caller-supplied dialect.
pub fn generate_sql_with_dialect(
    query: &Expr,
    dialect: &dyn SqlDialect,
    max_depth: usize,
) -> Result<GeneratedSql, SqlGenError> {
    Translator::new(dialect, max_depth).translate(query)
}

pub trait ToSql {
    fn to_sql(&self, config: &GeneratorConfig) -> Result<GeneratedSql, SqlGenError>;
}

impl ToSql for Expr {
    fn to_sql(&self, config: &GeneratorConfig) -> Result<GeneratedSql, SqlGenError> {
        generate_sql(self, config)
    }
}
