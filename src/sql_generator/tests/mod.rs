//! End-to-end translation tests: query tree in, normalized SQL text out.

mod aggregate_tests;
mod minimization_tests;

use crate::config::SqlVersion;
use crate::query_tree::{Expr, PrimitiveType};
use crate::query_tree::builders::scan;
use crate::sql_generator::{generate_sql_with_dialect, GeneratedSql, SqlGenError, SqlServerDialect};

const DEFAULT_DEPTH: usize = 200;

/// Collapse every whitespace run into one space.
pub(super) fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(super) fn compile_for(expr: &Expr, version: SqlVersion) -> Result<GeneratedSql, SqlGenError> {
    generate_sql_with_dialect(expr, &SqlServerDialect::new(version), DEFAULT_DEPTH)
}

pub(super) fn compile(expr: &Expr) -> GeneratedSql {
    match compile_for(expr, SqlVersion::Sql2008) {
        Ok(generated) => generated,
        Err(e) => panic!("translation failed: {}", e),
    }
}

pub(super) fn sql(expr: &Expr) -> String {
    normalize(&compile(expr).sql)
}

pub(super) fn column_names(generated: &GeneratedSql) -> Vec<&str> {
    generated.columns.iter().map(|c| c.column.as_str()).collect()
}

pub(super) fn customers() -> Expr {
    scan(
        "Customers",
        &[("Id", PrimitiveType::Int32), ("Name", PrimitiveType::String)],
    )
}

pub(super) fn orders() -> Expr {
    scan(
        "Orders",
        &[
            ("Id", PrimitiveType::Int32),
            ("CustomerId", PrimitiveType::Int32),
            ("Total", PrimitiveType::Decimal),
        ],
    )
}

pub(super) fn items() -> Expr {
    scan(
        "Items",
        &[("OrderId", PrimitiveType::Int32), ("Sku", PrimitiveType::String)],
    )
}
