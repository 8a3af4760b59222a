//! relsql - relational query trees to SQL Server SQL
//!
//! This crate compiles a typed relational expression tree into one SQL
//! statement through:
//! - Statement minimization (operators merge into their input's SELECT
//!   whenever the clauses do not clash)
//! - Join flattening into a single FROM list
//! - A two-phase alias system that settles extent and column names only once
//!   the whole statement tree is known
//! - ROW_NUMBER based paging for servers without OFFSET

pub mod config;
pub mod query_tree;
pub mod sql_generator;

pub use config::{GeneratorConfig, SqlVersion};
pub use query_tree::Expr;
pub use sql_generator::{
    generate_sql, generate_sql_with_dialect, GeneratedSql, ResultColumn, SqlDialect,
    SqlGenError, SqlServerDialect, ToSql,
};
