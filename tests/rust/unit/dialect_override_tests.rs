use relsql::config::SqlVersion;
use relsql::query_tree::builders::*;
use relsql::query_tree::PrimitiveType;
use relsql::sql_generator::renderer::SqlWriter;
use relsql::sql_generator::select_statement::{SelectStatement, StatementOperator};
use relsql::sql_generator::{generate_sql_with_dialect, SqlDialect, SqlGenError};

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Front end whose Skip always reuses its input statement.
struct InlineSkipDialect;

impl SqlDialect for InlineSkipDialect {
    fn name(&self) -> &str {
        "inline-skip"
    }

    fn version(&self) -> SqlVersion {
        SqlVersion::Sql2012
    }

    fn is_compatible(&self, statement: &SelectStatement, operator: StatementOperator) -> bool {
        operator == StatementOperator::Skip || statement.is_compatible_with(operator)
    }
}

/// Front end with ANSI quoting and a trailing clause marker.
struct AnsiQuotingDialect;

impl SqlDialect for AnsiQuotingDialect {
    fn version(&self) -> SqlVersion {
        SqlVersion::Sql2008
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn write_clauses(
        &self,
        statement: &SelectStatement,
        writer: &mut SqlWriter<'_>,
    ) -> Result<(), SqlGenError> {
        writer.write_standard_clauses(statement)?;
        writer.write(" /* ansi */");
        Ok(())
    }
}

fn people() -> relsql::query_tree::Expr {
    scan(
        "People",
        &[("Id", PrimitiveType::Int32), ("Name", PrimitiveType::String)],
    )
}

#[test]
fn test_skip_compatibility_override_removes_a_wrap() {
    let query = skip(
        "s",
        filter("p", people(), gt(col("p", "Id"), int(0))),
        vec![asc(col("s", "Id"))],
        int(5),
    );

    let default_sql = generate_sql_with_dialect(&query, &relsql::SqlServerDialect::default(), 100)
        .expect("default dialect");
    let inline_sql = generate_sql_with_dialect(&query, &InlineSkipDialect, 100)
        .expect("override dialect");

    // The filter statement is compatible either way; the override only
    // matters once the input carries clauses Skip would otherwise reject
    assert_eq!(
        default_sql.sql.matches("SELECT").count(),
        inline_sql.sql.matches("SELECT").count()
    );

    let sorted = skip(
        "s",
        sort("p", people(), vec![desc(col("p", "Name"))]),
        vec![asc(col("s", "Id"))],
        int(5),
    );
    let default_sql = generate_sql_with_dialect(&sorted, &relsql::SqlServerDialect::default(), 100)
        .expect("default dialect");
    let inline_sql =
        generate_sql_with_dialect(&sorted, &InlineSkipDialect, 100).expect("override dialect");

    assert_eq!(default_sql.sql.matches("SELECT").count(), 3);
    assert_eq!(inline_sql.sql.matches("SELECT").count(), 2);
}

#[test]
fn test_quoting_and_clause_rendering_override() {
    let query = filter("p", people(), gt(col("p", "Id"), int(0)));
    let generated =
        generate_sql_with_dialect(&query, &AnsiQuotingDialect, 100).expect("ansi dialect");

    assert_eq!(
        normalize(&generated.sql),
        "SELECT \"p\".\"Id\" AS \"Id\", \"p\".\"Name\" AS \"Name\" FROM \"dbo\".\"People\" AS \"p\" WHERE \"p\".\"Id\" > 0 /* ansi */"
    );
}

#[test]
fn test_default_name_is_sqlserver() {
    assert_eq!(relsql::SqlServerDialect::default().name(), "sqlserver");
    assert_eq!(InlineSkipDialect.name(), "inline-skip");
}
