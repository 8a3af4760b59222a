use std::io::Write;

use relsql::config::{GeneratorConfig, SqlVersion};
use relsql::query_tree::builders::*;
use relsql::query_tree::PrimitiveType;
use relsql::sql_generator::{generate_sql, SqlGenError, ToSql};
use serial_test::serial;
use tempfile::NamedTempFile;

fn paged_people() -> relsql::query_tree::Expr {
    skip(
        "p",
        scan(
            "People",
            &[("Id", PrimitiveType::Int32), ("Name", PrimitiveType::String)],
        ),
        vec![asc(col("p", "Id"))],
        int(20),
    )
}

#[test]
fn test_yaml_config_selects_version() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "sql_version: \"2000\"")?;
    writeln!(file, "max_depth: 50")?;

    let config = GeneratorConfig::from_yaml_file(file.path())?;
    assert_eq!(config.sql_version, SqlVersion::Sql2000);
    assert_eq!(config.max_depth, 50);

    // Skip needs ROW_NUMBER, unavailable before 2005
    let result = generate_sql(&paged_people(), &config);
    assert!(matches!(result, Err(SqlGenError::DialectLimitation { .. })));
    Ok(())
}

#[test]
fn test_yaml_config_rejects_out_of_range_depth() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "max_depth: 0")?;

    assert!(GeneratorConfig::from_yaml_file(file.path()).is_err());
    Ok(())
}

#[test]
#[serial]
fn test_env_config_drives_generation() {
    std::env::set_var("RELSQL_SQL_VERSION", "2012");
    std::env::set_var("RELSQL_MAX_DEPTH", "3");
    let config = GeneratorConfig::from_env();
    std::env::remove_var("RELSQL_SQL_VERSION");
    std::env::remove_var("RELSQL_MAX_DEPTH");

    let config = config.expect("valid environment");
    assert_eq!(config.sql_version, SqlVersion::Sql2012);

    // Three filters deep exceeds the configured depth
    let mut query = scan("T", &[("Id", PrimitiveType::Int32)]);
    for _ in 0..3 {
        query = filter("t", query, gt(col("t", "Id"), int(0)));
    }
    assert!(matches!(
        query.to_sql(&config),
        Err(SqlGenError::StructuralViolation(_))
    ));
}

#[test]
fn test_default_config_pages_with_row_number() {
    let generated = paged_people()
        .to_sql(&GeneratorConfig::default())
        .expect("default config compiles Skip");

    assert!(generated.sql.contains("ROW_NUMBER() OVER (ORDER BY [p].[Id] ASC) AS [row_number]"));
    assert!(generated.sql.contains("WHERE [p].[row_number] > 20"));
    let columns: Vec<&str> = generated.columns.iter().map(|c| c.column.as_str()).collect();
    assert_eq!(columns, vec!["Id", "Name"]);
}
