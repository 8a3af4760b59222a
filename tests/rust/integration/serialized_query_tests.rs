use std::io::Write;

use relsql::config::GeneratorConfig;
use relsql::query_tree::Expr;
use relsql::sql_generator::generate_sql;
use tempfile::NamedTempFile;

const ORDERS_BY_CUSTOMER_YAML: &str = r#"
GroupBy:
  input:
    variable: o
    group_variable: g
    expr:
      Scan:
        schema: sales
        table: Orders
        columns:
          - name: CustomerId
            ty: { Primitive: Int32 }
          - name: Total
            ty: { Primitive: Decimal }
  keys:
    - name: CustomerId
      expr:
        Property:
          instance: { Variable: { name: o } }
          name: CustomerId
  aggregates:
    - name: Spent
      aggregate:
        function: Sum
        args:
          - Property:
              instance: { Variable: { name: g } }
              name: Total
"#;

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn test_yaml_query_file_compiles() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(ORDERS_BY_CUSTOMER_YAML.as_bytes())?;

    let content = std::fs::read_to_string(file.path())?;
    let query = Expr::from_yaml(&content)?;
    let generated = generate_sql(&query, &GeneratorConfig::default())?;

    assert_eq!(
        normalize(&generated.sql),
        "SELECT [o].[CustomerId] AS [CustomerId], SUM([o].[Total]) AS [Spent] \
         FROM [sales].[Orders] AS [o] GROUP BY [o].[CustomerId]"
    );
    Ok(())
}

#[test]
fn test_json_roundtrip_compiles_identically() -> anyhow::Result<()> {
    let query = Expr::from_yaml(ORDERS_BY_CUSTOMER_YAML)?;
    let json = serde_json::to_string_pretty(&query)?;

    let mut file = NamedTempFile::new()?;
    file.write_all(json.as_bytes())?;
    let reloaded = Expr::from_json(&std::fs::read_to_string(file.path())?)?;

    let config = GeneratorConfig::default();
    assert_eq!(
        generate_sql(&query, &config)?.sql,
        generate_sql(&reloaded, &config)?.sql
    );
    Ok(())
}

#[test]
fn test_generated_columns_serialize() -> anyhow::Result<()> {
    let query = Expr::from_yaml(ORDERS_BY_CUSTOMER_YAML)?;
    let generated = generate_sql(&query, &GeneratorConfig::default())?;
    let value = serde_json::to_value(&generated)?;

    assert_eq!(value["columns"][1]["field"], "Spent");
    assert_eq!(value["columns"][1]["column"], "Spent");
    Ok(())
}
