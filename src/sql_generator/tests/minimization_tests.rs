use super::*;
use crate::query_tree::builders::*;

#[test]
fn test_filter_over_scan_expands_columns() {
    let query = filter("c", customers(), gt(col("c", "Id"), int(5)));
    let generated = compile(&query);

    assert_eq!(
        normalize(&generated.sql),
        "SELECT [c].[Id] AS [Id], [c].[Name] AS [Name] FROM [dbo].[Customers] AS [c] WHERE [c].[Id] > 5"
    );
    assert_eq!(column_names(&generated), vec!["Id", "Name"]);
    assert_eq!(generated.columns[1].field, "Name");
}

#[test]
fn test_project_reuses_filter_statement() {
    let query = project(
        "c",
        filter("c", customers(), gt(col("c", "Id"), int(5))),
        vec![
            ("Id", col("c", "Id")),
            (
                "Upper",
                func("ToUpper", vec![col("c", "Name")], PrimitiveType::String),
            ),
        ],
    );
    let sql = sql(&query);

    assert_eq!(
        sql,
        "SELECT [c].[Id] AS [Id], UPPER([c].[Name]) AS [Upper] FROM [dbo].[Customers] AS [c] WHERE [c].[Id] > 5"
    );
    assert_eq!(sql.matches("SELECT").count(), 1);
}

#[test]
fn test_filter_after_project_wraps_derived_table() {
    let query = filter(
        "p",
        project("c", customers(), vec![("Id", col("c", "Id"))]),
        gt(col("p", "Id"), int(1)),
    );

    assert_eq!(
        sql(&query),
        "SELECT [p].[Id] AS [Id] FROM ( SELECT [c].[Id] AS [Id] FROM [dbo].[Customers] AS [c] ) AS [p] WHERE [p].[Id] > 1"
    );
}

#[test]
fn test_sort_keeps_order_by_on_root() {
    let query = project(
        "c",
        sort("c", customers(), vec![asc(col("c", "Name"))]),
        vec![("Name", col("c", "Name"))],
    );

    assert_eq!(
        sql(&query),
        "SELECT [c].[Name] AS [Name] FROM [dbo].[Customers] AS [c] ORDER BY [c].[Name] ASC"
    );
}

#[test]
fn test_order_by_dropped_inside_derived_table() {
    // The sort ends up in a nested statement without TOP
    let query = filter(
        "p",
        project(
            "c",
            sort("c", customers(), vec![desc(col("c", "Id"))]),
            vec![("Id", col("c", "Id"))],
        ),
        gt(col("p", "Id"), int(0)),
    );
    let sql = sql(&query);

    assert!(
        !sql.contains("ORDER BY"),
        "nested ORDER BY without TOP must not be written. SQL:\n{}",
        sql
    );
}

#[test]
fn test_filter_over_sort_shares_statement() {
    let query = filter(
        "s",
        sort("c", customers(), vec![asc(col("c", "Name"))]),
        gt(col("s", "Id"), int(3)),
    );
    let sql = sql(&query);

    assert_eq!(sql.matches("SELECT").count(), 1, "SQL:\n{}", sql);
    assert!(sql.contains("WHERE [c].[Id] > 3"), "SQL:\n{}", sql);
    assert!(sql.ends_with("ORDER BY [c].[Name] ASC"), "SQL:\n{}", sql);
}

#[test]
fn test_second_filter_wraps() {
    let query = filter(
        "o",
        filter("c", customers(), gt(col("c", "Id"), int(1))),
        lt(col("o", "Id"), int(10)),
    );
    let sql = sql(&query);

    assert_eq!(sql.matches("SELECT").count(), 2, "SQL:\n{}", sql);
    assert!(sql.contains(") AS [o] WHERE [o].[Id] < 10"), "SQL:\n{}", sql);
}

#[test]
fn test_distinct_over_projection() {
    let query = distinct(project("c", customers(), vec![("Name", col("c", "Name"))]));

    assert_eq!(
        sql(&query),
        "SELECT DISTINCT [c].[Name] AS [Name] FROM [dbo].[Customers] AS [c]"
    );
}

#[test]
fn test_distinct_over_limit_wraps() {
    let query = distinct(limit(
        project("c", customers(), vec![("Name", col("c", "Name"))]),
        int(3),
    ));
    let sql = sql(&query);

    assert!(sql.starts_with("SELECT DISTINCT"), "SQL:\n{}", sql);
    assert!(sql.contains("( SELECT TOP (3)"), "SQL:\n{}", sql);
}

#[test]
fn test_identity_projection_leaves_expansion_to_consumer() {
    let query = Expr::Project {
        input: crate::query_tree::Binding::new("c", customers()),
        projection: Box::new(var("c")),
    };

    assert_eq!(
        sql(&query),
        "SELECT [c].[Id] AS [Id], [c].[Name] AS [Name] FROM [dbo].[Customers] AS [c]"
    );
}

#[test]
fn test_scalar_projection_uses_c1() {
    let query = Expr::Project {
        input: crate::query_tree::Binding::new("c", customers()),
        projection: Box::new(col("c", "Name")),
    };
    let generated = compile(&query);

    assert_eq!(
        normalize(&generated.sql),
        "SELECT [c].[Name] AS [C1] FROM [dbo].[Customers] AS [c]"
    );
    assert_eq!(column_names(&generated), vec!["C1"]);
}

#[test]
fn test_scalar_root() {
    let generated = compile(&add(int(1), int(2)));
    assert_eq!(normalize(&generated.sql), "SELECT 1 + 2 AS [C1]");
    assert_eq!(column_names(&generated), vec!["C1"]);
}

#[test]
fn test_element_as_scalar_subquery() {
    let query = project(
        "o",
        orders(),
        vec![(
            "FirstName",
            element(Expr::Project {
                input: crate::query_tree::Binding::new(
                    "c",
                    filter("c", customers(), eq(col("c", "Id"), col("o", "CustomerId"))),
                ),
                projection: Box::new(col("c", "Name")),
            }),
        )],
    );
    let sql = sql(&query);

    assert!(
        sql.contains("(SELECT TOP (1) [c].[Name] AS [C1] FROM [dbo].[Customers] AS [c] WHERE [c].[Id] = [o].[CustomerId]) AS [FirstName]"),
        "SQL:\n{}",
        sql
    );
}

#[test]
fn test_depth_limit_is_enforced() {
    let mut query = customers();
    for _ in 0..10 {
        query = filter("c", query, gt(col("c", "Id"), int(0)));
    }
    let result = generate_sql_with_dialect(&query, &SqlServerDialect::default(), 5);
    assert!(matches!(result, Err(SqlGenError::StructuralViolation(_))));
}

#[test]
fn test_deep_tree_is_rejected_before_typing() {
    let mut query = customers();
    for _ in 0..5_000 {
        query = distinct(query);
    }
    let result = generate_sql_with_dialect(&query, &SqlServerDialect::default(), 200);
    match result {
        Err(SqlGenError::StructuralViolation(message)) => {
            assert!(message.contains("maximum of 200"), "{}", message)
        }
        other => panic!("expected a depth violation, got {:?}", other),
    }
}

#[test]
fn test_tree_at_depth_limit_compiles() {
    // Filter > Binary > Property > Variable
    let query = filter("c", customers(), gt(col("c", "Id"), int(5)));
    let result = generate_sql_with_dialect(&query, &SqlServerDialect::default(), 4);
    assert!(result.is_ok(), "{:?}", result);
}

#[test]
fn test_bare_variable_is_rejected() {
    let query = project("c", customers(), vec![("Whole", var("c"))]);
    let result = compile_for(&query, SqlVersion::Sql2008);
    assert!(matches!(result, Err(SqlGenError::StructuralViolation(_))));
}

#[test]
fn test_unbound_variable_is_rejected() {
    let query = filter("c", customers(), gt(col("x", "Id"), int(0)));
    let result = compile_for(&query, SqlVersion::Sql2008);
    assert!(matches!(result, Err(SqlGenError::StructuralViolation(_))));
}

#[test]
fn test_nested_record_is_unsupported() {
    let query = project(
        "c",
        customers(),
        vec![("Inner", record(vec![("Id", col("c", "Id"))]))],
    );
    let result = compile_for(&query, SqlVersion::Sql2008);
    assert!(matches!(
        result,
        Err(SqlGenError::UnsupportedConstruct { .. })
    ));
}
