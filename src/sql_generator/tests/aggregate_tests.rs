use super::*;
use crate::query_tree::builders::*;
use crate::query_tree::{Aggregate, BinaryOp};

#[test]
fn test_group_by_over_columns_is_one_statement() {
    let query = group_by(
        "o",
        "g",
        orders(),
        vec![("CustomerId", col("o", "CustomerId"))],
        vec![
            ("Total", aggregate("Sum", vec![col("g", "Total")])),
            ("Orders", count()),
        ],
    );
    let generated = compile(&query);

    assert_eq!(
        normalize(&generated.sql),
        "SELECT [o].[CustomerId] AS [CustomerId], SUM([o].[Total]) AS [Total], COUNT(1) AS [Orders] \
         FROM [dbo].[Orders] AS [o] GROUP BY [o].[CustomerId]"
    );
    assert_eq!(
        column_names(&generated),
        vec!["CustomerId", "Total", "Orders"]
    );
}

#[test]
fn test_computed_aggregate_argument_uses_inner_query() {
    let query = group_by(
        "o",
        "g",
        orders(),
        vec![("CustomerId", col("o", "CustomerId"))],
        vec![(
            "Doubled",
            aggregate(
                "Sum",
                vec![binary(BinaryOp::Multiply, col("g", "Total"), int(2))],
            ),
        )],
    );

    assert_eq!(
        sql(&query),
        "SELECT [o].[CustomerId] AS [CustomerId], SUM([o].[Doubled]) AS [Doubled] FROM ( \
         SELECT [o].[CustomerId] AS [CustomerId], [o].[Total] * 2 AS [Doubled] \
         FROM [dbo].[Orders] AS [o] ) AS [o] GROUP BY [o].[CustomerId]"
    );
}

#[test]
fn test_constant_key_uses_inner_query() {
    let query = group_by(
        "o",
        "g",
        orders(),
        vec![("All", int(1))],
        vec![("Max", aggregate("Max", vec![col("g", "Total")]))],
    );
    let sql = sql(&query);

    assert!(sql.contains("SELECT 1 AS [All], [o].[Total] AS [Max]"), "SQL:\n{}", sql);
    assert!(sql.ends_with("GROUP BY [o].[All]"), "SQL:\n{}", sql);
}

#[test]
fn test_distinct_aggregate() {
    let query = group_by(
        "o",
        "g",
        orders(),
        vec![("CustomerId", col("o", "CustomerId"))],
        vec![(
            "Distinct",
            Aggregate {
                function: "Count".to_string(),
                distinct: true,
                args: vec![col("g", "Id")],
            },
        )],
    );

    assert!(sql(&query).contains("COUNT(DISTINCT [o].[Id]) AS [Distinct]"));
}

#[test]
fn test_filter_after_group_by_wraps() {
    let query = filter(
        "t",
        group_by(
            "o",
            "g",
            orders(),
            vec![("CustomerId", col("o", "CustomerId"))],
            vec![("Orders", count())],
        ),
        gt(col("t", "Orders"), int(3)),
    );
    let sql = sql(&query);

    assert_eq!(sql.matches("SELECT").count(), 2, "SQL:\n{}", sql);
    assert!(sql.ends_with(") AS [t] WHERE [t].[Orders] > 3"), "SQL:\n{}", sql);
}

#[test]
fn test_group_by_over_filter_reuses_statement() {
    let query = group_by(
        "o",
        "g",
        filter("f", orders(), gt(col("f", "Total"), int(0))),
        vec![("CustomerId", col("o", "CustomerId"))],
        vec![("BigCount", aggregate("BigCount", Vec::new()))],
    );

    assert_eq!(
        sql(&query),
        "SELECT [f].[CustomerId] AS [CustomerId], COUNT_BIG(1) AS [BigCount] \
         FROM [dbo].[Orders] AS [f] WHERE [f].[Total] > 0 GROUP BY [f].[CustomerId]"
    );
}

#[test]
fn test_unknown_aggregate_passes_through() {
    let query = group_by(
        "o",
        "g",
        orders(),
        vec![("CustomerId", col("o", "CustomerId"))],
        vec![("Median", aggregate("MEDIAN_APPROX", vec![col("g", "Total")]))],
    );

    assert!(sql(&query).contains("MEDIAN_APPROX([o].[Total]) AS [Median]"));
}

#[test]
fn test_group_by_over_wrapped_distinct_keeps_distinct_separate() {
    let query = group_by(
        "d",
        "g",
        distinct(limit(
            project("c", customers(), vec![("N", col("c", "Name"))]),
            int(5),
        )),
        vec![("N", col("d", "N"))],
        vec![("Cnt", count())],
    );
    let generated = compile(&query);

    assert_eq!(
        normalize(&generated.sql),
        "SELECT [d].[N] AS [N], COUNT(1) AS [Cnt] \
         FROM ( SELECT DISTINCT [distinct].[N] AS [N] \
         FROM ( SELECT TOP (5) [c].[Name] AS [N] FROM [dbo].[Customers] AS [c] ) AS [distinct] ) AS [d] \
         GROUP BY [d].[N]"
    );
    assert_eq!(column_names(&generated), vec!["N", "Cnt"]);
}
