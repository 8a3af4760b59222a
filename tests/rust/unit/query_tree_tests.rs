use relsql::query_tree::builders::*;
use relsql::query_tree::{Expr, Field, PrimitiveType, TypeUsage};

#[test]
fn test_result_type_of_projection() {
    let query = project(
        "c",
        scan("Customers", &[("Id", PrimitiveType::Int32)]),
        vec![("Key", col("c", "Id")), ("Label", string("x"))],
    );

    assert_eq!(
        query.result_type(),
        TypeUsage::collection_of(TypeUsage::row(vec![
            Field::primitive("Key", PrimitiveType::Int32),
            Field::primitive("Label", PrimitiveType::String),
        ]))
    );
}

#[test]
fn test_join_rows_nest_member_rows() {
    let query = cross_join(vec![
        ("a", scan("A", &[("Id", PrimitiveType::Int32)])),
        ("b", scan("B", &[("Code", PrimitiveType::String)])),
    ]);
    let element = query.result_type().element_type().clone();

    assert_eq!(element.fields().len(), 2);
    assert_eq!(
        element.field("b"),
        Some(&TypeUsage::row(vec![Field::primitive(
            "Code",
            PrimitiveType::String
        )]))
    );
}

#[test]
fn test_tree_deserializes_from_json() {
    let json = r#"{
        "Filter": {
            "input": {
                "variable": "c",
                "expr": {
                    "Scan": {
                        "table": "Customers",
                        "columns": [
                            { "name": "Id", "ty": { "Primitive": "Int32" } }
                        ]
                    }
                }
            },
            "predicate": {
                "Binary": {
                    "op": "GreaterThan",
                    "left": { "Property": { "instance": { "Variable": { "name": "c" } }, "name": "Id" } },
                    "right": { "Constant": { "Int32": 7 } }
                }
            }
        }
    }"#;

    let parsed: Expr = serde_json::from_str(json).expect("valid tree");
    let expected = filter(
        "c",
        scan_in(None, "Customers", &[("Id", PrimitiveType::Int32)]),
        gt(col("c", "Id"), int(7)),
    );
    assert_eq!(parsed, expected);
}

#[test]
fn test_kind_names() {
    assert_eq!(limit(var("x"), int(1)).kind_name(), "Limit");
    assert_eq!(is_null(var("x")).kind_name(), "IsNull");
}
