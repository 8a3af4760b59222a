//! Shorthand constructors for building query trees in code and tests.

use super::*;

/// Scan of `dbo.<table>` with the given columns.
pub fn scan(table: &str, columns: &[(&str, PrimitiveType)]) -> Expr {
    scan_in(Some("dbo"), table, columns)
}

pub fn scan_in(schema: Option<&str>, table: &str, columns: &[(&str, PrimitiveType)]) -> Expr {
    Expr::Scan {
        schema: schema.map(str::to_string),
        table: table.to_string(),
        columns: columns
            .iter()
            .map(|(name, ty)| Field::primitive(*name, *ty))
            .collect(),
    }
}

pub fn var(name: &str) -> Expr {
    Expr::Variable {
        name: name.to_string(),
    }
}

pub fn prop(instance: Expr, name: &str) -> Expr {
    Expr::Property {
        instance: Box::new(instance),
        name: name.to_string(),
    }
}

/// `variable.column`
pub fn col(variable: &str, column: &str) -> Expr {
    prop(var(variable), column)
}

/// `variable.member.column`, navigating a join row.
pub fn path(variable: &str, members: &[&str]) -> Expr {
    members
        .iter()
        .fold(var(variable), |instance, member| prop(instance, member))
}

pub fn int(value: i32) -> Expr {
    Expr::Constant(Literal::Int32(value))
}

pub fn string(value: &str) -> Expr {
    Expr::Constant(Literal::String(value.to_string()))
}

pub fn boolean(value: bool) -> Expr {
    Expr::Constant(Literal::Boolean(value))
}

pub fn param(name: &str, ty: PrimitiveType) -> Expr {
    Expr::Parameter {
        name: name.to_string(),
        ty,
    }
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Equal, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::GreaterThan, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::LessThan, left, right)
}

pub fn and(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::And, left, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Or, left, right)
}

pub fn add(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Add, left, right)
}

pub fn not(argument: Expr) -> Expr {
    Expr::Not {
        argument: Box::new(argument),
    }
}

pub fn is_null(argument: Expr) -> Expr {
    Expr::IsNull {
        argument: Box::new(argument),
    }
}

pub fn exists(argument: Expr) -> Expr {
    Expr::Exists {
        argument: Box::new(argument),
    }
}

pub fn is_empty(argument: Expr) -> Expr {
    Expr::IsEmpty {
        argument: Box::new(argument),
    }
}

pub fn func(name: &str, args: Vec<Expr>, result_type: PrimitiveType) -> Expr {
    Expr::Function {
        name: name.to_string(),
        args,
        result_type,
    }
}

pub fn record(fields: Vec<(&str, Expr)>) -> Expr {
    Expr::Record {
        fields: fields
            .into_iter()
            .map(|(name, expr)| NamedExpr {
                name: name.to_string(),
                expr,
            })
            .collect(),
    }
}

pub fn filter(variable: &str, input: Expr, predicate: Expr) -> Expr {
    Expr::Filter {
        input: Binding::new(variable, input),
        predicate: Box::new(predicate),
    }
}

/// Project with a record-construction projection.
pub fn project(variable: &str, input: Expr, fields: Vec<(&str, Expr)>) -> Expr {
    Expr::Project {
        input: Binding::new(variable, input),
        projection: Box::new(record(fields)),
    }
}

pub fn join(kind: JoinKind, left: (&str, Expr), right: (&str, Expr), condition: Expr) -> Expr {
    Expr::Join {
        kind,
        left: Binding::new(left.0, left.1),
        right: Binding::new(right.0, right.1),
        condition: Box::new(condition),
    }
}

pub fn inner_join(left: (&str, Expr), right: (&str, Expr), condition: Expr) -> Expr {
    join(JoinKind::Inner, left, right, condition)
}

pub fn cross_join(inputs: Vec<(&str, Expr)>) -> Expr {
    Expr::CrossJoin {
        inputs: inputs
            .into_iter()
            .map(|(variable, expr)| Binding::new(variable, expr))
            .collect(),
    }
}

pub fn apply(kind: ApplyKind, input: (&str, Expr), applied: (&str, Expr)) -> Expr {
    Expr::Apply {
        kind,
        input: Binding::new(input.0, input.1),
        apply: Binding::new(applied.0, applied.1),
    }
}

pub fn asc(expr: Expr) -> SortKey {
    SortKey {
        expr,
        ascending: true,
        collation: None,
    }
}

pub fn desc(expr: Expr) -> SortKey {
    SortKey {
        expr,
        ascending: false,
        collation: None,
    }
}

pub fn sort(variable: &str, input: Expr, keys: Vec<SortKey>) -> Expr {
    Expr::Sort {
        input: Binding::new(variable, input),
        keys,
    }
}

pub fn skip(variable: &str, input: Expr, keys: Vec<SortKey>, count: Expr) -> Expr {
    Expr::Skip {
        input: Binding::new(variable, input),
        keys,
        count: Box::new(count),
    }
}

pub fn limit(argument: Expr, count: Expr) -> Expr {
    Expr::Limit {
        argument: Box::new(argument),
        count: Box::new(count),
        with_ties: false,
    }
}

pub fn distinct(argument: Expr) -> Expr {
    Expr::Distinct {
        argument: Box::new(argument),
    }
}

pub fn element(argument: Expr) -> Expr {
    Expr::Element {
        argument: Box::new(argument),
    }
}

pub fn set_op(kind: SetOpKind, left: Expr, right: Expr) -> Expr {
    Expr::SetOp {
        kind,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn aggregate(function: &str, args: Vec<Expr>) -> Aggregate {
    Aggregate {
        function: function.to_string(),
        distinct: false,
        args,
    }
}

/// Zero-argument `Count()`.
pub fn count() -> Aggregate {
    aggregate("Count", Vec::new())
}

pub fn group_by(
    variable: &str,
    group_variable: &str,
    input: Expr,
    keys: Vec<(&str, Expr)>,
    aggregates: Vec<(&str, Aggregate)>,
) -> Expr {
    Expr::GroupBy {
        input: GroupBinding {
            variable: variable.to_string(),
            group_variable: group_variable.to_string(),
            expr: Box::new(input),
        },
        keys: keys
            .into_iter()
            .map(|(name, expr)| NamedExpr {
                name: name.to_string(),
                expr,
            })
            .collect(),
        aggregates: aggregates
            .into_iter()
            .map(|(name, aggregate)| NamedAggregate {
                name: name.to_string(),
                aggregate,
            })
            .collect(),
    }
}
