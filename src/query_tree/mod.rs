//! Input tree consumed by the SQL generator.
//!
//! A query is a closed tree of relational operators (scan, filter, project,
//! joins, grouping, paging, set operations) whose inputs are named through
//! [`Binding`]s, with scalar expressions hanging off them. Every node derives
//! serde so trees can be loaded from JSON or YAML.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub mod builders;
pub mod types;

pub use types::{Field, PrimitiveType, TypeUsage};

/// Column name given to a projection that is not a record construction, and
/// to a scalar query root.
pub const SCALAR_COLUMN: &str = "C1";

/// Names the row variable of a relational input.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub variable: String,
    pub expr: Box<Expr>,
}

impl Binding {
    pub fn new(variable: impl Into<String>, expr: Expr) -> Self {
        Binding {
            variable: variable.into(),
            expr: Box::new(expr),
        }
    }
}

/// Input binding of a GroupBy: the row variable keys are computed from and
/// the group variable aggregates read from. Both range over the same input.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GroupBinding {
    pub variable: String,
    pub group_variable: String,
    pub expr: Box<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NamedExpr {
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    pub function: String,
    #[serde(default)]
    pub distinct: bool,
    /// Empty for the zero-argument form (`Count()`).
    #[serde(default)]
    pub args: Vec<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NamedAggregate {
    pub name: String,
    pub aggregate: Aggregate,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: Expr,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    #[serde(default)]
    pub collation: Option<String>,
}

fn default_ascending() -> bool {
    true
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CaseClause {
    pub when: Expr,
    pub then: Expr,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    FullOuter,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum ApplyKind {
    Cross,
    Outer,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum SetOpKind {
    UnionAll,
    Union,
    Intersect,
    Except,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
        )
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Literal {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// Decimal kept in its textual form to avoid float rounding.
    Decimal(String),
    Double(f64),
    String(String),
    /// ISO-8601 timestamp text.
    DateTime(String),
    Guid(String),
}

impl Literal {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Literal::Boolean(_) => PrimitiveType::Boolean,
            Literal::Int32(_) => PrimitiveType::Int32,
            Literal::Int64(_) => PrimitiveType::Int64,
            Literal::Decimal(_) => PrimitiveType::Decimal,
            Literal::Double(_) => PrimitiveType::Double,
            Literal::String(_) => PrimitiveType::String,
            Literal::DateTime(_) => PrimitiveType::DateTime,
            Literal::Guid(_) => PrimitiveType::Guid,
        }
    }
}

/// One node of a query tree.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Expr {
    // Relational operators
    Scan {
        #[serde(default)]
        schema: Option<String>,
        table: String,
        columns: Vec<Field>,
    },
    Filter {
        input: Binding,
        predicate: Box<Expr>,
    },
    Project {
        input: Binding,
        projection: Box<Expr>,
    },
    Join {
        kind: JoinKind,
        left: Binding,
        right: Binding,
        condition: Box<Expr>,
    },
    CrossJoin {
        inputs: Vec<Binding>,
    },
    Apply {
        kind: ApplyKind,
        input: Binding,
        apply: Binding,
    },
    GroupBy {
        input: GroupBinding,
        keys: Vec<NamedExpr>,
        aggregates: Vec<NamedAggregate>,
    },
    Sort {
        input: Binding,
        keys: Vec<SortKey>,
    },
    Skip {
        input: Binding,
        keys: Vec<SortKey>,
        count: Box<Expr>,
    },
    Limit {
        argument: Box<Expr>,
        count: Box<Expr>,
        #[serde(default)]
        with_ties: bool,
    },
    Distinct {
        argument: Box<Expr>,
    },
    Element {
        argument: Box<Expr>,
    },
    SetOp {
        kind: SetOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    // Scalar expressions
    Record {
        fields: Vec<NamedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        argument: Box<Expr>,
    },
    Negate {
        argument: Box<Expr>,
    },
    IsNull {
        argument: Box<Expr>,
    },
    Like {
        argument: Box<Expr>,
        pattern: Box<Expr>,
        #[serde(default)]
        escape: Option<Box<Expr>>,
    },
    In {
        argument: Box<Expr>,
        list: Vec<Expr>,
    },
    Case {
        clauses: Vec<CaseClause>,
        else_expr: Box<Expr>,
    },
    Cast {
        argument: Box<Expr>,
        target: PrimitiveType,
    },
    Null {
        #[serde(default)]
        ty: Option<PrimitiveType>,
    },
    Constant(Literal),
    Parameter {
        name: String,
        ty: PrimitiveType,
    },
    Variable {
        name: String,
    },
    Property {
        instance: Box<Expr>,
        name: String,
    },
    Function {
        name: String,
        args: Vec<Expr>,
        result_type: PrimitiveType,
    },
    Exists {
        argument: Box<Expr>,
    },
    IsEmpty {
        argument: Box<Expr>,
    },
}

impl Expr {
    /// Parse a tree from JSON, enum variants written as single-key objects.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parse a tree from YAML using the same single-key map layout as JSON.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(
            text,
        ))
    }

    /// Human readable node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Scan { .. } => "Scan",
            Expr::Filter { .. } => "Filter",
            Expr::Project { .. } => "Project",
            Expr::Join { .. } => "Join",
            Expr::CrossJoin { .. } => "CrossJoin",
            Expr::Apply { .. } => "Apply",
            Expr::GroupBy { .. } => "GroupBy",
            Expr::Sort { .. } => "Sort",
            Expr::Skip { .. } => "Skip",
            Expr::Limit { .. } => "Limit",
            Expr::Distinct { .. } => "Distinct",
            Expr::Element { .. } => "Element",
            Expr::SetOp { .. } => "SetOp",
            Expr::Record { .. } => "Record",
            Expr::Binary { .. } => "Binary",
            Expr::Not { .. } => "Not",
            Expr::Negate { .. } => "Negate",
            Expr::IsNull { .. } => "IsNull",
            Expr::Like { .. } => "Like",
            Expr::In { .. } => "In",
            Expr::Case { .. } => "Case",
            Expr::Cast { .. } => "Cast",
            Expr::Null { .. } => "Null",
            Expr::Constant(_) => "Constant",
            Expr::Parameter { .. } => "Parameter",
            Expr::Variable { .. } => "Variable",
            Expr::Property { .. } => "Property",
            Expr::Function { .. } => "Function",
            Expr::Exists { .. } => "Exists",
            Expr::IsEmpty { .. } => "IsEmpty",
        }
    }

    /// Join-like nodes whose left-most position may be flattened into the
    /// enclosing FROM list.
    pub fn is_join(&self) -> bool {
        matches!(
            self,
            Expr::Join { .. } | Expr::CrossJoin { .. } | Expr::Apply { .. }
        )
    }

    /// Operator nodes producing a collection of rows.
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Expr::Scan { .. }
                | Expr::Filter { .. }
                | Expr::Project { .. }
                | Expr::Join { .. }
                | Expr::CrossJoin { .. }
                | Expr::Apply { .. }
                | Expr::GroupBy { .. }
                | Expr::Sort { .. }
                | Expr::Skip { .. }
                | Expr::Limit { .. }
                | Expr::Distinct { .. }
                | Expr::Element { .. }
                | Expr::SetOp { .. }
        )
    }

    /// Direct child nodes, inputs first.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Scan { .. }
            | Expr::Null { .. }
            | Expr::Constant(_)
            | Expr::Parameter { .. }
            | Expr::Variable { .. } => Vec::new(),
            Expr::Filter { input, predicate } => vec![&*input.expr, &**predicate],
            Expr::Project { input, projection } => vec![&*input.expr, &**projection],
            Expr::Join {
                left,
                right,
                condition,
                ..
            } => vec![&*left.expr, &*right.expr, &**condition],
            Expr::CrossJoin { inputs } => inputs.iter().map(|b| &*b.expr).collect(),
            Expr::Apply { input, apply, .. } => vec![&*input.expr, &*apply.expr],
            Expr::GroupBy {
                input,
                keys,
                aggregates,
            } => {
                let mut children: Vec<&Expr> = vec![&*input.expr];
                children.extend(keys.iter().map(|k| &k.expr));
                children.extend(aggregates.iter().flat_map(|a| a.aggregate.args.iter()));
                children
            }
            Expr::Sort { input, keys } => {
                let mut children: Vec<&Expr> = vec![&*input.expr];
                children.extend(keys.iter().map(|k| &k.expr));
                children
            }
            Expr::Skip { input, keys, count } => {
                let mut children: Vec<&Expr> = vec![&*input.expr];
                children.extend(keys.iter().map(|k| &k.expr));
                children.push(&**count);
                children
            }
            Expr::Limit {
                argument, count, ..
            } => vec![&**argument, &**count],
            Expr::Distinct { argument }
            | Expr::Element { argument }
            | Expr::Not { argument }
            | Expr::Negate { argument }
            | Expr::IsNull { argument }
            | Expr::Cast { argument, .. }
            | Expr::Exists { argument }
            | Expr::IsEmpty { argument } => vec![&**argument],
            Expr::SetOp { left, right, .. } | Expr::Binary { left, right, .. } => {
                vec![&**left, &**right]
            }
            Expr::Record { fields } => fields.iter().map(|f| &f.expr).collect(),
            Expr::Like {
                argument,
                pattern,
                escape,
            } => {
                let mut children: Vec<&Expr> = vec![&**argument, &**pattern];
                children.extend(escape.as_deref());
                children
            }
            Expr::In { argument, list } => {
                let mut children: Vec<&Expr> = vec![&**argument];
                children.extend(list.iter());
                children
            }
            Expr::Case { clauses, else_expr } => {
                let mut children: Vec<&Expr> = Vec::with_capacity(clauses.len() * 2 + 1);
                for clause in clauses {
                    children.push(&clause.when);
                    children.push(&clause.then);
                }
                children.push(&**else_expr);
                children
            }
            Expr::Property { instance, .. } => vec![&**instance],
            Expr::Function { args, .. } => args.iter().collect(),
        }
    }

    /// Whether the tree nests more than `limit` nodes deep. Recursion stops
    /// at the limit, so arbitrarily deep trees are rejected without walking
    /// them fully.
    pub fn exceeds_depth(&self, limit: usize) -> bool {
        limit == 0 || self.children().iter().any(|c| c.exceeds_depth(limit - 1))
    }

    /// Structural type of this node. The tree is assumed well-typed; an
    /// unresolvable variable or property yields an empty row type.
    pub fn result_type(&self) -> TypeUsage {
        TypeScope::default().type_of(self)
    }

    /// [`Expr::result_type`] reusing the types of relational nodes already
    /// derived into `cache`.
    pub fn result_type_cached(&self, cache: &mut TypeCache) -> TypeUsage {
        TypeScope {
            bindings: Vec::new(),
            cache: Some(cache),
        }
        .type_of(self)
    }
}

/// Types of relational nodes of one tree, keyed by node address. A cache
/// must only be used with the tree that filled it.
#[derive(Debug, Default)]
pub struct TypeCache {
    types: HashMap<usize, TypeUsage>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Result type of an aggregate call given the type of its argument.
pub fn aggregate_result_type(function: &str, argument: Option<&TypeUsage>) -> TypeUsage {
    match function.to_ascii_lowercase().as_str() {
        "count" => TypeUsage::Primitive(PrimitiveType::Int32),
        "bigcount" => TypeUsage::Primitive(PrimitiveType::Int64),
        "avg" | "stdev" | "stdevp" | "var" | "varp" => match argument {
            Some(TypeUsage::Primitive(PrimitiveType::Decimal)) => {
                TypeUsage::Primitive(PrimitiveType::Decimal)
            }
            _ => TypeUsage::Primitive(PrimitiveType::Double),
        },
        _ => argument
            .cloned()
            .unwrap_or(TypeUsage::Primitive(PrimitiveType::Int32)),
    }
}

#[derive(Default)]
struct TypeScope<'c> {
    bindings: Vec<(String, TypeUsage)>,
    cache: Option<&'c mut TypeCache>,
}

impl TypeScope<'_> {
    fn lookup(&self, name: &str) -> Option<&TypeUsage> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    fn with_bindings<R>(
        &mut self,
        bindings: Vec<(String, TypeUsage)>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let n = bindings.len();
        self.bindings.extend(bindings);
        let result = f(self);
        self.bindings.truncate(self.bindings.len() - n);
        result
    }

    fn element_of(&mut self, expr: &Expr) -> TypeUsage {
        self.type_of(expr).element_type().clone()
    }

    fn type_of(&mut self, expr: &Expr) -> TypeUsage {
        if !expr.is_relational() {
            return self.derive(expr);
        }
        let key = expr as *const Expr as usize;
        if let Some(ty) = self.cache.as_ref().and_then(|c| c.types.get(&key)) {
            return ty.clone();
        }
        let ty = self.derive(expr);
        if let Some(cache) = self.cache.as_mut() {
            cache.types.insert(key, ty.clone());
        }
        ty
    }

    fn derive(&mut self, expr: &Expr) -> TypeUsage {
        match expr {
            Expr::Scan { columns, .. } => {
                TypeUsage::collection_of(TypeUsage::row(columns.clone()))
            }
            Expr::Filter { input, .. } | Expr::Sort { input, .. } | Expr::Skip { input, .. } => {
                self.type_of(&input.expr)
            }
            Expr::Limit { argument, .. } | Expr::Distinct { argument } => self.type_of(argument),
            Expr::Element { argument } => self.element_of(argument),
            Expr::SetOp { left, .. } => self.type_of(left),
            Expr::Project { input, projection } => {
                let element = self.element_of(&input.expr);
                let projected = self.with_bindings(vec![(input.variable.clone(), element)], |s| {
                    s.type_of(projection)
                });
                match projected {
                    row @ TypeUsage::Row(_) => TypeUsage::collection_of(row),
                    other => TypeUsage::collection_of(TypeUsage::row(vec![Field::new(
                        SCALAR_COLUMN,
                        other,
                    )])),
                }
            }
            Expr::Join { left, right, .. } => {
                let fields = vec![
                    Field::new(left.variable.clone(), self.element_of(&left.expr)),
                    Field::new(right.variable.clone(), self.element_of(&right.expr)),
                ];
                TypeUsage::collection_of(TypeUsage::row(fields))
            }
            Expr::CrossJoin { inputs } => {
                let fields = inputs
                    .iter()
                    .map(|b| Field::new(b.variable.clone(), self.element_of(&b.expr)))
                    .collect();
                TypeUsage::collection_of(TypeUsage::row(fields))
            }
            Expr::Apply { input, apply, .. } => {
                let input_ty = self.element_of(&input.expr);
                let apply_ty = self
                    .with_bindings(vec![(input.variable.clone(), input_ty.clone())], |s| {
                        s.element_of(&apply.expr)
                    });
                TypeUsage::collection_of(TypeUsage::row(vec![
                    Field::new(input.variable.clone(), input_ty),
                    Field::new(apply.variable.clone(), apply_ty),
                ]))
            }
            Expr::GroupBy {
                input,
                keys,
                aggregates,
            } => {
                let element = self.element_of(&input.expr);
                let bindings = vec![
                    (input.variable.clone(), element.clone()),
                    (input.group_variable.clone(), element),
                ];
                let fields = self.with_bindings(bindings, |s| {
                    let mut fields: Vec<Field> = keys
                        .iter()
                        .map(|k| Field::new(k.name.clone(), s.type_of(&k.expr)))
                        .collect();
                    for agg in aggregates {
                        let arg = agg.aggregate.args.first().map(|a| s.type_of(a));
                        fields.push(Field::new(
                            agg.name.clone(),
                            aggregate_result_type(&agg.aggregate.function, arg.as_ref()),
                        ));
                    }
                    fields
                });
                TypeUsage::collection_of(TypeUsage::row(fields))
            }
            Expr::Record { fields } => TypeUsage::row(
                fields
                    .iter()
                    .map(|f| Field::new(f.name.clone(), self.type_of(&f.expr)))
                    .collect(),
            ),
            Expr::Binary { op, left, .. } => {
                if op.is_arithmetic() {
                    self.type_of(left)
                } else {
                    TypeUsage::Primitive(PrimitiveType::Boolean)
                }
            }
            Expr::Not { .. }
            | Expr::IsNull { .. }
            | Expr::Like { .. }
            | Expr::In { .. }
            | Expr::Exists { .. }
            | Expr::IsEmpty { .. } => TypeUsage::Primitive(PrimitiveType::Boolean),
            Expr::Negate { argument } => self.type_of(argument),
            Expr::Case { clauses, else_expr } => match clauses.first() {
                Some(clause) => self.type_of(&clause.then),
                None => self.type_of(else_expr),
            },
            Expr::Cast { target, .. } => TypeUsage::Primitive(*target),
            Expr::Null { ty } => TypeUsage::Primitive(ty.unwrap_or(PrimitiveType::Int32)),
            Expr::Constant(literal) => TypeUsage::Primitive(literal.primitive_type()),
            Expr::Parameter { ty, .. } => TypeUsage::Primitive(*ty),
            Expr::Variable { name } => self
                .lookup(name)
                .cloned()
                .unwrap_or_else(|| TypeUsage::row(Vec::new())),
            Expr::Property { instance, name } => self
                .type_of(instance)
                .field(name)
                .cloned()
                .unwrap_or_else(|| TypeUsage::row(Vec::new())),
            Expr::Function { result_type, .. } => TypeUsage::Primitive(*result_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::builders::*;
    use super::*;

    fn customers() -> Expr {
        scan(
            "Customers",
            &[("Id", PrimitiveType::Int32), ("Name", PrimitiveType::String)],
        )
    }

    #[test]
    fn test_scan_type_is_collection_of_row() {
        let ty = customers().result_type();
        assert!(ty.is_collection());
        assert_eq!(ty.element_type().fields().len(), 2);
    }

    #[test]
    fn test_project_record_type_uses_bound_variable() {
        let q = project(
            "c",
            customers(),
            vec![("CustomerName", col("c", "Name"))],
        );
        let ty = q.result_type();
        assert_eq!(
            ty.element_type().field("CustomerName"),
            Some(&TypeUsage::Primitive(PrimitiveType::String))
        );
    }

    #[test]
    fn test_scalar_projection_becomes_single_column_row() {
        let q = Expr::Project {
            input: Binding::new("c", customers()),
            projection: Box::new(col("c", "Id")),
        };
        let ty = q.result_type();
        assert_eq!(
            ty.element_type().field(SCALAR_COLUMN),
            Some(&TypeUsage::Primitive(PrimitiveType::Int32))
        );
    }

    #[test]
    fn test_join_type_has_one_field_per_input() {
        let q = cross_join(vec![("a", customers()), ("b", customers())]);
        let ty = q.result_type();
        let names: Vec<&str> = ty
            .element_type()
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_group_by_type_lists_keys_then_aggregates() {
        let q = group_by(
            "c",
            "g",
            customers(),
            vec![("Name", col("c", "Name"))],
            vec![("Total", count())],
        );
        let ty = q.result_type();
        assert_eq!(
            ty.element_type().field("Total"),
            Some(&TypeUsage::Primitive(PrimitiveType::Int32))
        );
        assert_eq!(ty.element_type().fields()[0].name, "Name");
    }

    #[test]
    fn test_depth_counts_nested_nodes() {
        // Filter > Binary > Property > Variable
        let q = filter("c", customers(), eq(col("c", "Id"), int(1)));
        assert!(!q.exceeds_depth(4));
        assert!(q.exceeds_depth(3));
        assert!(customers().exceeds_depth(0));
        assert!(!customers().exceeds_depth(1));
    }

    #[test]
    fn test_depth_check_stops_at_the_limit() {
        let mut q = customers();
        for _ in 0..5_000 {
            q = distinct(q);
        }
        assert!(q.exceeds_depth(100));
        assert!(!q.exceeds_depth(5_001));
    }

    #[test]
    fn test_cached_type_matches_uncached() {
        let q = sort(
            "p",
            project(
                "c",
                filter("c", customers(), gt(col("c", "Id"), int(0))),
                vec![("Name", col("c", "Name"))],
            ),
            vec![asc(col("p", "Name"))],
        );
        let mut cache = TypeCache::new();
        assert_eq!(q.result_type_cached(&mut cache), q.result_type());
        // sort, project, filter, scan
        assert_eq!(cache.len(), 4);
        assert_eq!(q.result_type_cached(&mut cache), q.result_type());
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_tree_roundtrips_through_json() {
        let q = filter("c", customers(), eq(col("c", "Id"), int(1)));
        let json = serde_json::to_string(&q).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(q, back);
    }
}
