use indexmap::IndexSet;

use super::alias::AliasId;
use super::errors::SqlGenError;
use super::fragment::{Fragment, SqlBuilder};

/// Operators that may append to their input's statement instead of wrapping
/// it as a derived table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOperator {
    Distinct,
    Filter,
    GroupBy,
    Project,
    Sort,
    Skip,
    Limit,
    Element,
}

#[derive(Debug, Clone)]
pub struct TopClause {
    pub count: Fragment,
    pub with_ties: bool,
}

/// Name a result column is emitted under.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnName {
    Fixed(String),
    Alias(AliasId),
}

#[derive(Debug, Clone)]
pub struct OutputColumn {
    /// Field name requested by the query.
    pub field: String,
    pub name: ColumnName,
}

/// One SELECT being assembled by the translator.
#[derive(Debug, Clone, Default)]
pub struct SelectStatement {
    pub is_distinct: bool,
    top: Option<TopClause>,
    pub select: SqlBuilder,
    pub from: SqlBuilder,
    pub where_clause: SqlBuilder,
    pub group_by: SqlBuilder,
    pub order_by: SqlBuilder,
    /// Extents introduced by this statement's FROM, in order.
    pub from_extents: Vec<AliasId>,
    /// Extents of enclosing statements referenced from inside this one.
    pub outer_extents: IndexSet<AliasId>,
    /// Every leaf extent of a flattened join, when this statement holds one.
    pub all_join_extents: Option<Vec<AliasId>>,
    /// Root statement; keeps its ORDER BY even without TOP.
    pub is_top_most: bool,
    pub output_columns: Vec<OutputColumn>,
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(&self) -> Option<&TopClause> {
        self.top.as_ref()
    }

    pub fn has_top(&self) -> bool {
        self.top.is_some()
    }

    pub fn set_top(&mut self, top: TopClause) -> Result<(), SqlGenError> {
        if self.top.is_some() {
            return Err(SqlGenError::violation("TOP set twice on one statement"));
        }
        self.top = Some(top);
        Ok(())
    }

    /// Whether `operator` can be applied to this statement in place.
    pub fn is_compatible_with(&self, operator: StatementOperator) -> bool {
        match operator {
            StatementOperator::Distinct => !self.has_top() && self.order_by.is_empty(),
            StatementOperator::Filter => {
                self.select.is_empty()
                    && self.where_clause.is_empty()
                    && self.group_by.is_empty()
                    && !self.has_top()
            }
            StatementOperator::GroupBy => {
                self.select.is_empty()
                    && self.group_by.is_empty()
                    && self.order_by.is_empty()
                    && !self.has_top()
            }
            StatementOperator::Project => {
                self.select.is_empty() && self.group_by.is_empty() && !self.is_distinct
            }
            StatementOperator::Sort | StatementOperator::Skip => {
                self.select.is_empty()
                    && self.group_by.is_empty()
                    && self.order_by.is_empty()
                    && !self.is_distinct
            }
            StatementOperator::Limit | StatementOperator::Element => !self.has_top(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn top(n: &str) -> TopClause {
        TopClause {
            count: Fragment::from(n),
            with_ties: false,
        }
    }

    #[test]
    fn test_top_can_only_be_set_once() {
        let mut statement = SelectStatement::new();
        statement.set_top(top("1")).unwrap();
        assert!(matches!(
            statement.set_top(top("2")),
            Err(SqlGenError::StructuralViolation(_))
        ));
    }

    #[test_case(StatementOperator::Distinct ; "distinct")]
    #[test_case(StatementOperator::Filter ; "filter")]
    #[test_case(StatementOperator::GroupBy ; "group by")]
    #[test_case(StatementOperator::Project ; "project")]
    #[test_case(StatementOperator::Sort ; "sort")]
    #[test_case(StatementOperator::Skip ; "skip")]
    #[test_case(StatementOperator::Limit ; "limit")]
    #[test_case(StatementOperator::Element ; "element")]
    fn test_fresh_statement_accepts_every_operator(op: StatementOperator) {
        assert!(SelectStatement::new().is_compatible_with(op));
    }

    #[test_case(StatementOperator::Distinct, false ; "distinct")]
    #[test_case(StatementOperator::Filter, false ; "filter")]
    #[test_case(StatementOperator::GroupBy, false ; "group by")]
    #[test_case(StatementOperator::Project, true ; "project")]
    #[test_case(StatementOperator::Sort, true ; "sort")]
    #[test_case(StatementOperator::Limit, false ; "limit")]
    fn test_statement_with_top(op: StatementOperator, expected: bool) {
        let mut statement = SelectStatement::new();
        statement.set_top(top("5")).unwrap();
        assert_eq!(statement.is_compatible_with(op), expected);
    }

    #[test_case(StatementOperator::Filter, false ; "filter")]
    #[test_case(StatementOperator::Project, true ; "project")]
    #[test_case(StatementOperator::Sort, true ; "sort")]
    #[test_case(StatementOperator::GroupBy, true ; "group by")]
    #[test_case(StatementOperator::Distinct, true ; "distinct")]
    fn test_statement_with_where(op: StatementOperator, expected: bool) {
        let mut statement = SelectStatement::new();
        statement.where_clause.append("x = 1");
        assert_eq!(statement.is_compatible_with(op), expected);
    }

    #[test_case(StatementOperator::Project, false ; "project")]
    #[test_case(StatementOperator::Sort, false ; "sort")]
    #[test_case(StatementOperator::Skip, false ; "skip")]
    #[test_case(StatementOperator::Filter, true ; "filter")]
    #[test_case(StatementOperator::Limit, true ; "limit")]
    fn test_distinct_statement(op: StatementOperator, expected: bool) {
        let statement = SelectStatement {
            is_distinct: true,
            ..SelectStatement::new()
        };
        assert_eq!(statement.is_compatible_with(op), expected);
    }

    #[test_case(StatementOperator::Distinct, false ; "distinct")]
    #[test_case(StatementOperator::GroupBy, false ; "group by")]
    #[test_case(StatementOperator::Sort, false ; "sort")]
    #[test_case(StatementOperator::Filter, true ; "filter")]
    #[test_case(StatementOperator::Project, true ; "project")]
    fn test_statement_with_order_by(op: StatementOperator, expected: bool) {
        let mut statement = SelectStatement::new();
        statement.order_by.append("x");
        assert_eq!(statement.is_compatible_with(op), expected);
    }
}
