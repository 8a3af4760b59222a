//! TOP and ROW_NUMBER based paging.
//!
//! SQL Server before 2012 has no OFFSET, so Skip is emulated: the input is
//! expanded, a ranking column over the sort keys is added, and a wrapping
//! statement keeps only rows ranked past the skip count.

use crate::config::SqlVersion;
use crate::query_tree::{Binding, Expr, Literal, PrimitiveType, SortKey, TypeUsage};
use crate::sql_generator::alias::AliasId;
use crate::sql_generator::errors::SqlGenError;
use crate::sql_generator::fragment::{Fragment, SqlBuilder};
use crate::sql_generator::select_statement::{SelectStatement, StatementOperator, TopClause};

use super::{Translated, Translator};

const ROW_NUMBER_COLUMN: &str = "row_number";

impl<'d> Translator<'d> {
    pub(super) fn visit_limit(
        &mut self,
        argument: &Expr,
        count: &Expr,
        with_ties: bool,
    ) -> Result<Translated, SqlGenError> {
        let mut statement = self.visit_ensure_statement(argument, false)?;
        if !self.dialect.is_compatible(&statement, StatementOperator::Limit) {
            let element = self.element_type(argument);
            let (mut wrapped, from) = self.create_new_statement(statement, "top", element, true)?;
            Self::attach_from_alias(&mut wrapped, from, &self.aliases, &mut self.counters);
            statement = wrapped;
        }

        let count = self.visit_count(count, "TOP")?;
        statement.set_top(TopClause { count, with_ties })?;
        Ok(Translated::Statement(statement))
    }

    pub(super) fn visit_skip(
        &mut self,
        input: &Binding,
        keys: &[SortKey],
        count: &Expr,
    ) -> Result<Translated, SqlGenError> {
        self.dialect
            .require_version("Skip (ROW_NUMBER)", SqlVersion::Sql2005)?;
        if keys.is_empty() {
            return Err(SqlGenError::unsupported("Skip without sort keys"));
        }
        let variable_type = self.element_type(&input.expr);

        let (mut inner, mut from) = self.visit_input(input)?;
        if !self.dialect.is_compatible(&inner, StatementOperator::Skip) {
            (inner, from) =
                self.create_new_statement(inner, &input.variable, variable_type.clone(), true)?;
        }

        self.scopes.enter_scope();
        self.add_from_alias(&mut inner, &input.variable, from)?;
        let columns = self.expand_columns(&mut inner);
        self.statements.push(inner);
        let ranking_keys = self.visit_sort_keys(keys)?;
        let mut inner = self.pop_statement()?;
        self.scopes.exit_scope()?;

        let row_number = self.aliases.new_column(ROW_NUMBER_COLUMN);
        let collides = columns
            .iter()
            .any(|&c| self.aliases.get(c).name().eq_ignore_ascii_case(ROW_NUMBER_COLUMN));
        if collides {
            self.aliases.mark_needs_renaming(row_number);
        }
        inner.select.append(", ROW_NUMBER() OVER (ORDER BY ");
        inner.select.append(ranking_keys);
        inner.select.append(") AS ");
        inner.select.append(row_number);
        log::debug!(
            "Translator: emulating Skip over '{}' with a ranking column",
            input.variable
        );

        let outer_from = self.skip_result_alias(&inner, &input.variable, variable_type, columns);
        let mut outer = SelectStatement::new();
        outer.from.append("( ");
        outer.from.append(inner);
        outer.from.append_line();
        outer.from.append(")");

        self.scopes.enter_scope();
        self.add_from_alias(&mut outer, &input.variable, outer_from)?;
        self.statements.push(outer);
        let skip_count = self.visit_count(count, "Skip")?;
        let order_by = self.visit_sort_keys(keys)?;
        let mut outer = self.pop_statement()?;
        self.scopes.exit_scope()?;

        outer.where_clause.append(outer_from);
        outer.where_clause.append(".");
        outer.where_clause.append(row_number);
        outer.where_clause.append(" > ");
        outer.where_clause.append(skip_count);
        outer.order_by.append(order_by);
        Ok(Translated::Statement(outer))
    }

    /// Alias of the statement wrapping a ranked input; a join input stays
    /// navigable through a nested join over the ranked columns.
    fn skip_result_alias(
        &mut self,
        inner: &SelectStatement,
        variable: &str,
        variable_type: TypeUsage,
        columns: Vec<AliasId>,
    ) -> AliasId {
        if let [only] = inner.from_extents.as_slice() {
            if let Some(join) = self.aliases.join(*only) {
                let extents = join.extents.clone();
                let flattened = join.flattened_extents.clone();
                return self
                    .aliases
                    .new_nested_join(variable, variable_type, extents, flattened, columns);
            }
        }
        self.aliases.new_extent(variable, variable_type)
    }

    /// Row count of TOP or Skip: a constant or a parameter.
    fn visit_count(&self, count: &Expr, clause: &str) -> Result<Fragment, SqlGenError> {
        match count {
            Expr::Constant(Literal::Int32(n)) => Ok(Fragment::from(n.to_string())),
            Expr::Constant(Literal::Int64(n)) => Ok(Fragment::from(n.to_string())),
            Expr::Parameter { name, ty } => {
                if !matches!(ty, PrimitiveType::Int32 | PrimitiveType::Int64) {
                    return Err(SqlGenError::unsupported(format!(
                        "{} count parameter '{}' of type {}",
                        clause, name, ty
                    )));
                }
                if clause == "TOP" {
                    self.dialect
                        .require_version("parameterized TOP", SqlVersion::Sql2005)?;
                }
                let mut builder = SqlBuilder::new();
                builder.append(format!("@{}", name));
                Ok(Fragment::Builder(builder))
            }
            other => Err(SqlGenError::unsupported(format!(
                "{} count given as {}",
                clause,
                other.kind_name()
            ))),
        }
    }
}
