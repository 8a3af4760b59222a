use crate::query_tree::{Binding, Expr, NamedExpr, SortKey, SCALAR_COLUMN};
use crate::sql_generator::errors::SqlGenError;
use crate::sql_generator::fragment::{Fragment, SqlBuilder};
use crate::sql_generator::select_statement::{
    ColumnName, OutputColumn, StatementOperator, TopClause,
};

use super::{Translated, Translator};

impl<'d> Translator<'d> {
    pub(super) fn visit_filter(
        &mut self,
        input: &Binding,
        predicate: &Expr,
    ) -> Result<Translated, SqlGenError> {
        let (mut statement, mut from) = self.visit_input(input)?;
        if !self
            .dialect
            .is_compatible(&statement, StatementOperator::Filter)
        {
            let variable_type = self.element_type(&input.expr);
            (statement, from) =
                self.create_new_statement(statement, &input.variable, variable_type, true)?;
        }

        self.scopes.enter_scope();
        self.add_from_alias(&mut statement, &input.variable, from)?;
        self.statements.push(statement);
        let predicate = self.fragment(predicate)?;
        let mut statement = self.pop_statement()?;
        self.scopes.exit_scope()?;

        statement.where_clause.append(predicate);
        Ok(Translated::Statement(statement))
    }

    pub(super) fn visit_project(
        &mut self,
        input: &Binding,
        projection: &Expr,
    ) -> Result<Translated, SqlGenError> {
        let (mut statement, mut from) = self.visit_input(input)?;
        if !self
            .dialect
            .is_compatible(&statement, StatementOperator::Project)
        {
            let variable_type = self.element_type(&input.expr);
            (statement, from) =
                self.create_new_statement(statement, &input.variable, variable_type, true)?;
        }

        self.scopes.enter_scope();
        self.add_from_alias(&mut statement, &input.variable, from)?;
        if Self::is_identity_projection(projection, &input.variable) {
            self.scopes.exit_scope()?;
            return Ok(Translated::Statement(statement));
        }
        self.statements.push(statement);
        let (select, columns) = match projection {
            Expr::Record { fields } => self.visit_record_projection(fields)?,
            scalar => {
                let value = self.fragment(scalar)?;
                let mut select = SqlBuilder::new();
                select.append_line();
                select.append(value);
                select.append(" AS ");
                select.append(self.dialect.quote_identifier(SCALAR_COLUMN));
                let column = OutputColumn {
                    field: SCALAR_COLUMN.to_string(),
                    name: ColumnName::Fixed(SCALAR_COLUMN.to_string()),
                };
                (select, vec![column])
            }
        };
        let mut statement = self.pop_statement()?;
        self.scopes.exit_scope()?;

        statement.select.append(select);
        statement.output_columns = columns;
        Ok(Translated::Statement(statement))
    }

    /// `expr AS [name]` per record field.
    fn visit_record_projection(
        &mut self,
        fields: &[NamedExpr],
    ) -> Result<(SqlBuilder, Vec<OutputColumn>), SqlGenError> {
        let mut select = SqlBuilder::new();
        let mut columns = Vec::with_capacity(fields.len());
        let mut separator = "";
        for field in fields {
            if matches!(field.expr, Expr::Record { .. }) {
                return Err(SqlGenError::unsupported(format!(
                    "nested record construction in field '{}'",
                    field.name
                )));
            }
            let value = self.fragment(&field.expr)?;
            select.append(separator);
            select.append_line();
            select.append(value);
            select.append(" AS ");
            select.append(self.dialect.quote_identifier(&field.name));
            separator = ",";
            self.counters.register_column(&field.name);
            columns.push(OutputColumn {
                field: field.name.clone(),
                name: ColumnName::Fixed(field.name.clone()),
            });
        }
        Ok((select, columns))
    }

    pub(super) fn visit_sort(
        &mut self,
        input: &Binding,
        keys: &[SortKey],
    ) -> Result<Translated, SqlGenError> {
        let (mut statement, mut from) = self.visit_input(input)?;
        if !self.dialect.is_compatible(&statement, StatementOperator::Sort) {
            let variable_type = self.element_type(&input.expr);
            (statement, from) =
                self.create_new_statement(statement, &input.variable, variable_type, true)?;
        }

        self.scopes.enter_scope();
        self.add_from_alias(&mut statement, &input.variable, from)?;
        self.statements.push(statement);
        let order_by = self.visit_sort_keys(keys)?;
        let mut statement = self.pop_statement()?;
        self.scopes.exit_scope()?;

        statement.order_by.append(order_by);
        Ok(Translated::Statement(statement))
    }

    /// `key [COLLATE c] ASC|DESC, ...`
    pub(super) fn visit_sort_keys(&mut self, keys: &[SortKey]) -> Result<SqlBuilder, SqlGenError> {
        let mut order_by = SqlBuilder::new();
        let mut separator = "";
        for key in keys {
            let value = self.fragment(&key.expr)?;
            order_by.append(separator);
            order_by.append(value);
            if let Some(collation) = &key.collation {
                order_by.append(" COLLATE ");
                order_by.append(collation.as_str());
            }
            order_by.append(if key.ascending { " ASC" } else { " DESC" });
            separator = ", ";
        }
        Ok(order_by)
    }

    pub(super) fn visit_distinct(&mut self, argument: &Expr) -> Result<Translated, SqlGenError> {
        let mut statement = self.visit_ensure_statement(argument, true)?;
        if !self
            .dialect
            .is_compatible(&statement, StatementOperator::Distinct)
        {
            let element = self.element_type(argument);
            let (mut wrapped, from) = self.create_new_statement(statement, "distinct", element, true)?;
            Self::attach_from_alias(&mut wrapped, from, &self.aliases, &mut self.counters);
            // DISTINCT applies to the select list, so it must be written here
            self.expand_columns(&mut wrapped);
            statement = wrapped;
        }
        statement.is_distinct = true;
        Ok(Translated::Statement(statement))
    }

    /// Scalar subquery returning the first row: `(SELECT TOP (1) ...)`.
    pub(super) fn visit_element(&mut self, argument: &Expr) -> Result<Translated, SqlGenError> {
        let mut statement = self.visit_ensure_statement(argument, true)?;
        if !self
            .dialect
            .is_compatible(&statement, StatementOperator::Element)
        {
            let element = self.element_type(argument);
            let (mut wrapped, from) = self.create_new_statement(statement, "element", element, true)?;
            Self::attach_from_alias(&mut wrapped, from, &self.aliases, &mut self.counters);
            statement = wrapped;
        }
        statement.set_top(TopClause {
            count: Fragment::from("1"),
            with_ties: false,
        })?;
        if statement.select.is_empty() {
            self.expand_columns(&mut statement);
        }

        let mut builder = SqlBuilder::new();
        builder.append("(");
        builder.append(statement);
        builder.append(")");
        Ok(Translated::Sql(builder))
    }
}
