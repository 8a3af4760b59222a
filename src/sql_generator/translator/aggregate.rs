use crate::query_tree::{Aggregate, Expr, GroupBinding, NamedAggregate, NamedExpr};
use crate::sql_generator::errors::SqlGenError;
use crate::sql_generator::fragment::{Fragment, SqlBuilder};
use crate::sql_generator::function_registry::get_aggregate_name;
use crate::sql_generator::select_statement::{
    ColumnName, OutputColumn, SelectStatement, StatementOperator,
};

use super::{Translated, Translator};

/// True when `expr` is a property chain rooted at one of `variables`.
fn is_column_reference(expr: &Expr, variables: &[&str]) -> bool {
    match expr {
        Expr::Property { instance, .. } => match instance.as_ref() {
            Expr::Variable { name } => variables.contains(&name.as_str()),
            nested => is_column_reference(nested, variables),
        },
        _ => false,
    }
}

/// True when `expr` mentions any of `variables`.
fn references_any(expr: &Expr, variables: &[&str]) -> bool {
    match expr {
        Expr::Variable { name } => variables.contains(&name.as_str()),
        Expr::Property { instance, .. } => references_any(instance, variables),
        Expr::Binary { left, right, .. } => {
            references_any(left, variables) || references_any(right, variables)
        }
        Expr::Not { argument }
        | Expr::Negate { argument }
        | Expr::IsNull { argument }
        | Expr::Cast { argument, .. } => references_any(argument, variables),
        Expr::Like {
            argument,
            pattern,
            escape,
        } => {
            references_any(argument, variables)
                || references_any(pattern, variables)
                || escape.as_deref().is_some_and(|e| references_any(e, variables))
        }
        Expr::In { argument, list } => {
            references_any(argument, variables) || list.iter().any(|e| references_any(e, variables))
        }
        Expr::Case { clauses, else_expr } => {
            clauses.iter().any(|c| {
                references_any(&c.when, variables) || references_any(&c.then, variables)
            }) || references_any(else_expr, variables)
        }
        Expr::Function { args, .. } => args.iter().any(|e| references_any(e, variables)),
        // Subqueries, constants and parameters cannot be grouped on directly
        _ => false,
    }
}

/// Aggregates over anything but plain columns, and keys that reference no
/// input column, have to be evaluated in an inner statement first.
fn group_by_needs_inner_query(
    input: &GroupBinding,
    keys: &[NamedExpr],
    aggregates: &[NamedAggregate],
) -> bool {
    let variables = [input.variable.as_str(), input.group_variable.as_str()];
    let computed_argument = aggregates.iter().any(|a| {
        a.aggregate
            .args
            .iter()
            .any(|arg| !is_column_reference(arg, &variables))
    });
    let constant_key = keys.iter().any(|k| !references_any(&k.expr, &variables));
    computed_argument || constant_key
}

impl<'d> Translator<'d> {
    pub(super) fn visit_group_by(
        &mut self,
        input: &GroupBinding,
        keys: &[NamedExpr],
        aggregates: &[NamedAggregate],
    ) -> Result<Translated, SqlGenError> {
        let variable_type = self.element_type(&input.expr);
        let (mut inner, mut from) =
            self.visit_input_expression(&input.expr, &input.variable, variable_type.clone())?;
        if !self.dialect.is_compatible(&inner, StatementOperator::GroupBy) {
            (inner, from) =
                self.create_new_statement(inner, &input.variable, variable_type.clone(), true)?;
        }

        self.scopes.enter_scope();
        self.add_from_alias(&mut inner, &input.variable, from)?;
        self.scopes.add(&input.group_variable, from)?;
        self.statements.push(inner);

        let needs_inner_query = group_by_needs_inner_query(input, keys, aggregates);
        let mut key_values = Vec::with_capacity(keys.len());
        for key in keys {
            key_values.push(self.fragment(&key.expr)?);
        }
        let mut aggregate_args = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates {
            let arg = match aggregate.aggregate.args.as_slice() {
                [] => None,
                [arg] => Some(self.fragment(arg)?),
                args => {
                    return Err(SqlGenError::unsupported(format!(
                        "aggregate {} with {} arguments",
                        aggregate.aggregate.function,
                        args.len()
                    )))
                }
            };
            aggregate_args.push(arg);
        }

        let mut inner = self.pop_statement()?;
        self.scopes.exit_scope()?;

        let mut select = SqlBuilder::new();
        let mut group_by = SqlBuilder::new();
        let mut columns = Vec::new();
        let mut separator = "";

        if !needs_inner_query {
            for (key, value) in keys.iter().zip(key_values) {
                select.append(separator);
                select.append_line();
                select.append(value.clone());
                select.append(" AS ");
                select.append(self.dialect.quote_identifier(&key.name));
                group_by.append(separator);
                group_by.append(value);
                separator = ", ";
                columns.push(self.group_column(&key.name));
            }
            for (aggregate, arg) in aggregates.iter().zip(aggregate_args) {
                let call = self.aggregate_call(&aggregate.aggregate, arg)?;
                select.append(separator);
                select.append_line();
                select.append(call);
                select.append(" AS ");
                select.append(self.dialect.quote_identifier(&aggregate.name));
                separator = ", ";
                columns.push(self.group_column(&aggregate.name));
            }
            inner.select.append(select);
            inner.group_by.append(group_by);
            inner.output_columns = columns;
            return Ok(Translated::Statement(inner));
        }

        log::debug!(
            "Translator: GroupBy over '{}' evaluates keys and arguments in an inner statement",
            input.variable
        );
        let outer_from = self.aliases.new_extent(&input.variable, variable_type);
        let mut inner_select = SqlBuilder::new();
        let mut inner_separator = "";

        for (key, value) in keys.iter().zip(key_values) {
            let alias = self.dialect.quote_identifier(&key.name);
            inner_select.append(inner_separator);
            inner_select.append_line();
            inner_select.append(value);
            inner_select.append(" AS ");
            inner_select.append(alias.clone());
            inner_separator = ", ";

            select.append(separator);
            select.append_line();
            select.append(outer_from);
            select.append(".");
            select.append(alias.clone());
            select.append(" AS ");
            select.append(alias.clone());
            group_by.append(separator);
            group_by.append(outer_from);
            group_by.append(".");
            group_by.append(alias);
            separator = ", ";
            columns.push(self.group_column(&key.name));
        }

        for (aggregate, arg) in aggregates.iter().zip(aggregate_args) {
            let alias = self.dialect.quote_identifier(&aggregate.name);
            let outer_arg = match arg {
                Some(value) => {
                    inner_select.append(inner_separator);
                    inner_select.append_line();
                    inner_select.append(value);
                    inner_select.append(" AS ");
                    inner_select.append(alias.clone());
                    inner_separator = ", ";

                    let mut reference = SqlBuilder::new();
                    reference.append(outer_from);
                    reference.append(".");
                    reference.append(alias.clone());
                    Some(Fragment::Builder(reference))
                }
                None => None,
            };
            let call = self.aggregate_call(&aggregate.aggregate, outer_arg)?;
            select.append(separator);
            select.append_line();
            select.append(call);
            select.append(" AS ");
            select.append(alias);
            separator = ", ";
            columns.push(self.group_column(&aggregate.name));
        }
        inner.select.append(inner_select);

        let mut outer = SelectStatement::new();
        outer.from.append("( ");
        outer.from.append(inner);
        outer.from.append_line();
        outer.from.append(")");
        Self::attach_from_alias(&mut outer, outer_from, &self.aliases, &mut self.counters);
        outer.select.append(select);
        outer.group_by.append(group_by);
        outer.output_columns = columns;
        Ok(Translated::Statement(outer))
    }

    fn group_column(&mut self, name: &str) -> OutputColumn {
        self.counters.register_column(name);
        OutputColumn {
            field: name.to_string(),
            name: ColumnName::Fixed(name.to_string()),
        }
    }

    /// `FUNC([DISTINCT ]arg)`, `FUNC(1)` for the zero-argument form.
    fn aggregate_call(
        &self,
        aggregate: &Aggregate,
        arg: Option<Fragment>,
    ) -> Result<SqlBuilder, SqlGenError> {
        let name = match get_aggregate_name(&aggregate.function) {
            Some(name) => name.to_string(),
            None => {
                log::debug!(
                    "Translator: no mapping for aggregate '{}', emitting it as is",
                    aggregate.function
                );
                aggregate.function.clone()
            }
        };
        let mut call = SqlBuilder::new();
        call.append(name);
        call.append("(");
        match arg {
            Some(arg) => {
                if aggregate.distinct {
                    call.append("DISTINCT ");
                }
                call.append(arg);
            }
            None if aggregate.distinct => {
                return Err(SqlGenError::unsupported(format!(
                    "DISTINCT {} without an argument",
                    aggregate.function
                )))
            }
            None => call.append("1"),
        }
        call.append(")");
        Ok(call)
    }
}
