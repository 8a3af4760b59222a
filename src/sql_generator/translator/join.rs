//! Join flattening.
//!
//! A join that is not itself the left-most input of another join opens a new
//! statement; its inputs then append to that statement's FROM list. A scan
//! input is written directly, a left-most nested join is visited against the
//! same statement (its extents fold into the list and are regrouped under a
//! join alias afterwards), and everything else becomes a parenthesized
//! derived table.

use crate::query_tree::{ApplyKind, Binding, Expr, JoinKind};
use crate::sql_generator::errors::SqlGenError;
use crate::sql_generator::fragment::{Fragment, SqlBuilder};
use crate::sql_generator::select_statement::SelectStatement;

use super::{wrap_non_query_extent, Translated, Translator};

pub(super) fn join_keyword(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::Inner => "INNER JOIN",
        JoinKind::LeftOuter => "LEFT OUTER JOIN",
        JoinKind::FullOuter => "FULL OUTER JOIN",
    }
}

pub(super) fn apply_keyword(kind: ApplyKind) -> &'static str {
    match kind {
        ApplyKind::Cross => "CROSS APPLY",
        ApplyKind::Outer => "OUTER APPLY",
    }
}

impl<'d> Translator<'d> {
    pub(super) fn visit_join(
        &mut self,
        inputs: &[&Binding],
        keyword: &str,
        condition: Option<&Expr>,
    ) -> Result<Translated, SqlGenError> {
        let flatten_into_parent = self.is_parent_a_join();
        if !flatten_into_parent {
            let mut statement = SelectStatement::new();
            statement.all_join_extents = Some(Vec::new());
            self.statements.push(statement);
        }
        log::debug!(
            "Translator: {} over {} input(s){}",
            keyword,
            inputs.len(),
            if flatten_into_parent {
                ", flattened into enclosing join"
            } else {
                ""
            }
        );

        self.scopes.enter_scope();
        for (index, input) in inputs.iter().enumerate() {
            if index > 0 {
                let statement = self.current_statement_mut()?;
                statement.from.append_line();
                statement.from.append(keyword);
                statement.from.append(" ");
            }

            let needs_join_context = matches!(*input.expr, Expr::Scan { .. })
                || (index == 0 && input.expr.is_join());
            let start = self.current_statement_mut()?.from_extents.len();

            self.join_context.push(needs_join_context);
            let result = self.visit(&input.expr);
            self.join_context.pop();

            self.process_join_input(result?, input, start)?;
        }

        if let Some(condition) = condition {
            self.join_context.push(false);
            let on = self.fragment(condition);
            self.join_context.pop();
            let on = on?;
            let statement = self.current_statement_mut()?;
            statement.from.append(" ON ");
            statement.from.append(on);
        }
        self.scopes.exit_scope()?;

        if flatten_into_parent {
            Ok(Translated::Flattened)
        } else {
            Ok(Translated::Statement(self.pop_statement()?))
        }
    }

    /// Attach one visited join input to the current statement and bind its
    /// variable for the ON clause.
    fn process_join_input(
        &mut self,
        result: Translated,
        input: &Binding,
        start: usize,
    ) -> Result<(), SqlGenError> {
        let variable_type = self.element_type(&input.expr);

        if let Translated::Flattened = result {
            let statement = self.current_statement_mut()?;
            let extents = statement.from_extents.split_off(start);
            let join = self.aliases.new_join(&input.variable, variable_type, extents);
            self.current_statement_mut()?.from_extents.push(join);
            return self.scopes.add(&input.variable, join);
        }

        let mut from = None;
        let source = match result {
            Translated::Statement(mut inner) => {
                if inner.select.is_empty() {
                    let columns = self.expand_columns(&mut inner);
                    if input.expr.is_join() {
                        let extents = inner.from_extents.clone();
                        let flattened = inner
                            .all_join_extents
                            .clone()
                            .unwrap_or_else(|| extents.clone());
                        from = Some(self.aliases.new_nested_join(
                            &input.variable,
                            variable_type.clone(),
                            extents,
                            flattened,
                            columns,
                        ));
                    } else if let Some(&first) = inner.from_extents.first() {
                        if let Some(join) = self.aliases.join(first) {
                            let extents = join.extents.clone();
                            let flattened = join.flattened_extents.clone();
                            from = Some(self.aliases.new_nested_join(
                                &input.variable,
                                variable_type.clone(),
                                extents,
                                flattened,
                                columns,
                            ));
                        }
                    }
                }
                let mut builder = SqlBuilder::new();
                builder.append("(");
                builder.append(inner);
                builder.append(" )");
                Fragment::Builder(builder)
            }
            Translated::Sql(builder) if matches!(*input.expr, Expr::Scan { .. }) => {
                Fragment::Builder(builder)
            }
            other => {
                let mut builder = SqlBuilder::new();
                wrap_non_query_extent(&mut builder, other.into_fragment()?, false);
                Fragment::Builder(builder)
            }
        };

        let from = match from {
            Some(from) => from,
            None => self.aliases.new_extent(&input.variable, variable_type),
        };
        let statement = self
            .statements
            .last_mut()
            .ok_or_else(|| SqlGenError::violation("no statement under construction"))?;
        statement.from.append(source);
        Self::attach_from_alias(statement, from, &self.aliases, &mut self.counters);
        if let Some(all) = statement.all_join_extents.as_mut() {
            all.push(from);
        }
        self.scopes.add(&input.variable, from)
    }
}
