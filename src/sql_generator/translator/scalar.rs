//! Scalar expression translation: references, literals, operators, function
//! calls and subquery predicates.

use crate::query_tree::{BinaryOp, Expr, Literal};
use crate::sql_generator::errors::SqlGenError;
use crate::sql_generator::fragment::{Fragment, SqlBuilder};
use crate::sql_generator::function_registry::{get_function_mapping, FunctionKind, LikeMatch};

use super::{Translated, Translator};

/// Escape character used when a LIKE pattern is built from a literal.
const LIKE_ESCAPE: char = '~';

fn operator_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => " + ",
        BinaryOp::Subtract => " - ",
        BinaryOp::Multiply => " * ",
        BinaryOp::Divide => " / ",
        BinaryOp::Modulo => " % ",
        BinaryOp::Equal => " = ",
        BinaryOp::NotEqual => " <> ",
        BinaryOp::LessThan => " < ",
        BinaryOp::LessThanOrEqual => " <= ",
        BinaryOp::GreaterThan => " > ",
        BinaryOp::GreaterThanOrEqual => " >= ",
        BinaryOp::And => " AND ",
        BinaryOp::Or => " OR ",
    }
}

/// Operands that print as a single token need no parentheses.
fn is_atomic(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Constant(_) | Expr::Parameter { .. } | Expr::Property { .. } | Expr::Null { .. }
    )
}

/// Collect the operands of a chain of the same associative operator.
fn flatten_chain<'e>(op: BinaryOp, expr: &'e Expr, operands: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Binary {
            op: inner,
            left,
            right,
        } if *inner == op => {
            flatten_chain(op, left, operands);
            flatten_chain(op, right, operands);
        }
        other => operands.push(other),
    }
}

/// Escape LIKE wildcards in a literal; returns whether anything was escaped.
fn escape_like_pattern(text: &str) -> (String, bool) {
    let mut escaped = String::with_capacity(text.len());
    let mut used = false;
    for c in text.chars() {
        if matches!(c, '%' | '_' | '[' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
            used = true;
        }
        escaped.push(c);
    }
    (escaped, used)
}

impl<'d> Translator<'d> {
    pub(super) fn visit_scalar_node(&mut self, expr: &Expr) -> Result<Translated, SqlGenError> {
        match expr {
            Expr::Variable { name } => self.visit_variable(name),
            Expr::Property { instance, name } => self.visit_property(instance, name),
            Expr::Constant(literal) => {
                Ok(Translated::Sql(self.text(self.dialect.escape_literal(literal)?)))
            }
            Expr::Parameter { name, .. } => Ok(Translated::Sql(self.text(format!("@{}", name)))),
            Expr::Null { ty: Some(ty) } => {
                let type_name = self.dialect.type_name(*ty)?;
                Ok(Translated::Sql(self.text(format!("CAST(NULL AS {})", type_name))))
            }
            Expr::Null { ty: None } => Ok(Translated::Sql(self.text("NULL".to_string()))),
            Expr::Binary { op, left, right } => self.visit_binary(*op, left, right),
            Expr::Not { argument } => self.visit_not(argument),
            Expr::Negate { argument } => {
                let value = self.fragment(argument)?;
                let mut sql = SqlBuilder::new();
                sql.append("-(");
                sql.append(value);
                sql.append(")");
                Ok(Translated::Sql(sql))
            }
            Expr::IsNull { argument } => self.visit_is_null(argument, false),
            Expr::Like {
                argument,
                pattern,
                escape,
            } => {
                let mut sql = SqlBuilder::new();
                sql.append(self.fragment(argument)?);
                sql.append(" LIKE ");
                sql.append(self.fragment(pattern)?);
                if let Some(escape) = escape {
                    sql.append(" ESCAPE ");
                    sql.append(self.fragment(escape)?);
                }
                Ok(Translated::Sql(sql))
            }
            Expr::In { argument, list } => self.visit_in(argument, list),
            // CASE needs at least one WHEN; without one only the else value remains
            Expr::Case { clauses, else_expr } if clauses.is_empty() => self.visit(else_expr),
            Expr::Case { clauses, else_expr } => {
                let mut sql = SqlBuilder::new();
                sql.append("CASE");
                for clause in clauses {
                    sql.append(" WHEN ");
                    sql.append(self.fragment(&clause.when)?);
                    sql.append(" THEN ");
                    sql.append(self.fragment(&clause.then)?);
                }
                sql.append(" ELSE ");
                sql.append(self.fragment(else_expr)?);
                sql.append(" END");
                Ok(Translated::Sql(sql))
            }
            Expr::Cast { argument, target } => {
                let value = self.fragment(argument)?;
                let type_name = self.dialect.type_name(*target)?;
                let mut sql = SqlBuilder::new();
                sql.append("CAST(");
                sql.append(value);
                sql.append(format!(" AS {})", type_name));
                Ok(Translated::Sql(sql))
            }
            Expr::Function { name, args, .. } => self.visit_function(name, args),
            Expr::Exists { argument } => self.visit_exists(argument, false),
            Expr::IsEmpty { argument } => self.visit_exists(argument, true),
            Expr::Record { fields } => Err(SqlGenError::unsupported(format!(
                "record constructor with {} field(s) outside a projection",
                fields.len()
            ))),
            relational => Err(SqlGenError::violation(format!(
                "{} dispatched as a scalar expression",
                relational.kind_name()
            ))),
        }
    }

    fn text(&self, text: String) -> SqlBuilder {
        let mut sql = SqlBuilder::new();
        sql.append(text);
        sql
    }

    fn visit_variable(&mut self, name: &str) -> Result<Translated, SqlGenError> {
        if self.bare_variable_pending {
            return Err(SqlGenError::violation(format!(
                "variable referenced outside a property or argument position before '{}'",
                name
            )));
        }
        let alias = self
            .scopes
            .lookup(name)
            .ok_or_else(|| SqlGenError::violation(format!("unbound variable '{}'", name)))?;
        self.bare_variable_pending = true;

        if let Some(statement) = self.statements.last_mut() {
            if !statement.from_extents.contains(&alias) {
                statement.outer_extents.insert(alias);
            }
        }
        Ok(Translated::Alias(alias))
    }

    /// Record navigation. Member access on a join descends to the member
    /// extent; through a nested join the derived-table alias is kept as the
    /// qualifier and the captured column alias is written.
    fn visit_property(&mut self, instance: &Expr, name: &str) -> Result<Translated, SqlGenError> {
        let target = self.visit(instance)?;
        if matches!(instance, Expr::Variable { .. }) {
            self.bare_variable_pending = false;
        }

        match target {
            Translated::Alias(alias) if self.aliases.is_nested_join(alias) => {
                let member = self.aliases.join_member(alias, name)?;
                Ok(Translated::AliasPair {
                    source: alias,
                    column: member,
                })
            }
            Translated::Alias(alias) if self.aliases.is_join(alias) => {
                Ok(Translated::Alias(self.aliases.join_member(alias, name)?))
            }
            Translated::AliasPair { source, column } => {
                if self.aliases.is_join(column) {
                    let member = self.aliases.join_member(column, name)?;
                    return Ok(Translated::AliasPair {
                        source,
                        column: member,
                    });
                }
                let captured = self.aliases.get(column).column(name).ok_or_else(|| {
                    SqlGenError::violation(format!(
                        "'{}' was not projected by derived table '{}'",
                        name,
                        self.aliases.get(source).name()
                    ))
                })?;
                let mut sql = SqlBuilder::new();
                sql.append(source);
                sql.append(".");
                sql.append(captured);
                Ok(Translated::Sql(sql))
            }
            other => {
                let mut sql = SqlBuilder::new();
                sql.append(other.into_fragment()?);
                sql.append(".");
                sql.append(self.dialect.quote_identifier(name));
                Ok(Translated::Sql(sql))
            }
        }
    }

    fn operand(&mut self, expr: &Expr) -> Result<SqlBuilder, SqlGenError> {
        let value = self.fragment(expr)?;
        let mut sql = SqlBuilder::new();
        if is_atomic(expr) {
            sql.append(value);
        } else {
            sql.append("(");
            sql.append(value);
            sql.append(")");
        }
        Ok(sql)
    }

    fn visit_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Translated, SqlGenError> {
        let mut operands = Vec::new();
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            flatten_chain(op, left, &mut operands);
            flatten_chain(op, right, &mut operands);
        } else {
            operands.push(left);
            operands.push(right);
        }

        let mut sql = SqlBuilder::new();
        for (index, operand) in operands.into_iter().enumerate() {
            if index > 0 {
                sql.append(operator_text(op));
            }
            sql.append(self.operand(operand)?);
        }
        Ok(Translated::Sql(sql))
    }

    fn visit_not(&mut self, argument: &Expr) -> Result<Translated, SqlGenError> {
        match argument {
            Expr::Not { argument: inner } => self.visit(inner),
            Expr::IsNull { argument: inner } => self.visit_is_null(inner, true),
            Expr::IsEmpty { argument: inner } => self.visit_exists(inner, false),
            Expr::Exists { argument: inner } => self.visit_exists(inner, true),
            other => {
                let value = self.fragment(other)?;
                let mut sql = SqlBuilder::new();
                sql.append("NOT (");
                sql.append(value);
                sql.append(")");
                Ok(Translated::Sql(sql))
            }
        }
    }

    fn visit_is_null(&mut self, argument: &Expr, negated: bool) -> Result<Translated, SqlGenError> {
        let mut sql = self.operand(argument)?;
        sql.append(if negated { " IS NOT NULL" } else { " IS NULL" });
        Ok(Translated::Sql(sql))
    }

    fn visit_in(&mut self, argument: &Expr, list: &[Expr]) -> Result<Translated, SqlGenError> {
        if list.is_empty() {
            return Ok(Translated::Sql(self.text("1 = 0".to_string())));
        }
        let mut sql = self.operand(argument)?;
        sql.append(" IN (");
        for (index, item) in list.iter().enumerate() {
            if index > 0 {
                sql.append(", ");
            }
            sql.append(self.fragment(item)?);
        }
        sql.append(")");
        Ok(Translated::Sql(sql))
    }

    /// `EXISTS (subquery)` or `NOT EXISTS (subquery)`.
    fn visit_exists(&mut self, argument: &Expr, negated: bool) -> Result<Translated, SqlGenError> {
        let statement = self.visit_ensure_statement(argument, true)?;
        let mut sql = SqlBuilder::new();
        sql.append(if negated { "NOT EXISTS (" } else { "EXISTS (" });
        sql.append(statement);
        sql.append_line();
        sql.append(")");
        Ok(Translated::Sql(sql))
    }

    fn visit_function(&mut self, name: &str, args: &[Expr]) -> Result<Translated, SqlGenError> {
        let Some(mapping) = get_function_mapping(name) else {
            log::debug!(
                "Translator: no mapping for function '{}', emitting it as is",
                name
            );
            let args = self.function_arguments(args)?;
            return Ok(Translated::Sql(Self::call(name, args)));
        };
        self.dialect.require_version(name, mapping.min_version)?;
        if let Some(arity) = mapping.arity {
            if args.len() != arity {
                return Err(SqlGenError::unsupported(format!(
                    "{} with {} argument(s), expected {}",
                    name,
                    args.len(),
                    arity
                )));
            }
        }

        match mapping.kind {
            FunctionKind::Like(kind) => self.visit_like_function(name, kind, args),
            FunctionKind::Niladic => {
                if !args.is_empty() {
                    return Err(SqlGenError::unsupported(format!(
                        "{} with {} argument(s)",
                        name,
                        args.len()
                    )));
                }
                let sql_name = mapping.sql_name_for(self.dialect.version());
                Ok(Translated::Sql(self.text(format!("{}()", sql_name))))
            }
            FunctionKind::Infix => {
                let args = self.function_arguments(args)?;
                let mut sql = SqlBuilder::new();
                sql.append("(");
                for (index, arg) in args.into_iter().enumerate() {
                    if index > 0 {
                        sql.append(format!(" {} ", mapping.sql_name));
                    }
                    sql.append(arg);
                }
                sql.append(")");
                Ok(Translated::Sql(sql))
            }
            FunctionKind::Call => {
                let mut args = self.function_arguments(args)?;
                if let Some(transform) = mapping.arg_transform {
                    args = transform(args);
                }
                let sql_name = mapping.sql_name_for(self.dialect.version());
                Ok(Translated::Sql(Self::call(sql_name, args)))
            }
        }
    }

    fn function_arguments(&mut self, args: &[Expr]) -> Result<Vec<Fragment>, SqlGenError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.fragment(arg)?);
            if matches!(arg, Expr::Variable { .. }) {
                self.bare_variable_pending = false;
            }
        }
        Ok(out)
    }

    fn call(name: &str, args: Vec<Fragment>) -> SqlBuilder {
        let mut sql = SqlBuilder::new();
        sql.append(name);
        sql.append("(");
        for (index, arg) in args.into_iter().enumerate() {
            if index > 0 {
                sql.append(", ");
            }
            sql.append(arg);
        }
        sql.append(")");
        sql
    }

    /// Contains/StartsWith/EndsWith: LIKE over a literal pattern, CHARINDEX
    /// otherwise.
    fn visit_like_function(
        &mut self,
        name: &str,
        kind: LikeMatch,
        args: &[Expr],
    ) -> Result<Translated, SqlGenError> {
        let [target, pattern] = args else {
            return Err(SqlGenError::unsupported(format!(
                "{} with {} argument(s)",
                name,
                args.len()
            )));
        };
        let target = self.fragment(target)?;

        if let Expr::Constant(Literal::String(text)) = pattern {
            let (escaped, used_escape) = escape_like_pattern(text);
            let pattern = match kind {
                LikeMatch::Contains => format!("%{}%", escaped),
                LikeMatch::StartsWith => format!("{}%", escaped),
                LikeMatch::EndsWith => format!("%{}", escaped),
            };
            let mut sql = SqlBuilder::new();
            sql.append(target);
            sql.append(" LIKE ");
            sql.append(self.dialect.escape_literal(&Literal::String(pattern))?);
            if used_escape {
                sql.append(" ESCAPE ");
                sql.append(
                    self.dialect
                        .escape_literal(&Literal::String(LIKE_ESCAPE.to_string()))?,
                );
            }
            return Ok(Translated::Sql(sql));
        }

        let pattern = self.fragment(pattern)?;
        let mut sql = SqlBuilder::new();
        sql.append("CHARINDEX(");
        match kind {
            LikeMatch::Contains | LikeMatch::StartsWith => {
                sql.append(pattern);
                sql.append(", ");
                sql.append(target);
            }
            LikeMatch::EndsWith => {
                sql.append("REVERSE(");
                sql.append(pattern);
                sql.append("), REVERSE(");
                sql.append(target);
                sql.append(")");
            }
        }
        sql.append(match kind {
            LikeMatch::Contains => ") > 0",
            LikeMatch::StartsWith | LikeMatch::EndsWith => ") = 1",
        });
        Ok(Translated::Sql(sql))
    }

    /// The identity projection `x => x` leaves the SELECT list to expansion.
    pub(super) fn is_identity_projection(projection: &Expr, variable: &str) -> bool {
        matches!(projection, Expr::Variable { name } if name == variable)
    }
}
