//! Relational tree to fragment translation.
//!
//! The translator walks the input tree once, building [`SelectStatement`]s
//! bottom-up. Each relational operator either appends to the statement its
//! input produced or, when the dialect's compatibility predicate says the
//! clauses would clash, wraps that statement as a derived table and starts a
//! new one. Joins reuse the statement of their left-most join input so that
//! a chain of joins renders as one FROM list.
//!
//! All mutable state of a compilation lives in [`Translator`]: the alias
//! arena, the naming scopes, the stack of statements under construction, the
//! within-join flags and the rename counters handed on to the renderer.

mod aggregate;
mod join;
mod paging;
mod relational;
mod scalar;
mod set_ops;

use crate::config::SqlVersion;
use crate::query_tree::{Binding, Expr, TypeCache, TypeUsage, SCALAR_COLUMN};

use super::alias::{AliasArena, AliasId};
use super::dialect::SqlDialect;
use super::errors::SqlGenError;
use super::fragment::{Fragment, SqlBuilder};
use super::naming_scopes::NamingScopes;
use super::renderer::{RenameCounters, SqlWriter};
use super::select_statement::{ColumnName, OutputColumn, SelectStatement};
use super::{GeneratedSql, ResultColumn};

/// Result of visiting one node.
#[derive(Debug)]
pub(crate) enum Translated {
    Sql(SqlBuilder),
    Statement(SelectStatement),
    /// Reference to an extent or join.
    Alias(AliasId),
    /// Navigation through a nested join: `source` is the derived-table alias
    /// written in SQL, `column` the member or column reached so far.
    AliasPair { source: AliasId, column: AliasId },
    /// A join whose extents were appended to the enclosing join's statement.
    Flattened,
}

impl Translated {
    fn into_fragment(self) -> Result<Fragment, SqlGenError> {
        match self {
            Translated::Sql(builder) => Ok(Fragment::Builder(builder)),
            Translated::Statement(statement) => Ok(Fragment::from(statement)),
            Translated::Alias(id) => Ok(Fragment::Alias(id)),
            Translated::AliasPair { .. } => Err(SqlGenError::violation(
                "record navigation ended on a join member instead of a column",
            )),
            Translated::Flattened => Err(SqlGenError::violation(
                "flattened join used outside an enclosing join",
            )),
        }
    }
}

pub struct Translator<'d> {
    dialect: &'d dyn SqlDialect,
    aliases: AliasArena,
    scopes: NamingScopes,
    statements: Vec<SelectStatement>,
    join_context: Vec<bool>,
    counters: RenameCounters,
    /// Set by a variable reference until a property access or function call
    /// consumes it.
    bare_variable_pending: bool,
    /// Types of the relational nodes of the tree being translated.
    types: TypeCache,
    depth: usize,
    max_depth: usize,
}

impl<'d> Translator<'d> {
    pub fn new(dialect: &'d dyn SqlDialect, max_depth: usize) -> Self {
        Translator {
            dialect,
            aliases: AliasArena::new(),
            scopes: NamingScopes::new(),
            statements: Vec::new(),
            join_context: Vec::new(),
            counters: RenameCounters::default(),
            bare_variable_pending: false,
            types: TypeCache::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Translate and render one query.
    pub fn translate(mut self, query: &Expr) -> Result<GeneratedSql, SqlGenError> {
        log::debug!(
            "Translator: translating {} root ({})",
            query.kind_name(),
            self.dialect.version()
        );

        // Checked before any type derivation, which recurses the whole tree
        if query.exceeds_depth(self.max_depth) {
            return Err(Self::depth_exceeded(self.max_depth));
        }

        let (root, columns) = if query.result_type_cached(&mut self.types).is_collection() {
            let mut statement = self.visit_ensure_statement(query, true)?;
            statement.is_top_most = true;
            let columns = statement.output_columns.clone();
            (Fragment::from(statement), columns)
        } else {
            let value = self.fragment(query)?;
            let mut builder = SqlBuilder::new();
            builder.append("SELECT ");
            builder.append(value);
            builder.append(" AS ");
            builder.append(self.dialect.quote_identifier(SCALAR_COLUMN));
            let column = OutputColumn {
                field: SCALAR_COLUMN.to_string(),
                name: ColumnName::Fixed(SCALAR_COLUMN.to_string()),
            };
            (Fragment::Builder(builder), vec![column])
        };

        if self.bare_variable_pending {
            return Err(SqlGenError::violation(
                "variable referenced outside a property or argument position",
            ));
        }
        if !self.statements.is_empty() || self.scopes.depth() != 0 || !self.join_context.is_empty()
        {
            return Err(SqlGenError::violation(format!(
                "unbalanced translator state: {} statement(s), {} scope(s), {} join flag(s) left open",
                self.statements.len(),
                self.scopes.depth(),
                self.join_context.len()
            )));
        }

        let mut writer = SqlWriter::new(self.dialect, &mut self.aliases, &mut self.counters);
        writer.write_fragment(&root)?;
        let sql = writer.finish();

        let columns = columns
            .into_iter()
            .map(|c| ResultColumn {
                column: match c.name {
                    ColumnName::Fixed(name) => name,
                    ColumnName::Alias(id) => self.aliases.get(id).new_name().to_string(),
                },
                field: c.field,
            })
            .collect();

        log::debug!("Translator: produced {} byte(s) of SQL", sql.len());
        Ok(GeneratedSql { sql, columns })
    }

    pub(crate) fn visit(&mut self, expr: &Expr) -> Result<Translated, SqlGenError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(Self::depth_exceeded(self.max_depth));
        }
        let result = self.dispatch(expr);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, expr: &Expr) -> Result<Translated, SqlGenError> {
        log::trace!("Translator: visiting {}", expr.kind_name());
        match expr {
            Expr::Scan { schema, table, .. } => {
                Ok(Translated::Sql(self.visit_scan(schema.as_deref(), table)))
            }
            Expr::Filter { input, predicate } => self.visit_filter(input, predicate),
            Expr::Project { input, projection } => self.visit_project(input, projection),
            Expr::Join {
                kind,
                left,
                right,
                condition,
            } => self.visit_join(&[left, right], join::join_keyword(*kind), Some(&**condition)),
            Expr::CrossJoin { inputs } => {
                let inputs: Vec<&Binding> = inputs.iter().collect();
                self.visit_join(&inputs, "CROSS JOIN", None)
            }
            Expr::Apply { kind, input, apply } => {
                let keyword = join::apply_keyword(*kind);
                self.dialect.require_version(keyword, SqlVersion::Sql2005)?;
                self.visit_join(&[input, apply], keyword, None)
            }
            Expr::GroupBy {
                input,
                keys,
                aggregates,
            } => self.visit_group_by(input, keys, aggregates),
            Expr::Sort { input, keys } => self.visit_sort(input, keys),
            Expr::Skip { input, keys, count } => self.visit_skip(input, keys, count),
            Expr::Limit {
                argument,
                count,
                with_ties,
            } => self.visit_limit(argument, count, *with_ties),
            Expr::Distinct { argument } => self.visit_distinct(argument),
            Expr::Element { argument } => self.visit_element(argument),
            Expr::SetOp { kind, left, right } => self.visit_set_op(*kind, left, right),
            scalar => self.visit_scalar_node(scalar),
        }
    }

    fn depth_exceeded(max_depth: usize) -> SqlGenError {
        SqlGenError::violation(format!(
            "query tree nests deeper than the configured maximum of {}",
            max_depth
        ))
    }

    /// Row type of a relational node, derived once per node.
    fn element_type(&mut self, expr: &Expr) -> TypeUsage {
        expr.result_type_cached(&mut self.types)
            .element_type()
            .clone()
    }

    /// Visit a node that must produce printable SQL.
    fn fragment(&mut self, expr: &Expr) -> Result<Fragment, SqlGenError> {
        self.visit(expr)?.into_fragment()
    }

    fn visit_scan(&self, schema: Option<&str>, table: &str) -> SqlBuilder {
        let mut builder = SqlBuilder::new();
        if let Some(schema) = schema {
            builder.append(self.dialect.quote_identifier(schema));
            builder.append(".");
        }
        builder.append(self.dialect.quote_identifier(table));
        builder
    }

    fn current_statement_mut(&mut self) -> Result<&mut SelectStatement, SqlGenError> {
        self.statements
            .last_mut()
            .ok_or_else(|| SqlGenError::violation("no statement under construction"))
    }

    fn pop_statement(&mut self) -> Result<SelectStatement, SqlGenError> {
        self.statements
            .pop()
            .ok_or_else(|| SqlGenError::violation("statement stack underflow"))
    }

    fn is_parent_a_join(&self) -> bool {
        self.join_context.last().copied().unwrap_or(false)
    }

    fn expand_columns(&mut self, statement: &mut SelectStatement) -> Vec<AliasId> {
        self.dialect
            .expand_columns(statement, &mut self.aliases, &mut self.counters)
    }

    fn visit_input(&mut self, input: &Binding) -> Result<(SelectStatement, AliasId), SqlGenError> {
        let variable_type = self.element_type(&input.expr);
        self.visit_input_expression(&input.expr, &input.variable, variable_type)
    }

    /// Visit a relational input and make sure it comes back as a statement
    /// with exactly one FROM extent standing for `variable`.
    fn visit_input_expression(
        &mut self,
        expr: &Expr,
        variable: &str,
        variable_type: TypeUsage,
    ) -> Result<(SelectStatement, AliasId), SqlGenError> {
        let mut statement = match self.visit(expr)? {
            Translated::Statement(statement) => statement,
            other => {
                let fragment = other.into_fragment()?;
                let mut statement = SelectStatement::new();
                wrap_non_query_extent(
                    &mut statement.from,
                    fragment,
                    matches!(expr, Expr::Scan { .. }),
                );
                statement
            }
        };

        let from = match statement.from_extents.len() {
            0 => self.aliases.new_extent(variable, variable_type),
            1 => statement.from_extents[0],
            _ => {
                let join = self.aliases.new_join(
                    variable,
                    variable_type,
                    statement.from_extents.clone(),
                );
                let flattened = statement.all_join_extents.clone().unwrap_or_default();
                if let Some(data) = self.aliases.join_mut(join) {
                    data.flattened_extents = flattened;
                }
                statement.from_extents = vec![join];
                join
            }
        };
        Ok((statement, from))
    }

    /// Append ` AS alias` for an extent the statement does not have yet.
    fn attach_from_alias(
        statement: &mut SelectStatement,
        alias: AliasId,
        aliases: &AliasArena,
        counters: &mut RenameCounters,
    ) {
        if statement.from_extents.first() != Some(&alias) {
            statement.from_extents.push(alias);
            statement.from.append(" AS ");
            statement.from.append(alias);
            counters.register_extent(aliases.get(alias).name());
        }
    }

    /// Attach `alias` to the statement and bind `variable` to it in the
    /// innermost scope.
    fn add_from_alias(
        &mut self,
        statement: &mut SelectStatement,
        variable: &str,
        alias: AliasId,
    ) -> Result<(), SqlGenError> {
        Self::attach_from_alias(statement, alias, &self.aliases, &mut self.counters);
        self.scopes.add(variable, alias)
    }

    /// Wrap `old` as a derived table of a fresh statement.
    ///
    /// With `finalize`, an input without a projection gets its default
    /// columns first, and an input whose FROM is a join is re-exposed as a
    /// nested join so record navigation keeps working through the wrap.
    fn create_new_statement(
        &mut self,
        mut old: SelectStatement,
        variable: &str,
        variable_type: TypeUsage,
        finalize: bool,
    ) -> Result<(SelectStatement, AliasId), SqlGenError> {
        let mut from = None;
        if finalize && old.select.is_empty() {
            let columns = self.expand_columns(&mut old);
            if let Some(&first) = old.from_extents.first() {
                if let Some(join) = self.aliases.join(first) {
                    let extents = join.extents.clone();
                    let flattened = join.flattened_extents.clone();
                    from = Some(self.aliases.new_nested_join(
                        variable,
                        variable_type.clone(),
                        extents,
                        flattened,
                        columns,
                    ));
                }
            }
        }
        let from = match from {
            Some(from) => from,
            None => self.aliases.new_extent(variable, variable_type),
        };
        log::debug!("Translator: wrapping input statement as derived table '{}'", variable);

        let mut statement = SelectStatement::new();
        statement.from.append("( ");
        statement.from.append(old);
        statement.from.append_line();
        statement.from.append(")");
        Ok((statement, from))
    }

    /// Translate `expr` into a complete statement, wrapping anything that is
    /// not already one.
    fn visit_ensure_statement(
        &mut self,
        expr: &Expr,
        add_default_columns: bool,
    ) -> Result<SelectStatement, SqlGenError> {
        let mut statement = match expr {
            Expr::Project { .. } | Expr::Filter { .. } | Expr::GroupBy { .. } | Expr::Sort { .. } => {
                match self.visit(expr)? {
                    Translated::Statement(statement) => statement,
                    _ => {
                        return Err(SqlGenError::violation(format!(
                            "{} did not produce a statement",
                            expr.kind_name()
                        )))
                    }
                }
            }
            _ => {
                let variable = "c";
                let variable_type = self.element_type(expr);
                self.scopes.enter_scope();
                let (mut statement, from) =
                    self.visit_input_expression(expr, variable, variable_type)?;
                self.add_from_alias(&mut statement, variable, from)?;
                self.scopes.exit_scope()?;
                statement
            }
        };

        if add_default_columns && statement.select.is_empty() {
            self.expand_columns(&mut statement);
        }
        Ok(statement)
    }
}

/// FROM source for something that did not translate to a statement: a scan
/// is used as is, anything else is parenthesized.
fn wrap_non_query_extent(from: &mut SqlBuilder, fragment: Fragment, is_scan: bool) {
    if is_scan {
        from.append(fragment);
    } else {
        from.append("(");
        from.append(fragment);
        from.append(")");
    }
}
