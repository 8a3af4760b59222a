//! Second phase: settle names and print.
//!
//! The translator leaves every extent and column alias symbolic. Walking the
//! fragment tree depth first, each statement first renames FROM extents whose
//! names are already visible from enclosing statements, then prints its
//! clauses. Column aliases flagged during expansion are renamed the first
//! time they are written.

use std::collections::{HashMap, HashSet};

use crate::config::SqlVersion;

use super::alias::{AliasArena, AliasId};
use super::dialect::SqlDialect;
use super::errors::SqlGenError;
use super::fragment::{Fragment, SqlBuilder};
use super::select_statement::{SelectStatement, TopClause};

/// Global suffix counters for one compilation.
#[derive(Debug, Default)]
pub struct RenameCounters {
    extent_names: HashMap<String, usize>,
    column_names: HashMap<String, usize>,
}

impl RenameCounters {
    pub fn register_extent(&mut self, name: &str) {
        self.extent_names.entry(name.to_string()).or_insert(0);
    }

    pub fn register_column(&mut self, name: &str) {
        self.column_names.entry(name.to_string()).or_insert(0);
    }

    pub fn next_extent_name(&mut self, base: &str) -> String {
        next_name(&mut self.extent_names, base)
    }

    pub fn next_column_name(&mut self, base: &str) -> String {
        next_name(&mut self.column_names, base)
    }
}

/// Smallest `base<i>` not yet taken, continuing from the last suffix handed
/// out for `base`.
fn next_name(names: &mut HashMap<String, usize>, base: &str) -> String {
    let mut i = names.get(base).copied().unwrap_or(0);
    let candidate = loop {
        i += 1;
        let candidate = format!("{}{}", base, i);
        if !names.contains_key(&candidate) {
            break candidate;
        }
    };
    names.insert(base.to_string(), i);
    names.insert(candidate.clone(), 0);
    candidate
}

pub struct SqlWriter<'a> {
    dialect: &'a dyn SqlDialect,
    aliases: &'a mut AliasArena,
    counters: &'a mut RenameCounters,
    out: String,
    indent: usize,
    statement_depth: usize,
}

impl<'a> SqlWriter<'a> {
    pub fn new(
        dialect: &'a dyn SqlDialect,
        aliases: &'a mut AliasArena,
        counters: &'a mut RenameCounters,
    ) -> Self {
        SqlWriter {
            dialect,
            aliases,
            counters,
            out: String::new(),
            indent: 0,
            statement_depth: 0,
        }
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect
    }

    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn write_line(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    pub fn write_fragment(&mut self, fragment: &Fragment) -> Result<(), SqlGenError> {
        match fragment {
            Fragment::Text(text) => self.write(text),
            Fragment::LineBreak => self.write_line(),
            Fragment::Builder(builder) => self.write_builder(builder)?,
            Fragment::Select(statement) => self.write_statement(statement)?,
            Fragment::Alias(id) => self.write_alias(*id),
        }
        Ok(())
    }

    pub fn write_builder(&mut self, builder: &SqlBuilder) -> Result<(), SqlGenError> {
        for part in builder.parts() {
            self.write_fragment(part)?;
        }
        Ok(())
    }

    fn write_alias(&mut self, id: AliasId) {
        if self.aliases.get(id).needs_renaming() {
            let name = self.aliases.get(id).name().to_string();
            let new_name = self.counters.next_column_name(&name);
            log::debug!("renaming column alias '{}' to '{}'", name, new_name);
            self.aliases.rename(id, new_name);
        }
        let quoted = self.dialect.quote_identifier(self.aliases.get(id).new_name());
        self.write(&quoted);
    }

    pub fn write_statement(&mut self, statement: &SelectStatement) -> Result<(), SqlGenError> {
        self.resolve_extent_names(statement);

        let nested = self.statement_depth > 0;
        self.statement_depth += 1;
        if nested {
            self.indent += 1;
        }
        let dialect = self.dialect;
        let result = dialect.write_clauses(statement, self);
        if nested {
            self.indent -= 1;
        }
        self.statement_depth -= 1;
        result
    }

    /// Rename FROM extents that collide with names visible from enclosing
    /// statements.
    fn resolve_extent_names(&mut self, statement: &SelectStatement) {
        let mut used = HashSet::new();
        for &outer in &statement.outer_extents {
            self.collect_visible_names(outer, &mut used);
        }

        let extents = statement
            .all_join_extents
            .as_ref()
            .unwrap_or(&statement.from_extents);
        for &extent in extents {
            let alias = self.aliases.get(extent);
            if used.contains(alias.name()) && !alias.is_renamed() {
                let name = alias.name().to_string();
                let new_name = self.counters.next_extent_name(&name);
                log::debug!("renaming extent '{}' to '{}'", name, new_name);
                self.aliases.rename(extent, new_name);
            }
            used.insert(self.aliases.get(extent).new_name().to_string());
        }
    }

    fn collect_visible_names(&self, id: AliasId, used: &mut HashSet<String>) {
        match self.aliases.join(id) {
            Some(join) => {
                if join.is_nested_join {
                    used.insert(self.aliases.get(id).new_name().to_string());
                }
                let members = if join.flattened_extents.is_empty() {
                    &join.extents
                } else {
                    &join.flattened_extents
                };
                for &member in members {
                    self.collect_visible_names(member, used);
                }
            }
            None => {
                used.insert(self.aliases.get(id).new_name().to_string());
            }
        }
    }

    /// SELECT [DISTINCT] [TOP] / FROM / WHERE / GROUP BY / ORDER BY.
    pub fn write_standard_clauses(&mut self, statement: &SelectStatement) -> Result<(), SqlGenError> {
        self.write("SELECT ");
        if statement.is_distinct {
            self.write("DISTINCT ");
        }
        if let Some(top) = statement.top() {
            self.write_top(top)?;
        }
        if statement.select.is_empty() {
            log::warn!("statement has no projection, selecting *");
            self.write("*");
        } else {
            self.write_builder(&statement.select)?;
        }

        self.write_line();
        self.write("FROM ");
        self.write_builder(&statement.from)?;

        if !statement.where_clause.is_empty() {
            self.write_line();
            self.write("WHERE ");
            self.write_builder(&statement.where_clause)?;
        }

        if !statement.group_by.is_empty() {
            self.write_line();
            self.write("GROUP BY ");
            self.write_builder(&statement.group_by)?;
        }

        if !statement.order_by.is_empty() && (statement.is_top_most || statement.has_top()) {
            self.write_line();
            self.write("ORDER BY ");
            self.write_builder(&statement.order_by)?;
        }
        Ok(())
    }

    fn write_top(&mut self, top: &TopClause) -> Result<(), SqlGenError> {
        // SQL Server 2000 only accepts an unparenthesized literal
        let parenthesize = self.dialect.version() >= SqlVersion::Sql2005;
        self.write("TOP ");
        if parenthesize {
            self.write("(");
        }
        self.write_fragment(&top.count)?;
        if parenthesize {
            self.write(")");
        }
        self.write(" ");
        if top.with_ties {
            self.write("WITH TIES ");
        }
        Ok(())
    }

    pub fn finish(self) -> String {
        self.out
    }
}
