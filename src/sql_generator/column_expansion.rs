//! Default column expansion.
//!
//! A statement that becomes a derived table, or the root of a query, must
//! name its columns explicitly. When no operator wrote a SELECT list, one is
//! derived from the FROM extents: plain extents contribute one column per
//! field of their row type, flattened joins contribute their members, and
//! nested joins contribute the columns they captured when wrapped.

use std::collections::HashMap;

use super::alias::{AliasArena, AliasId};
use super::dialect::SqlDialect;
use super::fragment::SqlBuilder;
use super::renderer::RenameCounters;
use super::select_statement::{ColumnName, OutputColumn, SelectStatement};

struct ColumnExpansion<'a, D: SqlDialect + ?Sized> {
    dialect: &'a D,
    aliases: &'a mut AliasArena,
    counters: &'a mut RenameCounters,
    /// Column aliases by lower-cased name; identifiers compare case-insensitively.
    seen: HashMap<String, AliasId>,
    separator: &'static str,
    select: SqlBuilder,
    columns: Vec<AliasId>,
    output: Vec<OutputColumn>,
}

impl<D: SqlDialect + ?Sized> ColumnExpansion<'_, D> {
    fn add_extent(&mut self, extent: AliasId) {
        match self.aliases.join(extent).cloned() {
            Some(join) if join.is_nested_join => {
                for column in join.column_list {
                    self.select.append(self.separator);
                    self.select.append(extent);
                    self.select.append(".");
                    self.select.append(column);
                    self.separator = ", ";
                    let field = self.aliases.get(column).name().to_string();
                    self.record(field, column);
                }
            }
            Some(join) => {
                for member in join.extents {
                    let scalar = self
                        .aliases
                        .get(member)
                        .ty()
                        .is_some_and(|t| t.is_primitive());
                    if !scalar {
                        self.add_extent(member);
                    }
                }
            }
            None => {
                let fields: Vec<String> = self
                    .aliases
                    .get(extent)
                    .ty()
                    .map(|t| {
                        t.element_type()
                            .fields()
                            .iter()
                            .map(|f| f.name.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                for field in fields {
                    let column = self.aliases.column_of(extent, &field);
                    self.select.append(self.separator);
                    self.select.append(extent);
                    self.select.append(".");
                    self.select.append(self.dialect.quote_identifier(&field));
                    self.select.append(" AS ");
                    self.select.append(column);
                    self.separator = ", ";
                    self.counters.register_column(&field);
                    self.record(field, column);
                }
            }
        }
    }

    /// Track a written column, flagging both sides of a name collision.
    fn record(&mut self, field: String, column: AliasId) {
        let key = self.aliases.get(column).name().to_ascii_lowercase();
        match self.seen.get(&key).copied() {
            Some(previous) if previous != column => {
                log::debug!("column name '{}' collides, both marked for renaming", field);
                self.aliases.mark_needs_renaming(previous);
                self.aliases.mark_needs_renaming(column);
            }
            _ => {
                self.seen.insert(key, column);
            }
        }
        self.columns.push(column);
        self.output.push(OutputColumn {
            field,
            name: ColumnName::Alias(column),
        });
    }
}

/// Expand the SELECT list of `statement` from its FROM extents.
pub fn expand_default_columns<D: SqlDialect + ?Sized>(
    dialect: &D,
    statement: &mut SelectStatement,
    aliases: &mut AliasArena,
    counters: &mut RenameCounters,
) -> Vec<AliasId> {
    let separator = if statement.select.is_empty() { "" } else { ", " };
    let mut expansion = ColumnExpansion {
        dialect,
        aliases,
        counters,
        seen: HashMap::new(),
        separator,
        select: SqlBuilder::new(),
        columns: Vec::new(),
        output: Vec::new(),
    };
    for &extent in &statement.from_extents {
        expansion.add_extent(extent);
    }

    log::debug!(
        "expanded {} default column(s) over {} extent(s)",
        expansion.columns.len(),
        statement.from_extents.len()
    );
    statement.select.append(expansion.select);
    statement.output_columns.extend(expansion.output);
    expansion.columns
}
