//! Named extents and column aliases.
//!
//! Every FROM source and every generated column alias is an [`Alias`] living
//! in an [`AliasArena`] for the duration of one compilation. Fragments refer
//! to aliases by [`AliasId`], so a rename performed while rendering is seen
//! by every place the alias was written.

use std::collections::HashMap;

use crate::query_tree::TypeUsage;

use super::errors::SqlGenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AliasId(usize);

/// Membership data of an alias that stands for a join.
#[derive(Debug, Clone, Default)]
pub struct JoinAlias {
    /// Member extents, in FROM order.
    pub extents: Vec<AliasId>,
    pub name_to_extent: HashMap<String, AliasId>,
    /// Every leaf extent of the statement the join came from, used when
    /// collecting names visible to correlated inner statements.
    pub flattened_extents: Vec<AliasId>,
    /// Set once the join owns its own statement and is referenced through a
    /// derived-table alias.
    pub is_nested_join: bool,
    /// Columns captured when the owning statement was expanded.
    pub column_list: Vec<AliasId>,
}

#[derive(Debug, Clone)]
pub struct Alias {
    name: String,
    new_name: String,
    ty: Option<TypeUsage>,
    needs_renaming: bool,
    columns: HashMap<String, AliasId>,
    join: Option<JoinAlias>,
}

impl Alias {
    fn new(name: &str, ty: Option<TypeUsage>) -> Self {
        Alias {
            name: name.to_string(),
            new_name: name.to_string(),
            ty,
            needs_renaming: false,
            columns: HashMap::new(),
            join: None,
        }
    }

    /// Name the alias was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name to print; differs from [`Alias::name`] once renamed.
    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    pub fn is_renamed(&self) -> bool {
        self.name != self.new_name
    }

    pub fn ty(&self) -> Option<&TypeUsage> {
        self.ty.as_ref()
    }

    pub fn needs_renaming(&self) -> bool {
        self.needs_renaming
    }

    pub fn column(&self, name: &str) -> Option<AliasId> {
        self.columns.get(name).copied()
    }

    pub fn join(&self) -> Option<&JoinAlias> {
        self.join.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct AliasArena {
    aliases: Vec<Alias>,
}

impl AliasArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, alias: Alias) -> AliasId {
        self.aliases.push(alias);
        AliasId(self.aliases.len() - 1)
    }

    /// New FROM extent (table scan or derived table).
    pub fn new_extent(&mut self, name: &str, ty: TypeUsage) -> AliasId {
        self.push(Alias::new(name, Some(ty)))
    }

    /// New column alias, not attached to any extent.
    pub fn new_column(&mut self, name: &str) -> AliasId {
        self.push(Alias::new(name, None))
    }

    /// New join alias over `extents`, addressable by each member's name.
    pub fn new_join(&mut self, name: &str, ty: TypeUsage, extents: Vec<AliasId>) -> AliasId {
        let name_to_extent = extents
            .iter()
            .map(|&id| (self.get(id).name.clone(), id))
            .collect();
        let mut alias = Alias::new(name, Some(ty));
        alias.join = Some(JoinAlias {
            extents,
            name_to_extent,
            ..JoinAlias::default()
        });
        self.push(alias)
    }

    /// New nested join alias: a derived table wrapping a statement whose FROM
    /// was a join. `columns` are the aliases the wrapped statement projects.
    pub fn new_nested_join(
        &mut self,
        name: &str,
        ty: TypeUsage,
        extents: Vec<AliasId>,
        flattened_extents: Vec<AliasId>,
        columns: Vec<AliasId>,
    ) -> AliasId {
        let id = self.new_join(name, ty, extents);
        if let Some(join) = self.aliases[id.0].join.as_mut() {
            join.is_nested_join = true;
            join.flattened_extents = flattened_extents;
            join.column_list = columns;
        }
        id
    }

    pub fn get(&self, id: AliasId) -> &Alias {
        &self.aliases[id.0]
    }

    pub fn join(&self, id: AliasId) -> Option<&JoinAlias> {
        self.get(id).join()
    }

    pub fn join_mut(&mut self, id: AliasId) -> Option<&mut JoinAlias> {
        self.aliases[id.0].join.as_mut()
    }

    pub fn is_join(&self, id: AliasId) -> bool {
        self.get(id).join.is_some()
    }

    pub fn is_nested_join(&self, id: AliasId) -> bool {
        self.join(id).is_some_and(|j| j.is_nested_join)
    }

    /// Member extent of a join alias reached by `name`.
    pub fn join_member(&self, id: AliasId, name: &str) -> Result<AliasId, SqlGenError> {
        self.join(id)
            .and_then(|j| j.name_to_extent.get(name).copied())
            .ok_or_else(|| {
                SqlGenError::violation(format!(
                    "'{}' is not a member of join '{}'",
                    name,
                    self.get(id).name
                ))
            })
    }

    /// Column alias of `extent` for field `field`, created on first use.
    pub fn column_of(&mut self, extent: AliasId, field: &str) -> AliasId {
        if let Some(existing) = self.get(extent).column(field) {
            return existing;
        }
        let column = self.new_column(field);
        self.aliases[extent.0]
            .columns
            .insert(field.to_string(), column);
        column
    }

    pub fn rename(&mut self, id: AliasId, new_name: String) {
        let alias = &mut self.aliases[id.0];
        alias.new_name = new_name;
        alias.needs_renaming = false;
    }

    pub fn mark_needs_renaming(&mut self, id: AliasId) {
        self.aliases[id.0].needs_renaming = true;
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
