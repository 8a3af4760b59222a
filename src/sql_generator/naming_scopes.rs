//! Scope-aware variable resolution for the translator.
//!
//! One scope is entered per statement being built; variables bound by an
//! operator's input are added to the innermost scope and looked up from the
//! innermost scope outwards, so correlated inner statements still resolve
//! variables of the statements enclosing them.

use std::collections::HashMap;

use super::alias::AliasId;
use super::errors::SqlGenError;

#[derive(Debug, Default)]
pub struct NamingScopes {
    scopes: Vec<HashMap<String, AliasId>>,
}

impl NamingScopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) -> Result<(), SqlGenError> {
        self.scopes
            .pop()
            .map(|_| ())
            .ok_or_else(|| SqlGenError::violation("exit_scope called with no open scope"))
    }

    /// Bind `name` in the innermost scope, replacing any previous binding there.
    pub fn add(&mut self, name: &str, alias: AliasId) -> Result<(), SqlGenError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| SqlGenError::violation(format!("no open scope to bind '{}'", name)))?;
        scope.insert(name.to_string(), alias);
        Ok(())
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<AliasId> {
        let found = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied());
        log::trace!("NamingScopes: lookup '{}' -> {:?}", name, found);
        found
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
