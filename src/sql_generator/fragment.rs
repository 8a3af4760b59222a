//! Unrendered SQL text.
//!
//! The translator produces a tree of fragments rather than strings: alias
//! references stay symbolic until the renderer has settled every name.

use super::alias::AliasId;
use super::select_statement::SelectStatement;

#[derive(Debug, Clone)]
pub enum Fragment {
    Text(String),
    /// Newline followed by the current indentation.
    LineBreak,
    Builder(SqlBuilder),
    Select(Box<SelectStatement>),
    Alias(AliasId),
}

impl Fragment {
    /// True when rendering would produce nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        match self {
            Fragment::Text(text) => text.trim().is_empty(),
            Fragment::LineBreak => true,
            Fragment::Builder(builder) => builder.is_empty(),
            Fragment::Select(_) | Fragment::Alias(_) => false,
        }
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Text(text.to_string())
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::Text(text)
    }
}

impl From<SqlBuilder> for Fragment {
    fn from(builder: SqlBuilder) -> Self {
        Fragment::Builder(builder)
    }
}

impl From<SelectStatement> for Fragment {
    fn from(statement: SelectStatement) -> Self {
        Fragment::Select(Box::new(statement))
    }
}

impl From<AliasId> for Fragment {
    fn from(alias: AliasId) -> Self {
        Fragment::Alias(alias)
    }
}

/// Append-only sequence of fragments.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    parts: Vec<Fragment>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, part: impl Into<Fragment>) {
        self.parts.push(part.into());
    }

    pub fn append_line(&mut self) {
        self.parts.push(Fragment::LineBreak);
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(Fragment::is_empty)
    }

    pub fn parts(&self) -> &[Fragment] {
        &self.parts
    }
}
