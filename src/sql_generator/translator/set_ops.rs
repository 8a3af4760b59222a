use crate::config::SqlVersion;
use crate::query_tree::{Expr, SetOpKind};
use crate::sql_generator::errors::SqlGenError;
use crate::sql_generator::fragment::SqlBuilder;
use crate::sql_generator::select_statement::SelectStatement;

use super::{Translated, Translator};

pub(super) fn set_op_keyword(kind: SetOpKind) -> &'static str {
    match kind {
        SetOpKind::UnionAll => "UNION ALL",
        SetOpKind::Union => "UNION",
        SetOpKind::Intersect => "INTERSECT",
        SetOpKind::Except => "EXCEPT",
    }
}

impl<'d> Translator<'d> {
    /// Both sides become complete statements joined by the set keyword; the
    /// result is used as a derived table by whatever consumes it.
    pub(super) fn visit_set_op(
        &mut self,
        kind: SetOpKind,
        left: &Expr,
        right: &Expr,
    ) -> Result<Translated, SqlGenError> {
        let keyword = set_op_keyword(kind);
        if matches!(kind, SetOpKind::Intersect | SetOpKind::Except) {
            self.dialect.require_version(keyword, SqlVersion::Sql2005)?;
        }

        let result_type = left.result_type_cached(&mut self.types);
        let nested_field = result_type
            .element_type()
            .fields()
            .iter()
            .find(|f| !f.ty.is_primitive());
        if let Some(field) = nested_field {
            return Err(SqlGenError::unsupported(format!(
                "{} over rows with non-scalar field '{}'",
                keyword, field.name
            )));
        }

        let left = self.visit_set_op_side(left)?;
        let right = self.visit_set_op_side(right)?;
        log::debug!("Translator: {} of two statements", keyword);

        let mut sql = SqlBuilder::new();
        sql.append(left);
        sql.append_line();
        sql.append(keyword);
        sql.append_line();
        sql.append(right);
        Ok(Translated::Sql(sql))
    }

    /// One operand as a statement that can stand next to a set keyword. An
    /// ORDER BY kept for a TOP cannot appear inside a set operation, so such
    /// a side is moved into a derived table.
    fn visit_set_op_side(&mut self, side: &Expr) -> Result<SelectStatement, SqlGenError> {
        let statement = self.visit_ensure_statement(side, true)?;
        if statement.order_by.is_empty() {
            return Ok(statement);
        }

        let element = self.element_type(side);
        let (mut wrapped, from) = self.create_new_statement(statement, "c", element, true)?;
        Self::attach_from_alias(&mut wrapped, from, &self.aliases, &mut self.counters);
        self.expand_columns(&mut wrapped);
        Ok(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(set_op_keyword(SetOpKind::UnionAll), "UNION ALL");
        assert_eq!(set_op_keyword(SetOpKind::Except), "EXCEPT");
    }
}
