use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar types a column, constant or parameter can carry.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Decimal,
    Double,
    String,
    DateTime,
    DateTimeOffset,
    Time,
    Guid,
    Binary,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A named member of a row type.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeUsage,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeUsage) -> Self {
        Field {
            name: name.into(),
            ty,
        }
    }

    pub fn primitive(name: impl Into<String>, ty: PrimitiveType) -> Self {
        Field::new(name, TypeUsage::Primitive(ty))
    }
}

/// Structural type descriptor of any tree node.
///
/// Relational nodes produce `Collection(Row(..))`; scalar nodes produce a
/// `Primitive`, or a `Row` for record construction and join members.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum TypeUsage {
    Primitive(PrimitiveType),
    Row(Vec<Field>),
    Collection(Box<TypeUsage>),
}

impl TypeUsage {
    pub fn row(fields: Vec<Field>) -> Self {
        TypeUsage::Row(fields)
    }

    pub fn collection_of(element: TypeUsage) -> Self {
        TypeUsage::Collection(Box::new(element))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeUsage::Collection(_))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeUsage::Primitive(_))
    }

    /// Element type of a collection; any other type is its own element.
    pub fn element_type(&self) -> &TypeUsage {
        match self {
            TypeUsage::Collection(element) => element,
            other => other,
        }
    }

    /// Fields of a row type, empty for everything else.
    pub fn fields(&self) -> &[Field] {
        match self {
            TypeUsage::Row(fields) => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&TypeUsage> {
        self.fields()
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_unwraps_collection_once() {
        let row = TypeUsage::row(vec![Field::primitive("Id", PrimitiveType::Int32)]);
        let coll = TypeUsage::collection_of(row.clone());
        assert_eq!(coll.element_type(), &row);
        assert_eq!(row.element_type(), &row);
    }

    #[test]
    fn test_field_lookup() {
        let row = TypeUsage::row(vec![
            Field::primitive("Id", PrimitiveType::Int32),
            Field::primitive("Name", PrimitiveType::String),
        ]);
        assert_eq!(
            row.field("Name"),
            Some(&TypeUsage::Primitive(PrimitiveType::String))
        );
        assert!(row.field("Missing").is_none());
        assert!(TypeUsage::Primitive(PrimitiveType::Int32).fields().is_empty());
    }
}
