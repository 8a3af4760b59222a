use thiserror::Error;

use crate::config::SqlVersion;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SqlGenError {
    #[error("Unsupported construct: {kind}")]
    UnsupportedConstruct { kind: String },
    #[error("Structural violation: {0}")]
    StructuralViolation(String),
    #[error("{feature} requires {required} or later (configured: {configured})")]
    DialectLimitation {
        feature: String,
        required: SqlVersion,
        configured: SqlVersion,
    },
}

impl SqlGenError {
    pub fn unsupported(kind: impl Into<String>) -> Self {
        SqlGenError::UnsupportedConstruct { kind: kind.into() }
    }

    pub fn violation(message: impl Into<String>) -> Self {
        SqlGenError::StructuralViolation(message.into())
    }
}
