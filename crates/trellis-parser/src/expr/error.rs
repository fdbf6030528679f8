use thiserror::Error;

use crate::markup::MarkupError;

/// Error raised while lexing, parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The source text is not a valid program.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    /// A name was read before anything bound it.
    #[error("name `{0}` is not defined")]
    UndefinedName(String),

    /// An operation was applied to values of the wrong type.
    #[error("type error: {0}")]
    Type(String),

    /// A value has the right type but an unusable content.
    #[error("value error: {0}")]
    Value(String),

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A list or string index is out of bounds.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// A map has no entry for the key.
    #[error("key `{0}` not found")]
    KeyNotFound(String),

    /// User functions called each other too deeply.
    #[error("maximum recursion depth exceeded")]
    RecursionLimit,

    /// `markup()` was given text that is not well-formed markup.
    #[error("invalid markup: {0}")]
    Markup(#[from] MarkupError),
}

impl ExprError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ExprError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        ExprError::Type(message.into())
    }

    pub(crate) fn value_error(message: impl Into<String>) -> Self {
        ExprError::Value(message.into())
    }
}
