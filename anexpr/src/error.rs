use std::ops::Range;

use thiserror::Error;

use crate::{connection::Dialect, value::NodeDataType};

/// Reasons an expression text cannot be turned into a working tree.
///
/// These never cross [`ExpressionParser::parse`](crate::parser::ExpressionParser::parse):
/// they are folded into an error node carrying the message. Use
/// [`ExpressionParser::try_parse`](crate::parser::ExpressionParser::try_parse) to get them as a
/// `Result`.
///
/// Spans are byte ranges into the text after `&&`/`||` rewriting, see
/// [`normalize_operators`](crate::lexer::normalize_operators).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("{message}")]
    Lex { message: String, span: Range<usize> },

    #[error("{message}")]
    Syntax { message: String, span: Range<usize> },

    #[error("Missing units for variable 'A:{name}'.")]
    MissingUnits { name: String, span: Range<usize> },

    #[error("Operator '{operator}' expects {expected} operands, found {found} operand '{operand}'.")]
    TypeMismatch {
        operator: String,
        expected: NodeDataType,
        found: NodeDataType,
        operand: String,
    },

    #[error("Variables of the {dialect} dialect are not supported here: '{variable}'.")]
    UnsupportedDialect { dialect: Dialect, variable: String },

    #[error("A boolean expression is needed to drive a light, not a numeric one.")]
    NotBoolean,
}

impl ExprError {
    /// Where in the source text the error was found, when it can be pinned down.
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            ExprError::Lex { span, .. }
            | ExprError::Syntax { span, .. }
            | ExprError::MissingUnits { span, .. } => Some(span.clone()),
            _ => None,
        }
    }
}

pub type ExprResult<T> = Result<T, ExprError>;
