//! Values flowing through an expression tree.
//!
//! A node produces one of three things: a number, a boolean, or an error signal. "No value yet"
//! is not a [`Value`]; nodes model it as `Option<Value>` and simply withhold output.
use std::{fmt, sync::Arc};

use strum::{Display, EnumIs};

/// Static type of the value a node produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIs)]
pub enum NodeDataType {
    /// The node exposes a double-precision number.
    Double,
    /// The node exposes a boolean.
    Boolean,
}

/// A runtime failure travelling through the tree as a value.
///
/// Two errors are equal when their messages are equal, so an unchanged failure is not
/// broadcast twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorValue(Arc<str>);

impl ErrorValue {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tagged value delivered to listeners.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Error(ErrorValue),
}

impl Value {
    /// Shorthand for `Value::Error(ErrorValue::new(message))`.
    pub fn error(message: impl Into<Arc<str>>) -> Self {
        Value::Error(ErrorValue::new(message))
    }

    /// Numeric view of the value. Booleans coerce to `1.0`/`0.0`; errors have no number.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Error(_) => None,
        }
    }

    /// Boolean view of the value. Numbers are true when non-zero; errors have no boolean.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Number(n) => Some(*n != 0.0),
            Value::Boolean(b) => Some(*b),
            Value::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Whether a light driven by this value is lit. Errors are never lit.
    pub fn is_lit(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<ErrorValue> for Value {
    fn from(value: ErrorValue) -> Self {
        Value::Error(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write_number(f, *n),
            Value::Boolean(true) => f.write_str("ON"),
            Value::Boolean(false) => f.write_str("OFF"),
            Value::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Culture-independent rendering of a number: integral values print without a fraction,
/// everything else uses the shortest representation that round-trips.
pub(crate) fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n == 0.0 {
        // Avoid "-0"
        return f.write_str("0");
    }
    write!(f, "{n}")
}
