use std::{fmt, sync::Arc};

use crate::{
    listeners::Listener,
    value::{NodeDataType, Value},
};

use super::{AstNode, Node};

/// A literal: `ON`, `OFF` or a number.
///
/// Holds no listeners. Every subscriber receives the value immediately and nothing ever
/// changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode {
    value: Value,
}

impl ConstantNode {
    pub fn boolean(value: bool) -> Self {
        Self {
            value: Value::Boolean(value),
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            value: Value::Number(value),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl AstNode for ConstantNode {
    fn value_type(&self) -> NodeDataType {
        match self.value {
            Value::Boolean(_) => NodeDataType::Boolean,
            _ => NodeDataType::Double,
        }
    }

    fn subscribe(&self, listener: Listener) {
        listener(&self.value);
    }

    fn unsubscribe(&self, _listener: &Listener) {}

    fn as_constant(&self) -> Option<&Value> {
        Some(&self.value)
    }

    fn optimize(self: Arc<Self>) -> Node {
        self
    }
}

impl fmt::Display for ConstantNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}
