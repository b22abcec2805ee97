use std::{fmt, sync::Arc};

use crate::{listeners::Listener, value::NodeDataType};

use super::{AstNode, Node};

/// Terminal node standing in for an expression that could not be built.
///
/// Never produces a value; it renders as its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    message: String,
}

impl ErrorNode {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl AstNode for ErrorNode {
    fn value_type(&self) -> NodeDataType {
        NodeDataType::Double
    }

    fn error_text(&self) -> Option<&str> {
        Some(&self.message)
    }

    fn subscribe(&self, _listener: Listener) {}

    fn unsubscribe(&self, _listener: &Listener) {}

    fn optimize(self: Arc<Self>) -> Node {
        self
    }
}

impl fmt::Display for ErrorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
