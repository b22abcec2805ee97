use std::{fmt, sync::Arc};

use log::trace;

use crate::{
    ast::{AstNode, ErrorNode, Node, Relay},
    connection::Variable,
    error::ExprError,
    listeners::Listener,
    value::{NodeDataType, Value},
};

/// A named expression driving one light.
///
/// Consumers subscribe to the light rather than to the tree: the light attaches to its root
/// on the first subscription, detaches after the last one and replays the last value to late
/// subscribers.
pub struct LightExpression {
    name: String,
    root: Node,
    relay: Relay,
}

impl LightExpression {
    /// Wraps `root`. With `require_boolean`, a numeric root is replaced by an error node.
    pub fn new(name: impl Into<String>, root: Node, require_boolean: bool) -> Self {
        let root = if require_boolean
            && root.error_text().is_none()
            && root.value_type() != NodeDataType::Boolean
        {
            Arc::new(ErrorNode::new(ExprError::NotBoolean.to_string())) as Node
        } else {
            root
        };
        Self {
            name: name.into(),
            root,
            relay: Relay::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn error_text(&self) -> Option<&str> {
        self.root.error_text()
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.root.variables()
    }

    pub fn last_value(&self) -> Option<Value> {
        self.relay.last_value()
    }

    pub fn subscribe(&self, listener: Listener) {
        if self.relay.add(listener) {
            trace!("light {} attached", self.name);
            self.root.subscribe(self.relay.handler().clone());
        }
    }

    pub fn unsubscribe(&self, listener: &Listener) {
        if self.relay.remove(listener) {
            trace!("light {} detached", self.name);
            self.root.unsubscribe(self.relay.handler());
        }
    }
}

impl fmt::Display for LightExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

impl fmt::Debug for LightExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightExpression")
            .field("name", &self.name)
            .field("root", &self.root)
            .finish()
    }
}
