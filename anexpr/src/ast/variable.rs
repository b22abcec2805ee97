use std::{fmt, sync::Arc};

use log::debug;

use crate::{
    connection::{Connection, Variable},
    listeners::Listener,
    value::{NodeDataType, Value},
};

use super::{AstNode, Node, Relay};

/// Leaf referencing an external variable.
///
/// Nodes are not interned: two nodes for the same variable each register their own listener
/// with the connection, which shares the underlying subscription by identifier.
pub struct VariableNode {
    variable: Variable,
    connection: Arc<dyn Connection>,
    relay: Relay,
}

impl VariableNode {
    pub fn new(variable: Variable, connection: Arc<dyn Connection>) -> Self {
        Self {
            variable,
            connection,
            relay: Relay::new(),
        }
    }

    pub fn last_value(&self) -> Option<Value> {
        self.relay.last_value()
    }
}

impl AstNode for VariableNode {
    fn value_type(&self) -> NodeDataType {
        NodeDataType::Double
    }

    fn subscribe(&self, listener: Listener) {
        if self.relay.add(listener) {
            debug!("subscribing to {}", self.variable);
            self.connection
                .add_listener(&self.variable, self.relay.handler());
        }
    }

    fn unsubscribe(&self, listener: &Listener) {
        if self.relay.remove(listener) {
            debug!("unsubscribing from {}", self.variable);
            self.connection
                .remove_listener(&self.variable, self.relay.handler());
        }
    }

    fn variable(&self) -> Option<&Variable> {
        Some(&self.variable)
    }

    fn optimize(self: Arc<Self>) -> Node {
        self
    }
}

impl fmt::Display for VariableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.variable, f)
    }
}

impl fmt::Debug for VariableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableNode")
            .field("variable", &self.variable)
            .field("relay", &self.relay)
            .finish()
    }
}
