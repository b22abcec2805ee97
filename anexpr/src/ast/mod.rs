//! Reactive expression nodes.
//!
//! Every node is a small push-based state machine:
//! - subscribing the first listener attaches the node to its children (lazy attach);
//! - later subscribers immediately receive the last reported value, if any;
//! - removing the last listener detaches from the children and forgets cached inputs;
//! - a new value is only broadcast when it differs from the last one reported.
//!
//! Trees are immutable once built. [`AstNode::optimize`] returns a new tree and never mutates
//! the receiver.
use std::{fmt, sync::Arc};

use crate::{
    connection::Variable,
    listeners::Listener,
    value::{NodeDataType, Value},
};

pub mod composite;
pub mod constant;
pub mod error;
pub mod ops;
pub mod relay;
pub mod variable;

pub use composite::{Composite, Operator};
pub use constant::ConstantNode;
pub use error::ErrorNode;
pub use ops::{
    ArithmeticNode, ArithmeticOp, ComparisonNode, ComparisonOp, LogicalNode, LogicalOp,
    UnaryNode, UnaryOp,
};
pub use relay::Relay;
pub use variable::VariableNode;

/// Shared handle to a node of an expression tree.
pub type Node = Arc<dyn AstNode>;

/// The capability set shared by every node of an expression tree.
pub trait AstNode: fmt::Display + Send + Sync + 'static {
    /// Static type of the values this node produces.
    fn value_type(&self) -> NodeDataType;

    /// Message of an error node, `None` for every other node.
    fn error_text(&self) -> Option<&str> {
        None
    }

    /// Attaches a listener. See the module documentation for the protocol.
    fn subscribe(&self, listener: Listener);

    /// Detaches one registration of `listener`. Unknown listeners are ignored.
    fn unsubscribe(&self, listener: &Listener);

    /// Direct children, left to right.
    fn children(&self) -> &[Node] {
        &[]
    }

    /// The external variable referenced by this node when it is a variable leaf.
    fn variable(&self) -> Option<&Variable> {
        None
    }

    /// Every variable referenced in this subtree, deduplicated, in first-seen order.
    fn variables(&self) -> Vec<Variable> {
        let mut found = Vec::new();
        collect_variables(self.children(), self.variable(), &mut found);
        found
    }

    /// The value of a literal node.
    fn as_constant(&self) -> Option<&Value> {
        None
    }

    /// Constant folding. Returns a new tree, or `self` when nothing can be simplified.
    fn optimize(self: Arc<Self>) -> Node;
}

fn collect_variables(children: &[Node], own: Option<&Variable>, found: &mut Vec<Variable>) {
    if let Some(variable) = own {
        if !found.contains(variable) {
            found.push(variable.clone());
        }
    }
    for child in children {
        collect_variables(child.children(), child.variable(), found);
    }
}

impl fmt::Debug for dyn AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AstNode({self})")
    }
}

/// Runs the optimizer over a whole tree.
pub fn optimize(node: Node) -> Node {
    node.optimize()
}

/// Whether `node` is a literal boolean with value `expected`.
pub(crate) fn is_bool_constant(node: &Node, expected: bool) -> bool {
    matches!(node.as_constant(), Some(Value::Boolean(b)) if *b == expected)
}
