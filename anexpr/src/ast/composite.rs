//! Nodes computed from the values of their children.
//!
//! [`Composite`] carries the whole reactive protocol (lazy attach, replay to late subscribers,
//! detach on last unsubscribe, change-only broadcast). An [`Operator`] supplies the parts that
//! differ between node kinds: how inputs combine, how the node renders and how it folds.
use std::{fmt, sync::Arc};

use log::trace;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
    listeners::{Listener, ListenerSet, dispatch, listener},
    value::{NodeDataType, Value},
};

use super::{AstNode, Node};

/// Behaviour of a composite node.
pub trait Operator: Copy + fmt::Debug + Send + Sync + 'static {
    /// Static type of the node's output.
    fn value_type(&self) -> NodeDataType;

    /// Combines the last value received from each child (`None` while a child has not
    /// reported). Returning `None` withholds output.
    fn compute(&self, inputs: &[Option<Value>]) -> Option<Value>;

    /// Canonical rendering of the node given its children.
    fn render(&self, children: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Constant folding for nodes of this operator.
    fn optimize(node: Arc<Composite<Self>>) -> Node {
        node
    }
}

/// Inputs every child has reported, or the leftmost error among them.
///
/// `None` while at least one child has not reported yet.
pub(crate) fn settled(inputs: &[Option<Value>]) -> Option<Result<SmallVec<[&Value; 2]>, Value>> {
    let values: SmallVec<[&Value; 2]> = inputs.iter().map(Option::as_ref).collect::<Option<_>>()?;
    if let Some(error) = values.iter().find(|value| value.is_error()) {
        return Some(Err((*error).clone()));
    }
    Some(Ok(values))
}

#[derive(Default)]
struct State {
    listeners: ListenerSet,
    inputs: SmallVec<[Option<Value>; 2]>,
    reported: Option<Value>,
}

struct Shared<O> {
    op: O,
    state: Mutex<State>,
}

impl<O: Operator> Shared<O> {
    fn receive(&self, index: usize, value: &Value) {
        let (snapshot, next) = {
            let mut state = self.state.lock();
            if state.listeners.is_empty() {
                // Detached while the value was in flight.
                return;
            }
            state.inputs[index] = Some(value.clone());

            let Some(next) = self.op.compute(&state.inputs) else {
                return;
            };
            if state.reported.as_ref() == Some(&next) {
                return;
            }
            state.reported = Some(next.clone());
            (state.listeners.snapshot(), next)
        };

        dispatch(&snapshot, &next);
    }
}

/// A node with one or more children and an [`Operator`].
pub struct Composite<O: Operator> {
    children: SmallVec<[Node; 2]>,
    /// One handler per child, registered while the node is attached.
    handlers: SmallVec<[Listener; 2]>,
    shared: Arc<Shared<O>>,
}

impl<O: Operator> Composite<O> {
    pub fn new(op: O, children: impl IntoIterator<Item = Node>) -> Self {
        let children: SmallVec<[Node; 2]> = children.into_iter().collect();
        let shared = Arc::new(Shared {
            op,
            state: Mutex::new(State {
                inputs: SmallVec::from_elem(None, children.len()),
                ..State::default()
            }),
        });

        let handlers = (0..children.len())
            .map(|index| {
                let shared = Arc::downgrade(&shared);
                listener(move |value| {
                    if let Some(shared) = shared.upgrade() {
                        shared.receive(index, value);
                    }
                })
            })
            .collect();

        Self {
            children,
            handlers,
            shared,
        }
    }

    pub fn unary(op: O, child: Node) -> Self {
        Self::new(op, [child])
    }

    pub fn binary(op: O, lhs: Node, rhs: Node) -> Self {
        Self::new(op, [lhs, rhs])
    }

    pub fn op(&self) -> O {
        self.shared.op
    }

    pub fn operand(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// Last value broadcast to listeners.
    pub fn last_value(&self) -> Option<Value> {
        self.shared.state.lock().reported.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }
}

impl<O: Operator> AstNode for Composite<O> {
    fn value_type(&self) -> NodeDataType {
        self.shared.op.value_type()
    }

    fn subscribe(&self, listener: Listener) {
        let (first, replay) = {
            let mut state = self.shared.state.lock();
            let first = state.listeners.insert(listener.clone());
            let replay = if first { None } else { state.reported.clone() };
            (first, replay)
        };

        if first {
            trace!("attaching {self}");
            // Children may report synchronously; the new listener then receives the first
            // computed value through the regular broadcast.
            for (child, handler) in self.children.iter().zip(&self.handlers) {
                child.subscribe(handler.clone());
            }
        } else if let Some(value) = replay {
            listener(&value);
        }
    }

    fn unsubscribe(&self, listener: &Listener) {
        let last = {
            let mut state = self.shared.state.lock();
            let last = state.listeners.remove(listener);
            if last {
                state.inputs.iter_mut().for_each(|input| *input = None);
                state.reported = None;
            }
            last
        };

        if last {
            trace!("detaching {self}");
            for (child, handler) in self.children.iter().zip(&self.handlers) {
                child.unsubscribe(handler);
            }
        }
    }

    fn children(&self) -> &[Node] {
        &self.children
    }

    fn optimize(self: Arc<Self>) -> Node {
        O::optimize(self)
    }
}

impl<O: Operator> fmt::Display for Composite<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shared.op.render(&self.children, f)
    }
}

impl<O: Operator> fmt::Debug for Composite<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("op", &self.shared.op)
            .field("children", &self.children)
            .finish()
    }
}
