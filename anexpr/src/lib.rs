//! Anexpr: reactive expressions driving annunciator lights.
//!
//! A light is driven by a small expression over simulator telemetry, e.g.
//! `A:AUTOPILOT HEADING LOCK, bool == 1 AND L:XMLVAR_Baro_Selector_HPA_1 != 0`. This crate
//! turns such text into a tree of reactive nodes:
//!  - variable leaves receive values pushed by a [`connection::Connection`];
//!  - inner nodes recompute when a child reports, `AND`/`OR` short-circuit, errors propagate
//!    as values;
//!  - subscriptions are lazy and reference counted all the way down to the connections.
//!
//! Example
//! ```
//! use std::sync::{Arc, Mutex};
//! use anexpr::prelude::*;
//!
//! let parser = ExpressionParser::new(Connections::new());
//! let node = optimize(parser.parse("ON AND (2 * 3 > 5)"));
//! assert_eq!(node.to_string(), "((2 * 3) > 5)");
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! node.subscribe(listener(move |v| sink.lock().unwrap().push(v.clone())));
//! assert_eq!(*seen.lock().unwrap(), vec![Value::Boolean(true)]);
//! ```

/// Expression nodes and the reactive protocol.
pub mod ast;
/// Connections to telemetry sources, variable identities.
pub mod connection;
/// Parse errors.
pub mod error;
/// Tokens and the lexer.
pub mod lexer;
/// Named light expressions.
pub mod light;
/// Listener handles and reference-counted listener sets.
pub mod listeners;
/// Text to reactive tree.
pub mod parser;
/// Values flowing through the trees.
pub mod value;

pub use error::{ExprError, ExprResult};

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::ast::{AstNode, Node, optimize};
    pub use crate::connection::{
        Connection, Connections, Dialect, ListenerRegistry, OffsetKind, Variable,
    };
    pub use crate::error::{ExprError, ExprResult};
    pub use crate::light::LightExpression;
    pub use crate::listeners::{Listener, listener};
    pub use crate::parser::ExpressionParser;
    pub use crate::value::{ErrorValue, NodeDataType, Value};
}
