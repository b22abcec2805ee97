#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use anexpr::prelude::*;
use parking_lot::Mutex;
use strum::IntoEnumIterator;

/// In-memory connection recording source subscriptions.
#[derive(Default)]
pub struct MockConnection {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    registry: ListenerRegistry<String>,
    values: HashMap<String, Value>,
    /// Delivered to new listeners when no value is known; nothing when `None`.
    fallback: Option<Value>,
    subscribed: Vec<String>,
    released: Vec<String>,
}

impl MockConnection {
    /// Never delivers anything until a value is set.
    pub fn silent() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Delivers `fallback` to new listeners of variables without a value.
    pub fn with_fallback(fallback: Value) -> Arc<Self> {
        let connection = Self::default();
        connection.inner.lock().fallback = Some(fallback);
        Arc::new(connection)
    }

    pub fn set(&self, variable: &str, value: Value) {
        let listeners = {
            let mut inner = self.inner.lock();
            inner.values.insert(variable.to_string(), value.clone());
            inner.registry.listeners(&variable.to_string())
        };
        for listener in listeners {
            listener(&value);
        }
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.inner.lock().subscribed.clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.inner.lock().released.clone()
    }

    pub fn listener_count(&self, variable: &str) -> usize {
        self.inner
            .lock()
            .registry
            .listener_count(&variable.to_string())
    }
}

impl Connection for MockConnection {
    fn add_listener(&self, variable: &Variable, listener: &Listener) {
        let id = variable.identifier();
        let current = {
            let mut inner = self.inner.lock();
            if inner.registry.add(id.clone(), listener.clone()) {
                inner.subscribed.push(id.clone());
            }
            inner.values.get(&id).cloned().or_else(|| inner.fallback.clone())
        };
        if let Some(value) = current {
            listener(&value);
        }
    }

    fn remove_listener(&self, variable: &Variable, listener: &Listener) {
        let id = variable.identifier();
        let mut inner = self.inner.lock();
        if inner.registry.remove(&id, listener) {
            inner.released.push(id);
        }
    }
}

/// Parser with every dialect routed to `connection`.
pub fn parser_for(connection: Arc<MockConnection>) -> ExpressionParser {
    let mut connections = Connections::new();
    for dialect in Dialect::iter() {
        connections.insert(dialect, connection.clone());
    }
    ExpressionParser::new(connections)
}

/// Listener recording every value it receives.
pub fn recorder() -> (Listener, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (listener(move |value| sink.lock().push(value.clone())), seen)
}

/// Subscribes, captures the latest value, unsubscribes.
pub fn evaluate(node: &Node) -> Option<Value> {
    let (listener, seen) = recorder();
    node.subscribe(listener.clone());
    node.unsubscribe(&listener);
    let last = seen.lock().last().cloned();
    last
}
