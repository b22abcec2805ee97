//! A [`Connection`] for any telemetry feed that pushes values per variable.
//!
//! The feed itself (a simulator client, a network socket, a replay file) only has to know how
//! to start and stop receiving one variable; [`TelemetryConnection`] does the listener
//! bookkeeping, caches the last value of every variable and tracks the link state.
use std::collections::HashMap;

use anexpr::{
    connection::{Connection, ListenerRegistry, Variable},
    listeners::{Listener, ListenerSnapshot, dispatch},
    value::Value,
};
use log::{debug, info, warn};
use parking_lot::{Mutex, ReentrantMutex};

/// Sent to listeners while linked but before the first value of their variable arrives.
pub const NO_VALUE_YET: &str = "No value yet received from simulator";
/// Sent to listeners while the link is down.
pub const NOT_CONNECTED: &str = "No connection to simulator";

/// The feed behind a [`TelemetryConnection`].
///
/// `subscribe` is called after the new listeners got their initial value, so a source may
/// publish synchronously from within it. A source must not block waiting for a publish made
/// on another thread.
pub trait TelemetrySource: Send + Sync {
    fn subscribe(&self, variable: &Variable);
    fn unsubscribe(&self, variable: &Variable);
}

/// Source that never delivers anything on its own; values come in through
/// [`TelemetryConnection::publish`] only.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualSource;

impl TelemetrySource for ManualSource {
    fn subscribe(&self, _variable: &Variable) {}
    fn unsubscribe(&self, _variable: &Variable) {}
}

#[derive(Default)]
struct State {
    registry: ListenerRegistry<String>,
    variables: HashMap<String, Variable>,
    values: HashMap<String, Value>,
    connected: bool,
}

pub struct TelemetryConnection<S> {
    source: S,
    state: Mutex<State>,
    /// Held while listeners are called, so they observe values in the order they were
    /// recorded. Listeners may re-enter the connection.
    delivery: ReentrantMutex<()>,
}

impl<S: TelemetrySource> TelemetryConnection<S> {
    /// Creates a disconnected connection.
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(State::default()),
            delivery: ReentrantMutex::new(()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Variables with at least one listener, sorted by identifier.
    pub fn subscribed_variables(&self) -> Vec<Variable> {
        let state = self.state.lock();
        let mut variables: Vec<_> = state.variables.values().cloned().collect();
        variables.sort_by_key(Variable::identifier);
        variables
    }

    pub fn last_value(&self, variable: &Variable) -> Option<Value> {
        self.state.lock().values.get(&variable.identifier()).cloned()
    }

    /// Updates the link state.
    ///
    /// Coming up re-subscribes every variable that has listeners and tells them no value is
    /// known yet. Going down forgets every value and tells listeners the link is gone.
    pub fn set_connected(&self, connected: bool) {
        let resubscribe = {
            let _delivery = self.delivery.lock();
            let (variables, listeners) = {
                let mut state = self.state.lock();
                if state.connected == connected {
                    return;
                }
                state.connected = connected;
                state.values.clear();
                let variables: Vec<Variable> = if connected {
                    state.variables.values().cloned().collect()
                } else {
                    Vec::new()
                };
                (variables, state.registry.all_listeners())
            };

            if connected {
                info!("telemetry link up, resubscribing {} variable(s)", variables.len());
                dispatch(&listeners, &Value::error(NO_VALUE_YET));
            } else {
                info!("telemetry link down");
                dispatch(&listeners, &Value::error(NOT_CONNECTED));
            }
            variables
        };

        for variable in &resubscribe {
            self.source.subscribe(variable);
        }
    }

    /// Records a new value for `variable` and forwards it to its listeners.
    pub fn publish(&self, variable: &Variable, value: Value) {
        let id = variable.identifier();
        let _delivery = self.delivery.lock();
        let listeners: ListenerSnapshot = {
            let mut state = self.state.lock();
            if !state.connected {
                warn!("dropping value for {id}: telemetry link is down");
                return;
            }
            if !state.registry.contains(&id) {
                debug!("dropping value for {id}: no listener");
                return;
            }
            state.values.insert(id.clone(), value.clone());
            state.registry.listeners(&id)
        };
        dispatch(&listeners, &value);
    }
}

impl<S: TelemetrySource> Connection for TelemetryConnection<S> {
    fn add_listener(&self, variable: &Variable, listener: &Listener) {
        let id = variable.identifier();
        let subscribe = {
            let _delivery = self.delivery.lock();
            let (subscribe, current) = {
                let mut state = self.state.lock();
                let first = state.registry.add(id.clone(), listener.clone());
                if first {
                    state.variables.insert(id.clone(), variable.clone());
                }
                let current = if !state.connected {
                    Value::error(NOT_CONNECTED)
                } else {
                    state
                        .values
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| Value::error(NO_VALUE_YET))
                };
                (first && state.connected, current)
            };
            listener(&current);
            subscribe
        };

        if subscribe {
            debug!("subscribing to {id}");
            self.source.subscribe(variable);
        }
    }

    fn remove_listener(&self, variable: &Variable, listener: &Listener) {
        let id = variable.identifier();
        let unsubscribe = {
            let mut state = self.state.lock();
            if !state.registry.remove(&id, listener) {
                return;
            }
            state.variables.remove(&id);
            state.values.remove(&id);
            state.connected
        };

        if unsubscribe {
            debug!("unsubscribing from {id}");
            self.source.unsubscribe(variable);
        }
    }
}
