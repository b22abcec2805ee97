//! Local variables (`L:name`) served through a simulator-side module.
//!
//! The simulator module publishes the list of local variable names it knows about; the
//! position of a name in that list is its id. Subscriptions and value updates travel by id
//! over an [`LVarChannel`]. Names can be referenced before the list arrives, or not exist at
//! all for the loaded aircraft.
use std::collections::HashMap;

use anexpr::{
    connection::{Connection, ListenerRegistry, Variable},
    listeners::{Listener, ListenerSnapshot, dispatch},
    value::Value,
};
use log::{debug, warn};
use parking_lot::{Mutex, ReentrantMutex};

use crate::telemetry::NO_VALUE_YET;

/// Sent for names missing from the simulator's list.
pub const LVAR_MISSING: &str = "LVar does not exist";

pub type LVarId = u16;

/// Requests sent to the simulator module.
///
/// Requests are sent after listeners got their initial value; a channel may answer a
/// `subscribe` synchronously through [`LVarManager::update_values`].
pub trait LVarChannel: Send + Sync {
    fn subscribe(&self, id: LVarId);
    fn unsubscribe(&self, id: LVarId);
    fn clear_subscriptions(&self);
}

#[derive(Default)]
struct State {
    ids: HashMap<String, LVarId>,
    names: Vec<String>,
    values: HashMap<String, f64>,
    registry: ListenerRegistry<String>,
}

impl State {
    fn current(&self, name: &str) -> Value {
        match self.values.get(name) {
            Some(value) => Value::Number(*value),
            None if self.ids.contains_key(name) => Value::error(NO_VALUE_YET),
            None => Value::error(LVAR_MISSING),
        }
    }
}

pub struct LVarManager<C> {
    channel: C,
    state: Mutex<State>,
    /// Held while listeners are called; keeps deliveries in recording order.
    delivery: ReentrantMutex<()>,
}

impl<C: LVarChannel> LVarManager<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: Mutex::new(State::default()),
            delivery: ReentrantMutex::new(()),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn id_of(&self, name: &str) -> Option<LVarId> {
        self.state.lock().ids.get(name).copied()
    }

    /// Replaces the list of known names.
    ///
    /// Ids may change between simulator sessions, so every subscription is dropped and the
    /// names that still have listeners are subscribed again under their new ids. When a name
    /// appears twice the first occurrence wins. Values of names missing from the new list are
    /// forgotten.
    pub fn update_lvar_list<N: AsRef<str>>(&self, names: &[N]) {
        let resubscribe = {
            let mut state = self.state.lock();
            state.ids.clear();
            state.names.clear();
            for (index, name) in names.iter().enumerate() {
                let Ok(id) = LVarId::try_from(index) else {
                    warn!("ignoring {} lvar(s) beyond id {}", names.len() - index, LVarId::MAX);
                    break;
                };
                let name = name.as_ref();
                state.names.push(name.to_string());
                state.ids.entry(name.to_string()).or_insert(id);
            }

            let State {
                ids,
                values,
                registry,
                ..
            } = &mut *state;
            values.retain(|name, _| ids.contains_key(name));
            let mut resubscribe: Vec<LVarId> = registry
                .keys()
                .filter_map(|name| ids.get(name).copied())
                .collect();
            resubscribe.sort_unstable();
            resubscribe
        };

        debug!(
            "received {} lvar name(s), {} with listeners",
            names.len(),
            resubscribe.len()
        );
        self.channel.clear_subscriptions();
        for id in resubscribe {
            self.channel.subscribe(id);
        }
    }

    /// Applies a batch of `(id, value)` updates from the simulator module.
    pub fn update_values(&self, updates: &[(LVarId, f64)]) {
        let _delivery = self.delivery.lock();
        let mut deliveries: Vec<(ListenerSnapshot, Value)> = Vec::new();
        {
            let mut state = self.state.lock();
            for &(id, value) in updates {
                let Some(name) = state.names.get(usize::from(id)).cloned() else {
                    warn!("value for unknown lvar id {id}");
                    continue;
                };
                state.values.insert(name.clone(), value);
                let listeners = state.registry.listeners(&name);
                if !listeners.is_empty() {
                    deliveries.push((listeners, Value::Number(value)));
                }
            }
        }
        for (listeners, value) in &deliveries {
            dispatch(listeners, value);
        }
    }
}

impl<C: LVarChannel> Connection for LVarManager<C> {
    fn add_listener(&self, variable: &Variable, listener: &Listener) {
        let Variable::Local { name } = variable else {
            warn!("{variable} routed to the lvar manager");
            listener(&Value::error(format!("{variable} is not a local variable")));
            return;
        };

        let subscribe = {
            let _delivery = self.delivery.lock();
            let (subscribe, current) = {
                let mut state = self.state.lock();
                let first = state.registry.add(name.clone(), listener.clone());
                let id = state.ids.get(name).copied();
                (id.filter(|_| first), state.current(name))
            };
            listener(&current);
            subscribe
        };
        if let Some(id) = subscribe {
            debug!("subscribing to lvar {name} ({id})");
            self.channel.subscribe(id);
        }
    }

    fn remove_listener(&self, variable: &Variable, listener: &Listener) {
        let Variable::Local { name } = variable else {
            return;
        };

        let unsubscribe = {
            let mut state = self.state.lock();
            if !state.registry.remove(name, listener) {
                return;
            }
            state.ids.get(name).copied()
        };
        if let Some(id) = unsubscribe {
            debug!("unsubscribing from lvar {name} ({id})");
            self.channel.unsubscribe(id);
        }
    }
}
