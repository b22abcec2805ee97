use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    listeners::{Listener, ListenerSet, dispatch, listener},
    value::Value,
};

#[derive(Default)]
struct RelayState {
    listeners: ListenerSet,
    reported: Option<Value>,
}

/// Forwards values from a single upstream source to a set of listeners.
///
/// Owners attach [`Relay::handler`] to the upstream when [`Relay::add`] reports the first
/// listener, and detach it when [`Relay::remove`] reports the last one. The relay replays the
/// last value to later subscribers and suppresses unchanged values.
pub struct Relay {
    state: Arc<Mutex<RelayState>>,
    handler: Listener,
}

impl Relay {
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(RelayState::default()));
        let weak = Arc::downgrade(&state);
        let handler = listener(move |value| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let snapshot = {
                let mut state = state.lock();
                if state.listeners.is_empty() || state.reported.as_ref() == Some(value) {
                    return;
                }
                state.reported = Some(value.clone());
                state.listeners.snapshot()
            };
            dispatch(&snapshot, value);
        });
        Self { state, handler }
    }

    /// The listener to register upstream.
    pub fn handler(&self) -> &Listener {
        &self.handler
    }

    /// Adds a listener. Returns `true` when it is the first one and the upstream must be
    /// attached; otherwise the last value, if any, is delivered right away.
    pub fn add(&self, listener: Listener) -> bool {
        let (first, replay) = {
            let mut state = self.state.lock();
            let first = state.listeners.insert(listener.clone());
            (first, if first { None } else { state.reported.clone() })
        };
        if let Some(value) = replay {
            listener(&value);
        }
        first
    }

    /// Removes a listener. Returns `true` when it was the last one and the upstream must be
    /// detached.
    pub fn remove(&self, listener: &Listener) -> bool {
        let mut state = self.state.lock();
        let last = state.listeners.remove(listener);
        if last {
            state.reported = None;
        }
        last
    }

    pub fn last_value(&self) -> Option<Value> {
        self.state.lock().reported.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Relay")
            .field("listeners", &state.listeners.len())
            .field("reported", &state.reported)
            .finish()
    }
}
