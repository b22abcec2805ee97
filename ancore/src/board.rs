//! Which lights are lit right now.
//!
//! [`LightBoard`] listens to a set of [`LightExpression`]s and keeps the last value of each.
//! A light is lit only while its expression reports `true`. On top of that a [`LightGate`]
//! switches the whole panel off while the simulator is not in a flyable state.
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Weak},
};

use anexpr::{
    light::LightExpression,
    listeners::{Listener, listener},
    value::Value,
};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::lights::{Light, REPORT_LEN, feature_report};

/// Conditions under which the panel shows anything at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightGate {
    pub simulator_connected: bool,
    pub simulator_in_main_menu: bool,
    pub reading_configuration: bool,
    pub application_exiting: bool,
}

impl LightGate {
    pub fn is_open(&self) -> bool {
        self.simulator_connected
            && !self.simulator_in_main_menu
            && !self.reading_configuration
            && !self.application_exiting
    }
}

/// Names of the lights currently lit.
pub type LitLights = BTreeSet<String>;

pub type LitCallback = Arc<dyn Fn(&LitLights) + Send + Sync>;

#[derive(Default)]
struct BoardState {
    gate: LightGate,
    values: BTreeMap<String, Value>,
    reported: LitLights,
}

impl BoardState {
    fn lit(&self) -> LitLights {
        if !self.gate.is_open() {
            return LitLights::new();
        }
        self.values
            .iter()
            .filter(|(_, value)| value.is_lit())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

struct Shared {
    state: Mutex<BoardState>,
    on_change: Option<LitCallback>,
}

impl Shared {
    fn update(&self, change: impl FnOnce(&mut BoardState)) {
        let changed = {
            let mut state = self.state.lock();
            change(&mut state);
            let lit = state.lit();
            if lit == state.reported {
                None
            } else {
                state.reported = lit.clone();
                Some(lit)
            }
        };
        if let (Some(lit), Some(callback)) = (changed, &self.on_change) {
            debug!("lit lights: {lit:?}");
            callback(&lit);
        }
    }
}

pub struct LightBoard {
    shared: Arc<Shared>,
    attached: Vec<(LightExpression, Listener)>,
}

impl LightBoard {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A board calling `on_change` whenever the effective set of lit lights changes.
    pub fn with_callback(on_change: impl Fn(&LitLights) + Send + Sync + 'static) -> Self {
        Self::build(Some(Arc::new(on_change)))
    }

    fn build(on_change: Option<LitCallback>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BoardState::default()),
                on_change,
            }),
            attached: Vec::new(),
        }
    }

    /// Replaces the lights shown by the board.
    pub fn attach(&mut self, lights: Vec<LightExpression>) {
        self.detach();
        for light in lights {
            if let Some(error) = light.error_text() {
                warn!("light {} cannot be evaluated: {error}", light.name());
            }
            let handler = self.handler_for(light.name());
            self.attached.push((light, handler));
        }
        // Values may arrive synchronously, only subscribe once the board is complete
        for (light, handler) in &self.attached {
            light.subscribe(handler.clone());
        }
    }

    fn handler_for(&self, name: &str) -> Listener {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let name = name.to_string();
        listener(move |value| {
            if let Some(shared) = shared.upgrade() {
                shared.update(|state| {
                    state.values.insert(name.clone(), value.clone());
                });
            }
        })
    }

    /// Unsubscribes every light and forgets their values.
    pub fn detach(&mut self) {
        for (light, handler) in self.attached.drain(..) {
            light.unsubscribe(&handler);
        }
        self.shared.update(|state| state.values.clear());
    }

    pub fn gate(&self) -> LightGate {
        self.shared.state.lock().gate
    }

    pub fn set_gate(&self, gate: LightGate) {
        self.shared.update(|state| state.gate = gate);
    }

    pub fn set_simulator_connected(&self, connected: bool) {
        self.shared
            .update(|state| state.gate.simulator_connected = connected);
    }

    pub fn set_simulator_in_main_menu(&self, in_menu: bool) {
        self.shared
            .update(|state| state.gate.simulator_in_main_menu = in_menu);
    }

    pub fn set_reading_configuration(&self, reading: bool) {
        self.shared
            .update(|state| state.gate.reading_configuration = reading);
    }

    pub fn set_application_exiting(&self, exiting: bool) {
        self.shared
            .update(|state| state.gate.application_exiting = exiting);
    }

    /// The lights currently lit; empty while the gate is closed.
    pub fn lit(&self) -> LitLights {
        self.shared.state.lock().lit()
    }

    pub fn is_lit(&self, name: &str) -> bool {
        self.lit().contains(name)
    }

    /// Last value reported for a light, whatever the gate state.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.shared.state.lock().values.get(name).cloned()
    }

    /// Lights whose last value is an error, with the error message.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.shared
            .state
            .lock()
            .values
            .iter()
            .filter_map(|(name, value)| {
                value
                    .as_error()
                    .map(|error| (name.clone(), error.message().to_string()))
            })
            .collect()
    }

    /// Feature report for the lit lights. Names that are not panel lights are skipped.
    pub fn feature_report(&self) -> [u8; REPORT_LEN] {
        feature_report(
            self.lit()
                .iter()
                .filter_map(|name| Light::parse(name).ok()),
        )
    }
}

impl Default for LightBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LightBoard {
    fn drop(&mut self) {
        for (light, handler) in self.attached.drain(..) {
            light.unsubscribe(&handler);
        }
    }
}
