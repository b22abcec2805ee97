//! The bridge between variable leaves and the outside world.
//!
//! A [`Connection`] is whatever delivers telemetry for one dialect of variable (simulator
//! variables, local variables, memory offsets, bus variables). Variable nodes register a
//! listener per variable identity; connections keep one underlying subscription per identity
//! no matter how many nodes reference it. [`ListenerRegistry`] is the bookkeeping every
//! connection needs for that.
//!
//! Contract for implementors
//! - `add_listener` delivers the best known current value to the new listener before it
//!   returns (the value itself, "no value yet", or "not connected"). The first listener for an
//!   identity starts whatever work is needed to receive its updates.
//! - `remove_listener` releases the underlying subscription when the last listener of an
//!   identity goes away, and only then.
//! - Listener callbacks must be invoked without holding the connection's internal lock: a
//!   notification travels up the tree synchronously and may come back to the same connection.
use std::{collections::HashMap, fmt, hash::Hash, sync::Arc};

use strum::{Display, EnumIter};

use crate::listeners::{Listener, ListenerSet, ListenerSnapshot};

/// Telemetry dialects. Each dialect is served by its own [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum Dialect {
    /// `L:name`
    #[strum(to_string = "local")]
    Local,
    /// `A:name, units`
    #[strum(to_string = "simulator")]
    Simulator,
    /// `OFFSET:ADDR:TYPEn`
    #[strum(to_string = "offset")]
    Offset,
    /// `[Category:Identifier]`
    #[strum(to_string = "bus")]
    Bus,
}

/// Encoding of a raw memory offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum OffsetKind {
    #[strum(to_string = "FLOAT")]
    Float,
    #[strum(to_string = "INT")]
    Int,
}

/// A reference to an external named value.
///
/// The canonical rendering ([`fmt::Display`]) doubles as the variable's identifier. It always
/// carries the dialect's prefix, so identifiers of different dialects never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    Local {
        name: String,
    },
    Simulator {
        name: String,
        units: String,
    },
    Offset {
        address: u32,
        kind: OffsetKind,
        /// Width in bytes: 1, 2, 4 or 8.
        width: u8,
    },
    Bus {
        category: String,
        identifier: String,
    },
}

impl Variable {
    pub fn local(name: impl Into<String>) -> Self {
        Variable::Local { name: name.into() }
    }

    pub fn simulator(name: impl Into<String>, units: impl Into<String>) -> Self {
        Variable::Simulator {
            name: name.into(),
            units: units.into(),
        }
    }

    pub fn bus(category: impl Into<String>, identifier: impl Into<String>) -> Self {
        Variable::Bus {
            category: category.into(),
            identifier: identifier.into(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Variable::Local { .. } => Dialect::Local,
            Variable::Simulator { .. } => Dialect::Simulator,
            Variable::Offset { .. } => Dialect::Offset,
            Variable::Bus { .. } => Dialect::Bus,
        }
    }

    /// Stable string identity used by connections to key their listener sets.
    pub fn identifier(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Local { name } => write!(f, "L:{name}"),
            Variable::Simulator { name, units } => write!(f, "A:{name}, {units}"),
            Variable::Offset {
                address,
                kind,
                width,
            } => write!(f, "OFFSET:{address:X}:{kind}{width}"),
            Variable::Bus {
                category,
                identifier,
            } => write!(f, "[{category}:{identifier}]"),
        }
    }
}

/// A source of values for variables of one dialect.
pub trait Connection: Send + Sync {
    /// Registers `listener` for `variable` and immediately delivers its current state.
    fn add_listener(&self, variable: &Variable, listener: &Listener);

    /// Unregisters one registration of `listener` for `variable`.
    fn remove_listener(&self, variable: &Variable, listener: &Listener);
}

/// Routes each dialect to the connection serving it.
///
/// Handed to the parser explicitly; there are no process-wide connection singletons.
#[derive(Clone, Default)]
pub struct Connections {
    routes: HashMap<Dialect, Arc<dyn Connection>>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Connections::insert`].
    pub fn with(mut self, dialect: Dialect, connection: Arc<dyn Connection>) -> Self {
        self.insert(dialect, connection);
        self
    }

    /// Routes `dialect` to `connection`, replacing any previous route.
    pub fn insert(&mut self, dialect: Dialect, connection: Arc<dyn Connection>) {
        self.routes.insert(dialect, connection);
    }

    pub fn get(&self, dialect: Dialect) -> Option<&Arc<dyn Connection>> {
        self.routes.get(&dialect)
    }

    pub fn supports(&self, dialect: Dialect) -> bool {
        self.routes.contains_key(&dialect)
    }
}

impl fmt::Debug for Connections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dialects: Vec<_> = self.routes.keys().collect();
        dialects.sort();
        f.debug_struct("Connections")
            .field("dialects", &dialects)
            .finish()
    }
}

/// Per-identity listener sets, reference counted.
///
/// Not synchronized: connections keep it behind their own lock together with the rest of
/// their state.
#[derive(Debug)]
pub struct ListenerRegistry<K> {
    sets: HashMap<K, ListenerSet>,
}

impl<K> Default for ListenerRegistry<K> {
    fn default() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> ListenerRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener for `key`. Returns `true` when it is the first one for that key.
    pub fn add(&mut self, key: K, listener: Listener) -> bool {
        self.sets.entry(key).or_default().insert(listener)
    }

    /// Removes a listener for `key`. Returns `true` when it was the last one; the key is then
    /// forgotten entirely.
    pub fn remove(&mut self, key: &K, listener: &Listener) -> bool {
        let Some(set) = self.sets.get_mut(key) else {
            return false;
        };
        let last = set.remove(listener);
        if last {
            self.sets.remove(key);
        }
        last
    }

    pub fn listeners(&self, key: &K) -> ListenerSnapshot {
        self.sets
            .get(key)
            .map(ListenerSet::snapshot)
            .unwrap_or_default()
    }

    pub fn listener_count(&self, key: &K) -> usize {
        self.sets.get(key).map_or(0, ListenerSet::len)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.sets.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.sets.keys()
    }

    /// Every registered listener of every key.
    pub fn all_listeners(&self) -> ListenerSnapshot {
        self.sets.values().flat_map(|set| set.snapshot()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
