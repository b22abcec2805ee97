//! Listener handles and the reference-counted listener set.
//!
//! Only two transitions of a listener set carry side effects: the first insertion (attach to
//! whatever feeds the set) and the removal of the last listener (detach). [`ListenerSet`]
//! reports exactly those transitions so callers never have to compare counts themselves.
use std::sync::Arc;

use smallvec::SmallVec;

use crate::value::Value;

/// Callback receiving value-changed notifications.
///
/// Listeners are identified by the allocation they point to: removing a listener requires
/// passing a clone of the same `Arc` that was added.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wraps a closure into a [`Listener`].
pub fn listener(f: impl Fn(&Value) + Send + Sync + 'static) -> Listener {
    Arc::new(f)
}

/// Whether two handles refer to the same listener.
pub fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Small snapshot of listeners, taken under a lock and invoked after it is released.
pub type ListenerSnapshot = SmallVec<[Listener; 4]>;

/// Ordered multiset of listeners.
#[derive(Default, Clone)]
pub struct ListenerSet {
    items: SmallVec<[Listener; 2]>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. Returns `true` on the 0 → 1 transition.
    pub fn insert(&mut self, listener: Listener) -> bool {
        self.items.push(listener);
        self.items.len() == 1
    }

    /// Removes one registration of `listener`. Returns `true` on the 1 → 0 transition.
    ///
    /// Removing a listener that is not registered is a no-op and never reports a transition.
    pub fn remove(&mut self, listener: &Listener) -> bool {
        match self.items.iter().rposition(|l| same_listener(l, listener)) {
            Some(index) => {
                self.items.remove(index);
                self.items.is_empty()
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> ListenerSnapshot {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.items.len())
            .finish()
    }
}

/// Invokes every listener of a snapshot with `value`.
pub fn dispatch(listeners: &[Listener], value: &Value) {
    for listener in listeners {
        listener(value);
    }
}
