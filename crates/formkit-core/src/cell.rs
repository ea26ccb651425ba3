//! Observable value cell.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use formkit_model::{Value, shallow_equal};

type Listener = Rc<dyn Fn(&Value)>;

/// Handle returned by `subscribe` calls, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Take the next id from a counter.
    pub(crate) fn next(counter: &Cell<u64>) -> Self {
        let id = counter.get();
        counter.set(id + 1);
        Self(id)
    }
}

/// A value with synchronous change listeners.
///
/// `set` only counts as a change when the new value is shallow-unequal to
/// the current one. Listeners run after the value is stored, with no borrow
/// held, so they may read the cell again.
pub struct ValueCell {
    value: RefCell<Value>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

impl ValueCell {
    pub fn new(value: Value) -> Self {
        Self {
            value: RefCell::new(value),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Read the value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Store `value`, notifying listeners when it changed.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: Value) -> bool {
        if !self.replace_quiet(value) {
            return false;
        }
        let current = self.get();
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&current);
        }
        true
    }

    /// Store `value` without notifying. Returns whether it changed.
    pub fn replace_quiet(&self, value: Value) -> bool {
        let mut current = self.value.borrow_mut();
        if shallow_equal(&current, &value) {
            return false;
        }
        *current = value;
        true
    }

    pub fn subscribe(&self, listener: impl Fn(&Value) + 'static) -> ListenerId {
        let id = ListenerId::next(&self.next_listener);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

impl Default for ValueCell {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCell")
            .field("listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}
