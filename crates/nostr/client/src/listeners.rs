//! Ordered callback tables.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A registered callback.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Callbacks run in registration order. Emitting snapshots the table first,
/// so a callback may register, clear or close without deadlocking.
pub(crate) struct Listeners<T: ?Sized> {
    handlers: Mutex<Vec<Handler<T>>>,
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> Listeners<T> {
    pub(crate) fn add(&self, handler: Handler<T>) {
        lock(&self.handlers).push(handler);
    }

    pub(crate) fn extend(&self, handlers: Vec<Handler<T>>) {
        lock(&self.handlers).extend(handlers);
    }

    pub(crate) fn emit(&self, value: &T) {
        let handlers = lock(&self.handlers).clone();
        for handler in handlers {
            handler(value);
        }
    }

    pub(crate) fn clear(&self) {
        lock(&self.handlers).clear();
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.handlers).len()
    }
}

/// Callbacks never run under these locks, so a poisoned lock only means a
/// panic elsewhere; the data is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emits_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listeners: Listeners<str> = Listeners::default();
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            listeners.add(Arc::new(move |value: &str| {
                seen.lock().unwrap().push(format!("{tag}:{value}"));
            }));
        }

        listeners.emit("x");
        assert_eq!(*seen.lock().unwrap(), vec!["first:x", "second:x"]);
    }

    #[test]
    fn handlers_may_clear_the_table_while_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let listeners: Arc<Listeners<()>> = Arc::new(Listeners::default());
        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let table = Arc::downgrade(&listeners);
            listeners.add(Arc::new(move |_: &()| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(table) = table.upgrade() {
                    table.clear();
                }
            }));
        }

        listeners.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(listeners.len(), 0);

        listeners.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
