//! Death notification.
//!
//! Containers, robots, interfaces and connections reference each other
//! without owning each other. When one of them is destroyed, everything that
//! registered interest is told exactly once, and the observer list is
//! cleared so no callback can keep the dead object's dependents alive.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback invoked when the observed object dies.
pub type DeathCallback = Box<dyn FnOnce() + Send + 'static>;

/// Handle returned by [`DeathNotifier::notify_on_death`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observer list of a single object.
pub struct DeathNotifier {
    next_id: AtomicU64,
    /// `None` once the object is dead.
    observers: Mutex<Option<Vec<(ObserverId, DeathCallback)>>>,
}

impl DeathNotifier {
    /// Create a notifier for a live object.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            observers: Mutex::new(Some(Vec::new())),
        }
    }

    /// Register a callback.
    ///
    /// If the object is already dead the callback runs immediately and
    /// `None` is returned.
    pub fn notify_on_death(&self, callback: DeathCallback) -> Option<ObserverId> {
        let mut guard = self.observers.lock();
        if let Some(list) = guard.as_mut() {
            let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
            list.push((id, callback));
            return Some(id);
        }
        drop(guard);
        callback();
        None
    }

    /// Unregister a callback. Returns whether it was still registered.
    pub fn dont_notify_on_death(&self, id: ObserverId) -> bool {
        let mut guard = self.observers.lock();
        let Some(list) = guard.as_mut() else {
            return false;
        };
        let before = list.len();
        list.retain(|(observer, _)| *observer != id);
        list.len() != before
    }

    /// Mark the object dead and run every callback.
    ///
    /// Callbacks run after the lock is released, so they may touch this
    /// notifier again. Returns `false` if the object was already dead.
    pub fn fire(&self) -> bool {
        let observers = self.observers.lock().take();
        match observers {
            Some(list) => {
                for (_, callback) in list {
                    callback();
                }
                true
            }
            None => false,
        }
    }

    /// Whether [`fire`](Self::fire) has run.
    pub fn is_dead(&self) -> bool {
        self.observers.lock().is_none()
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().as_ref().map_or(0, Vec::len)
    }
}

impl Default for DeathNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeathNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeathNotifier")
            .field("dead", &self.is_dead())
            .field("observers", &self.observer_count())
            .finish()
    }
}
