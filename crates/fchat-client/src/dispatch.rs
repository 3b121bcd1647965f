//! Delivery of inbound lines to the current observer

use std::sync::{Arc, PoisonError, RwLock};

/// Sink for inbound messages.
///
/// Implemented for any `Fn(&str)` closure, so a UI or a script runner can
/// register a plain closure.
pub trait MessageObserver: Send + Sync {
    /// Called once per inbound line, in arrival order, on the listener task.
    /// Implementations should hand the message off rather than block.
    fn on_message(&self, message: &str);
}

impl<F> MessageObserver for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_message(&self, message: &str) {
        self(message)
    }
}

/// Single-slot observer reference, replaceable while lines are flowing
#[derive(Default)]
pub struct Dispatcher {
    observer: RwLock<Option<Arc<dyn MessageObserver>>>,
}

impl Dispatcher {
    /// Create a dispatcher with no observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `observer`, replacing any previous one
    pub fn set_observer(&self, observer: Arc<dyn MessageObserver>) {
        *self
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    /// Remove the current observer; subsequent lines are dropped
    pub fn clear_observer(&self) {
        *self
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether an observer is installed
    pub fn has_observer(&self) -> bool {
        self.observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver one line. Returns `false` if it was dropped for lack of an
    /// observer.
    pub fn dispatch(&self, message: &str) -> bool {
        // Snapshot once so a concurrent replace cannot split this delivery
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match observer {
            Some(observer) => {
                observer.on_message(message);
                true
            }
            None => {
                tracing::info!("Could not process line, no listener provided: {}", message);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<dyn MessageObserver>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn MessageObserver> =
            Arc::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string()));
        (seen, observer)
    }

    #[test]
    fn test_dispatch_without_observer_drops() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.has_observer());
        assert!(!dispatcher.dispatch("lost"));
    }

    #[test]
    fn test_dispatch_in_order() {
        let dispatcher = Dispatcher::new();
        let (seen, observer) = recorder();
        dispatcher.set_observer(observer);

        assert!(dispatcher.dispatch("one"));
        assert!(dispatcher.dispatch("two"));
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_replace_and_clear_observer() {
        let dispatcher = Dispatcher::new();
        let (first, first_observer) = recorder();
        let (second, second_observer) = recorder();

        dispatcher.set_observer(first_observer);
        dispatcher.dispatch("a");
        dispatcher.set_observer(second_observer);
        dispatcher.dispatch("b");
        dispatcher.clear_observer();
        dispatcher.dispatch("c");

        assert_eq!(*first.lock().unwrap(), vec!["a"]);
        assert_eq!(*second.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_observer_may_replace_itself() {
        // The read lock is released before the observer runs
        let dispatcher = Arc::new(Dispatcher::new());
        let inner = Arc::clone(&dispatcher);
        dispatcher.set_observer(Arc::new(move |_: &str| inner.clear_observer()));

        assert!(dispatcher.dispatch("first"));
        assert!(!dispatcher.dispatch("second"));
    }
}
