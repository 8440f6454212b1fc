use std::sync::Arc;

use crate::types::GameEvent;

/// Receives every event produced by an ingestion path.
///
/// Observers are invoked synchronously on the producing task, in line/response
/// order. Implementations must return quickly; anything that may wait has to
/// hand the event off without blocking (see the hub's drop-on-full sender).
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &GameEvent);
}

impl<F> EventObserver for F
where
    F: Fn(&GameEvent) + Send + Sync,
{
    fn on_event(&self, event: &GameEvent) {
        self(event)
    }
}

/// Fixed list of observers, assembled at startup.
#[derive(Clone, Default)]
pub struct Observers {
    observers: Vec<Arc<dyn EventObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: Arc<dyn EventObserver>) {
        self.observers.push(observer);
    }

    /// Deliver `event` to every observer in registration order.
    pub fn notify(&self, event: &GameEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
