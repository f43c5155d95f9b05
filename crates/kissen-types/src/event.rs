//! Injectable event dispatch.
//!
//! Mutations on permissions and bans announce themselves through an
//! [`EventDispatcher`] before they are persisted. Listeners may rewrite the
//! event (the mutation then uses the rewritten payload) or cancel it, in
//! which case the caller gets [`EventCancelled`] and nothing is written.
//!
//! ```text
//! registry.set_permission(..)
//!        │
//!        ▼
//!   dispatcher.call(&mut event) ──► listener 1 ──► listener 2 ──► ...
//!        │                              │
//!        │ true                         └─ Cancel ──► Err(EventCancelled)
//!        ▼
//!   persist event payload
//! ```

use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tracing::debug;

/// An event that can be dispatched.
pub trait Event {
    /// Stable name used in logs and in [`EventCancelled`].
    fn name(&self) -> &'static str;
}

/// Dispatches events to listeners.
///
/// Returns `false` when a listener cancelled the event.
pub trait EventDispatcher<E>: Send + Sync {
    fn call(&self, event: &mut E) -> bool;
}

/// Raised when a listener cancels a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event '{event}' was cancelled by a listener")]
pub struct EventCancelled {
    pub event: &'static str,
}

impl EventCancelled {
    /// Dispatches `event` and converts a cancellation into an error.
    pub fn check<E: Event>(
        dispatcher: &dyn EventDispatcher<E>,
        event: &mut E,
    ) -> Result<(), EventCancelled> {
        if dispatcher.call(event) {
            Ok(())
        } else {
            Err(EventCancelled {
                event: event.name(),
            })
        }
    }
}

/// What a listener wants to happen to the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    Cancel,
}

type Listener<E> = Box<dyn Fn(&mut E) -> EventOutcome + Send + Sync>;

/// In-process listener registry.
///
/// Listeners run in registration order; the first one to cancel stops
/// dispatch.
pub struct EventBus<E> {
    listeners: RwLock<Vec<Listener<E>>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Registers a listener.
    pub fn subscribe(&self, listener: impl Fn(&mut E) -> EventOutcome + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventDispatcher<E> for EventBus<E> {
    fn call(&self, event: &mut E) -> bool {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for (index, listener) in listeners.iter().enumerate() {
            if listener(event) == EventOutcome::Cancel {
                debug!(event = event.name(), listener = index, "Event cancelled");
                return false;
            }
        }
        true
    }
}

/// Dispatcher that accepts every event unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl<E> EventDispatcher<E> for NoopDispatcher {
    fn call(&self, _event: &mut E) -> bool {
        true
    }
}
