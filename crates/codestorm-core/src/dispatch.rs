//! Event handler registry.
//!
//! Maps each [`EventKind`] to an ordered list of handlers. Handlers for a kind
//! run in registration order.

use codestorm_protocol::{EventKind, InboundEvent};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A callback invoked for every event of the kind it is registered for.
pub type Handler = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&InboundEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered handler lists keyed by event kind.
///
/// The table may be mutated from any thread. Handlers are cloned out of the
/// table before they run, so a handler can register or remove handlers
/// without deadlocking.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<EventKind, Vec<Handler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event kind.
    ///
    /// The same handler may be registered more than once; it then runs once
    /// per registration.
    pub fn on(&self, kind: EventKind, handler: Handler) {
        let mut list = self.handlers.entry(kind).or_default();
        list.push(handler);
        debug!(event = %kind, handlers = list.len(), "Handler registered");
    }

    /// Remove the first registration of `handler` for `kind`.
    ///
    /// Returns `true` if a registration was removed.
    pub fn off(&self, kind: EventKind, handler: &Handler) -> bool {
        let Some(mut list) = self.handlers.get_mut(&kind) else {
            return false;
        };

        let Some(index) = list.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };

        list.remove(index);
        debug!(event = %kind, handlers = list.len(), "Handler removed");

        if list.is_empty() {
            drop(list);
            self.handlers.remove_if(&kind, |_, l| l.is_empty());
        }
        true
    }

    /// Run every handler registered for the event's kind, in order.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &InboundEvent) -> usize {
        let handlers = match self.handlers.get(&event.kind) {
            Some(list) => list.value().clone(),
            None => {
                trace!(event = %event.kind, "No handlers registered");
                return 0;
            }
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of handlers registered for a kind.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map(|l| l.len()).unwrap_or(0)
    }

    /// Total handlers across all kinds.
    #[must_use]
    pub fn total_handlers(&self) -> usize {
        self.handlers.iter().map(|entry| entry.len()).sum()
    }

    /// Remove every handler.
    pub fn clear(&self) {
        self.handlers.clear();
        debug!("All handlers removed");
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("total_handlers", &self.total_handlers())
            .finish()
    }
}
