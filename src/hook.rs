//! Hook registry for circuit breaker events.

use crate::event::{BreakerEvent, EventKind};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A handler invoked for every event of the kind it is subscribed to.
pub type EventHandler = Arc<dyn Fn(&BreakerEvent) + Send + Sync + 'static>;

type HandlerList = SmallVec<[(SubscriptionId, EventHandler); 2]>;

// Ids are unique across registries so a handle from one breaker can never
// remove a handler installed on another.
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Identifies one installed handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }

    /// Gets the raw id value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A registry for circuit breaker event hooks.
///
/// Any number of handlers can be installed per event kind. Each install
/// returns a [`SubscriptionId`] that removes exactly that handler again.
pub struct HookRegistry {
    on_exec: RwLock<HandlerList>,
    on_success: RwLock<HandlerList>,
    on_failure: RwLock<HandlerList>,
    on_timeout: RwLock<HandlerList>,
    on_health_check_failed: RwLock<HandlerList>,
    on_circuit_closed: RwLock<HandlerList>,
    on_circuit_open: RwLock<HandlerList>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &self.handler_count(kind));
        }
        map.finish()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_exec: RwLock::new(SmallVec::new()),
            on_success: RwLock::new(SmallVec::new()),
            on_failure: RwLock::new(SmallVec::new()),
            on_timeout: RwLock::new(SmallVec::new()),
            on_health_check_failed: RwLock::new(SmallVec::new()),
            on_circuit_closed: RwLock::new(SmallVec::new()),
            on_circuit_open: RwLock::new(SmallVec::new()),
        }
    }

    fn slot(&self, kind: EventKind) -> &RwLock<HandlerList> {
        match kind {
            EventKind::Exec => &self.on_exec,
            EventKind::Success => &self.on_success,
            EventKind::Failure => &self.on_failure,
            EventKind::Timeout => &self.on_timeout,
            EventKind::HealthCheckFailed => &self.on_health_check_failed,
            EventKind::CircuitClosed => &self.on_circuit_closed,
            EventKind::CircuitOpen => &self.on_circuit_open,
        }
    }

    /// Installs a handler for events of the given kind.
    pub fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.slot(kind).write().push((id, handler));
        id
    }

    /// Installs a closure as the handler for events of the given kind.
    pub fn on<F>(&self, kind: EventKind, f: F) -> SubscriptionId
    where
        F: Fn(&BreakerEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(f))
    }

    /// Removes a previously installed handler.
    ///
    /// Returns false if the id is unknown to this registry.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        for kind in EventKind::ALL {
            let mut handlers = self.slot(kind).write();
            if let Some(pos) = handlers.iter().position(|(sub, _)| *sub == id) {
                handlers.remove(pos);
                return true;
            }
        }

        false
    }

    /// Delivers an event to every handler subscribed to its kind.
    pub fn emit(&self, event: &BreakerEvent) {
        // Execute hooks outside the lock path
        let handlers: SmallVec<[EventHandler; 2]> = self
            .slot(event.kind())
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    /// Gets the number of handlers installed for a kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.slot(kind).read().len()
    }

    /// Returns true if no handler is installed for any kind.
    pub fn is_empty(&self) -> bool {
        EventKind::ALL
            .iter()
            .all(|kind| self.slot(*kind).read().is_empty())
    }

    /// Removes every installed handler.
    pub fn clear(&self) {
        for kind in EventKind::ALL {
            self.slot(kind).write().clear();
        }
    }
}
