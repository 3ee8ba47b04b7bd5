//! The circuit breaker side of the bridge.

use std::sync::Arc;

use crate::event::{BreakerEvent, EventKind};
use crate::hook::{EventHandler, HookRegistry, SubscriptionId};

/// A circuit breaker whose lifecycle events can be observed.
///
/// The breaker owns its state machine; implementors only expose an identity
/// and a way to install and remove event handlers. Handlers must be called
/// synchronously, in emission order, for every event of the subscribed kind.
pub trait ObservableBreaker {
    /// Gets the name of the breaker.
    fn name(&self) -> &str;

    /// Gets the group the breaker belongs to.
    fn group(&self) -> Option<&str> {
        None
    }

    /// Installs a handler for events of the given kind.
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId;

    /// Removes a previously installed handler, returning false if it is unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

impl<T: ObservableBreaker + ?Sized> ObservableBreaker for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn group(&self) -> Option<&str> {
        (**self).group()
    }

    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        (**self).subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }
}

impl<T: ObservableBreaker + ?Sized> ObservableBreaker for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn group(&self) -> Option<&str> {
        (**self).group()
    }

    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        (**self).subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }
}

/// A named event emitter that a breaker implementation can embed or drive.
///
/// The handle carries no breaker logic: whoever runs the state machine calls
/// [`BreakerHandle::emit`] at each transition and execution outcome.
#[derive(Debug)]
pub struct BreakerHandle {
    name: String,
    group: Option<String>,
    hooks: HookRegistry,
}

impl BreakerHandle {
    /// Creates a handle for a breaker with the given name and no group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            hooks: HookRegistry::new(),
        }
    }

    /// Sets the group of the breaker.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Delivers an event to every subscribed handler.
    pub fn emit(&self, event: BreakerEvent) {
        self.hooks.emit(&event);
    }

    /// Gets the underlying hook registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }
}

impl ObservableBreaker for BreakerHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.hooks.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hooks.unsubscribe(id)
    }
}
