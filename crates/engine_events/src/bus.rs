//! Event bus: named channels of listener callbacks.
//!
//! An [`EventBus`] maps event names to listener lists. [`EventBus::emit`]
//! snapshots the listener list before invoking anything, so listeners may
//! subscribe or unsubscribe (on any event, including the one being emitted)
//! while a dispatch is in flight:
//!
//! - a listener removed mid-dispatch still receives the in-flight payload,
//! - a listener added mid-dispatch first hears the next emit.
//!
//! The bus does not own its subscribers. A subscriber keeps the
//! [`Subscription`] returned by [`EventBus::on`] and unsubscribes before it
//! goes away.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

/// Identifier of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<P> = Rc<dyn Fn(&P)>;

struct Entry<P> {
    id: ListenerId,
    listener: Listener<P>,
    once: bool,
}

struct Registry<P> {
    next_id: u64,
    events: HashMap<String, Vec<Entry<P>>>,
}

impl<P> Registry<P> {
    fn remove(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(entries) = self.events.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.events.remove(event);
        }
        removed
    }
}

/// A publish/subscribe channel carrying payloads of type `P`.
///
/// Cloning an `EventBus` yields another handle to the same channel.
pub struct EventBus<P> {
    registry: Rc<RefCell<Registry<P>>>,
}

impl<P: 'static> EventBus<P> {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 1,
                events: HashMap::new(),
            })),
        }
    }

    /// Register `listener` for `event`.
    ///
    /// The returned [`Subscription`] removes exactly this listener.
    pub fn on(&self, event: &str, listener: impl Fn(&P) + 'static) -> Subscription<P> {
        self.subscribe(event, Rc::new(listener), false)
    }

    /// Register `listener` for the next emission of `event` only.
    pub fn once(&self, event: &str, listener: impl Fn(&P) + 'static) -> Subscription<P> {
        self.subscribe(event, Rc::new(listener), true)
    }

    fn subscribe(&self, event: &str, listener: Listener<P>, once: bool) -> Subscription<P> {
        let mut registry = self.registry.borrow_mut();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry
            .events
            .entry(event.to_string())
            .or_default()
            .push(Entry { id, listener, once });
        Subscription {
            registry: Rc::downgrade(&self.registry),
            event: event.to_string(),
            id,
        }
    }

    /// Remove the listener `id` from `event`.
    ///
    /// Returns `false` if it was not registered there.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.registry.borrow_mut().remove(event, id)
    }

    /// Invoke every listener registered for `event` with `payload`.
    ///
    /// Returns the number of listeners invoked. Emitting an event without
    /// listeners is a no-op.
    pub fn emit(&self, event: &str, payload: &P) -> usize {
        let listeners: Vec<Listener<P>> = {
            let mut registry = self.registry.borrow_mut();
            let Some(entries) = registry.events.get_mut(event) else {
                return 0;
            };
            let snapshot = entries.iter().map(|e| Rc::clone(&e.listener)).collect();
            entries.retain(|e| !e.once);
            if entries.is_empty() {
                registry.events.remove(event);
            }
            snapshot
        };

        trace!(event, listeners = listeners.len(), "emit");
        for listener in &listeners {
            listener(payload);
        }
        listeners.len()
    }

    /// Returns `true` if `event` has at least one listener.
    #[must_use]
    pub fn has_listeners(&self, event: &str) -> bool {
        self.registry.borrow().events.contains_key(event)
    }

    /// Returns the number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.registry
            .borrow()
            .events
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Returns the names of all events with listeners, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.borrow().events.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove every listener of `event`.
    pub fn clear_event(&self, event: &str) {
        self.registry.borrow_mut().events.remove(event);
    }

    /// Remove every listener of every event.
    pub fn clear(&self) {
        self.registry.borrow_mut().events.clear();
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<P> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let mut map = f.debug_map();
        for (event, entries) in &registry.events {
            map.entry(event, &entries.len());
        }
        map.finish()
    }
}

/// Handle to one registered listener.
///
/// Dropping the handle does not unsubscribe; call
/// [`Subscription::unsubscribe`].
pub struct Subscription<P> {
    registry: Weak<RefCell<Registry<P>>>,
    event: String,
    id: ListenerId,
}

impl<P> Subscription<P> {
    /// The listener's id, usable with [`EventBus::off`].
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The event this listener is registered for.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove exactly this listener.
    ///
    /// Returns `false` if it had already been removed or the bus is gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(&self.event, self.id),
            None => false,
        }
    }
}

impl<P> fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}
