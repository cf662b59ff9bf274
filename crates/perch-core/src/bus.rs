//! Namespaced synchronous event listeners.
//!
//! Every component owns an [`EventBus`] for its lifecycle events, and the
//! popup stage owns one for show/hide events. Listeners are registered under
//! a [`Namespace`] (normally the owning component's id) so a component can
//! drop all of its listeners at once on disposal.
//!
//! A listener answers [`Flow::Veto`] to cancel the operation announcing a
//! cancelable event; every matching listener still runs.

use std::fmt;

/// Listener verdict for cancelable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    Veto,
}

impl Flow {
    pub fn is_veto(self) -> bool {
        self == Flow::Veto
    }
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed {
            Flow::Continue
        } else {
            Flow::Veto
        }
    }
}

/// Groups listeners for removal with [`EventBus::off_namespace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(pub u64);

/// Handle returned by [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Events carried by an [`EventBus`] expose a kind used for filtering.
pub trait BusEvent {
    type Kind: Copy + PartialEq + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

type Handler<E> = Box<dyn FnMut(&E) -> Flow + Send>;

struct Listener<E: BusEvent> {
    id: ListenerId,
    namespace: Namespace,
    kind: E::Kind,
    handler: Handler<E>,
}

/// A list of listeners dispatched in registration order.
pub struct EventBus<E: BusEvent> {
    listeners: Vec<Listener<E>>,
    next_id: u64,
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.
    pub fn on(
        &mut self,
        namespace: Namespace,
        kind: E::Kind,
        handler: impl FnMut(&E) -> Flow + Send + 'static,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Listener {
            id,
            namespace,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Remove every listener registered under `namespace`.
    pub fn off_namespace(&mut self, namespace: Namespace) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.namespace != namespace);
        before - self.listeners.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Run every listener for the event's kind. Vetoed if any listener vetoes.
    pub fn emit(&mut self, event: &E) -> Flow {
        let kind = event.kind();
        let mut flow = Flow::Continue;
        for listener in self.listeners.iter_mut().filter(|l| l.kind == kind) {
            if (listener.handler)(event).is_veto() {
                flow = Flow::Veto;
            }
        }
        flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Ping {
        A,
        B,
    }

    impl BusEvent for Ping {
        type Kind = Ping;

        fn kind(&self) -> Ping {
            *self
        }
    }

    #[test]
    fn emits_only_matching_kind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        let counter = hits.clone();
        bus.on(Namespace(1), Ping::A, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Flow::Continue
        });
        bus.emit(&Ping::B);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        bus.emit(&Ping::A);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn any_veto_cancels_but_all_run() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        bus.on(Namespace(1), Ping::A, |_| Flow::Veto);
        let counter = hits.clone();
        bus.on(Namespace(1), Ping::A, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Flow::Continue
        });
        assert_eq!(bus.emit(&Ping::A), Flow::Veto);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_namespace_removes_group() {
        let mut bus = EventBus::new();
        bus.on(Namespace(1), Ping::A, |_| Flow::Veto);
        bus.on(Namespace(1), Ping::B, |_| Flow::Veto);
        let keep = bus.on(Namespace(2), Ping::A, |_| Flow::Continue);
        assert_eq!(bus.off_namespace(Namespace(1)), 2);
        assert_eq!(bus.len(), 1);
        assert_eq!(bus.emit(&Ping::A), Flow::Continue);
        assert!(bus.off(keep));
        assert!(!bus.off(keep));
        assert!(bus.is_empty());
    }

    #[test]
    fn flow_from_bool() {
        assert_eq!(Flow::from(true), Flow::Continue);
        assert!(Flow::from(false).is_veto());
    }
}
