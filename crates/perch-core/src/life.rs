//! Component lifecycle: identity, observable properties and states,
//! batched change notification and method interception.
//!
//! A widget embeds a [`Life`] and implements [`Lifecycle`]. Property writes
//! go through [`Lifecycle::set_property`]; queued writes are flushed by
//! [`Lifecycle::sync`], which the widget runs when the `Command::next_tick`
//! requested by the first write of a tick comes back.
//!
//! ```rust,ignore
//! fn set_value(&mut self, value: f64) -> Command<Message> {
//!     self.set_property("value", value, SetOptions::default())
//!         .then(Message::Sync)
//! }
//! ```

use crate::bus::{BusEvent, EventBus, Flow, ListenerId, Namespace};
use crate::command::Command;
use crate::scene::ElementId;
use crate::store::{Change, SetOptions, Store, Validator, Write};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

impl ComponentId {
    pub fn next() -> Self {
        ComponentId(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The listener namespace owned by this component.
    pub fn namespace(self) -> Namespace {
        Namespace(self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Ready,
    Disposed,
}

/// Payload attached to interception and dispatch events.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Detail {
    #[default]
    None,
    Index(usize),
    Number(f64),
    Text(String),
    Element(ElementId),
}

/// Answer of a method's guard in the before/after convention.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Proceed,
    Veto,
    /// Proceed, replacing the event detail.
    Enrich(Detail),
}

impl From<bool> for Guard {
    fn from(proceed: bool) -> Self {
        if proceed {
            Guard::Proceed
        } else {
            Guard::Veto
        }
    }
}

/// Events published on a component's bus.
#[derive(Debug, Clone, PartialEq)]
pub enum LifeEvent<V> {
    PropertyChange(Vec<(&'static str, Change<V>)>),
    StateChange(Vec<(&'static str, Change<bool>)>),
    /// Cancelable; published before an intercepted method runs.
    Before { method: &'static str, detail: Detail },
    After { method: &'static str, detail: Detail },
    /// A widget-specific named event.
    Dispatch { name: &'static str, detail: Detail },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeEventKind {
    PropertyChange,
    StateChange,
    Before(&'static str),
    After(&'static str),
    Dispatch(&'static str),
}

impl<V> BusEvent for LifeEvent<V> {
    type Kind = LifeEventKind;

    fn kind(&self) -> LifeEventKind {
        match self {
            LifeEvent::PropertyChange(_) => LifeEventKind::PropertyChange,
            LifeEvent::StateChange(_) => LifeEventKind::StateChange,
            LifeEvent::Before { method, .. } => LifeEventKind::Before(*method),
            LifeEvent::After { method, .. } => LifeEventKind::After(*method),
            LifeEvent::Dispatch { name, .. } => LifeEventKind::Dispatch(*name),
        }
    }
}

/// Whether a write needs a flush to be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Schedule {
    Idle,
    NextTick,
}

impl Schedule {
    pub fn needs_flush(self) -> bool {
        self == Schedule::NextTick
    }

    /// `Command::next_tick(msg)` when a flush is needed, otherwise nothing.
    pub fn then<M: Send + 'static>(self, msg: M) -> Command<M> {
        match self {
            Schedule::NextTick => Command::next_tick(msg),
            Schedule::Idle => Command::none(),
        }
    }

    /// Combine two schedules; a flush is needed if either needs one.
    pub fn and(self, other: Schedule) -> Schedule {
        if self.needs_flush() || other.needs_flush() {
            Schedule::NextTick
        } else {
            Schedule::Idle
        }
    }
}

/// Result of a write on [`Life`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    Skipped,
    Queued(Schedule),
    /// A synchronous write; the change must be applied and announced now.
    Immediate(Change<V>),
}

/// Every net change of one flush.
#[derive(Debug, Clone, PartialEq)]
pub struct Changes<V> {
    pub properties: Vec<(&'static str, Change<V>)>,
    pub states: Vec<(&'static str, Change<bool>)>,
}

impl<V> Default for Changes<V> {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            states: Vec::new(),
        }
    }
}

impl<V> Changes<V> {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.states.is_empty()
    }

    pub fn property(&self, name: &str) -> Option<&Change<V>> {
        self.properties
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c)
    }

    pub fn state(&self, name: &str) -> Option<&Change<bool>> {
        self.states.iter().find(|(n, _)| *n == name).map(|(_, c)| c)
    }
}

type Watcher<V> = Box<dyn FnMut(&Change<V>) + Send>;

/// Lifecycle bookkeeping embedded in every widget.
pub struct Life<V> {
    id: ComponentId,
    phase: Phase,
    properties: Store<V>,
    states: Store<bool>,
    watchers: Vec<(&'static str, Watcher<V>)>,
    bus: EventBus<LifeEvent<V>>,
    flush_scheduled: bool,
}

impl<V: fmt::Debug> fmt::Debug for Life<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Life")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("properties", &self.properties)
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}

impl<V: Clone + PartialEq + Send + 'static> Default for Life<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq + Send + 'static> Life<V> {
    pub fn new() -> Self {
        Self {
            id: ComponentId::next(),
            phase: Phase::Created,
            properties: Store::new(),
            states: Store::new(),
            watchers: Vec::new(),
            bus: EventBus::new(),
            flush_scheduled: false,
        }
    }

    /// Mark the component ready. Returns `false` if it already was.
    pub fn init(&mut self) -> bool {
        if self.phase != Phase::Created {
            return false;
        }
        self.phase = Phase::Ready;
        tracing::trace!(component = %self.id, "ready");
        true
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn namespace(&self) -> Namespace {
        self.id.namespace()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == Phase::Disposed
    }

    pub fn define_property(&mut self, name: &'static str, initial: V) {
        self.properties.define(name, initial);
    }

    pub fn define_state(&mut self, name: &'static str, initial: bool) {
        self.states.define(name, initial);
    }

    pub fn validate(&mut self, name: &'static str, validator: Validator<V>) {
        self.properties.validate(name, validator);
    }

    pub fn property(&self, name: &str) -> Option<&V> {
        self.properties.get(name)
    }

    /// Current value of a state; undefined states read as `false`.
    pub fn state(&self, name: &str) -> bool {
        self.states.get(name).copied().unwrap_or(false)
    }

    pub fn has_pending(&self) -> bool {
        self.properties.has_pending() || self.states.has_pending()
    }

    pub fn set(&mut self, name: &'static str, value: V, opts: SetOptions) -> Outcome<V> {
        if self.is_disposed() {
            return Outcome::Skipped;
        }
        let write = self.properties.set(name, value, opts);
        self.outcome(write)
    }

    pub fn set_state(&mut self, name: &'static str, on: bool, opts: SetOptions) -> Outcome<bool> {
        if self.is_disposed() {
            return Outcome::Skipped;
        }
        let write = self.states.set(name, on, opts);
        self.outcome(write)
    }

    fn outcome<T>(&mut self, write: Write<T>) -> Outcome<T> {
        match write {
            Write::Immediate(change) => Outcome::Immediate(change),
            Write::Queued if !self.flush_scheduled => {
                self.flush_scheduled = true;
                Outcome::Queued(Schedule::NextTick)
            }
            Write::Queued => Outcome::Queued(Schedule::Idle),
            Write::Defined | Write::Unchanged | Write::Silent => Outcome::Skipped,
        }
    }

    /// Run `watcher` with every net change of `name`.
    pub fn watch(&mut self, name: &'static str, watcher: impl FnMut(&Change<V>) + Send + 'static) {
        self.watchers.push((name, Box::new(watcher)));
    }

    /// Listen on this component's bus, in its own namespace.
    pub fn on(
        &mut self,
        kind: LifeEventKind,
        handler: impl FnMut(&LifeEvent<V>) -> Flow + Send + 'static,
    ) -> ListenerId {
        let ns = self.namespace();
        self.bus.on(ns, kind, handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.bus.off(id)
    }

    /// Drain the pending buffers. Clears the scheduled-flush flag.
    pub fn take_changes(&mut self) -> Changes<V> {
        self.flush_scheduled = false;
        Changes {
            properties: self.properties.take_pending(),
            states: self.states.take_pending(),
        }
    }

    /// Run watchers, then publish one event per non-empty change list.
    pub fn notify(&mut self, changes: &Changes<V>) {
        for (name, change) in &changes.properties {
            self.run_watchers(name, change);
        }
        if !changes.properties.is_empty() {
            self.bus
                .emit(&LifeEvent::PropertyChange(changes.properties.clone()));
        }
        if !changes.states.is_empty() {
            self.bus.emit(&LifeEvent::StateChange(changes.states.clone()));
        }
    }

    pub fn notify_property(&mut self, name: &'static str, change: Change<V>) {
        self.run_watchers(name, &change);
        self.bus
            .emit(&LifeEvent::PropertyChange(vec![(name, change)]));
    }

    pub fn notify_state(&mut self, name: &'static str, change: Change<bool>) {
        self.bus.emit(&LifeEvent::StateChange(vec![(name, change)]));
    }

    fn run_watchers(&mut self, name: &str, change: &Change<V>) {
        for (watched, watcher) in self.watchers.iter_mut() {
            if *watched == name {
                watcher(change);
            }
        }
    }

    /// First phase of an intercepted method. Returns the detail to carry
    /// into the method body, or `None` if the guard or a listener vetoed.
    pub fn before(&mut self, method: &'static str, guard: Guard, detail: Detail) -> Option<Detail> {
        if self.is_disposed() {
            return None;
        }
        let detail = match guard {
            Guard::Veto => {
                tracing::trace!(component = %self.id, method, "guard vetoed");
                return None;
            }
            Guard::Proceed => detail,
            Guard::Enrich(enriched) => enriched,
        };
        let event = LifeEvent::Before { method, detail };
        if self.bus.emit(&event).is_veto() {
            tracing::debug!(component = %self.id, method, "vetoed by listener");
            return None;
        }
        match event {
            LifeEvent::Before { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub fn after(&mut self, method: &'static str, detail: Detail) {
        self.bus.emit(&LifeEvent::After { method, detail });
    }

    pub fn dispatch(&mut self, name: &'static str, detail: Detail) -> Flow {
        self.bus.emit(&LifeEvent::Dispatch { name, detail })
    }

    /// Drop listeners and watchers and mark the component disposed.
    pub fn teardown(&mut self) {
        let ns = self.namespace();
        self.bus.off_namespace(ns);
        self.bus.clear();
        self.watchers.clear();
        self.phase = Phase::Disposed;
        tracing::trace!(component = %self.id, "disposed");
    }
}

/// Implemented by widgets that embed a [`Life`].
///
/// The updater hooks run first in every flush, before watchers and bus
/// listeners, so the widget's own rendering state is current when outside
/// observers look at it.
pub trait Lifecycle {
    type Value: Clone + PartialEq + Send + 'static;

    fn life(&self) -> &Life<Self::Value>;

    fn life_mut(&mut self) -> &mut Life<Self::Value>;

    /// Per-property updater.
    fn update_property(&mut self, _name: &'static str, _change: &Change<Self::Value>) {}

    /// Per-state updater.
    fn update_state(&mut self, _name: &'static str, _change: &Change<bool>) {}

    fn set_property(&mut self, name: &'static str, value: Self::Value, opts: SetOptions) -> Schedule {
        match self.life_mut().set(name, value, opts) {
            Outcome::Immediate(change) => {
                self.update_property(name, &change);
                self.life_mut().notify_property(name, change);
                Schedule::Idle
            }
            Outcome::Queued(schedule) => schedule,
            Outcome::Skipped => Schedule::Idle,
        }
    }

    fn set_state(&mut self, name: &'static str, on: bool, opts: SetOptions) -> Schedule {
        match self.life_mut().set_state(name, on, opts) {
            Outcome::Immediate(change) => {
                self.update_state(name, &change);
                self.life_mut().notify_state(name, change);
                Schedule::Idle
            }
            Outcome::Queued(schedule) => schedule,
            Outcome::Skipped => Schedule::Idle,
        }
    }

    /// Flush every pending change. A no-op once disposed.
    fn sync(&mut self) -> Changes<Self::Value> {
        if self.life().is_disposed() {
            return Changes::default();
        }
        let changes = self.life_mut().take_changes();
        if changes.is_empty() {
            return changes;
        }
        tracing::trace!(
            component = %self.life().id(),
            properties = changes.properties.len(),
            states = changes.states.len(),
            "flush"
        );
        for (name, change) in &changes.properties {
            self.update_property(name, change);
        }
        for (name, change) in &changes.states {
            self.update_state(name, change);
        }
        self.life_mut().notify(&changes);
        changes
    }

    /// Flush pending changes, then tear the lifecycle down.
    fn dispose_life(&mut self) -> Changes<Self::Value> {
        let changes = self.sync();
        self.life_mut().teardown();
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counter {
        life: Life<i64>,
        rendered: Vec<(&'static str, i64)>,
    }

    impl Counter {
        fn new() -> Self {
            let mut c = Counter::default();
            c.life.define_property("x", 1);
            c.life.define_property("y", 0);
            c.life.define_state("active", false);
            c.life.init();
            c
        }
    }

    impl Lifecycle for Counter {
        type Value = i64;

        fn life(&self) -> &Life<i64> {
            &self.life
        }

        fn life_mut(&mut self) -> &mut Life<i64> {
            &mut self.life
        }

        fn update_property(&mut self, name: &'static str, change: &Change<i64>) {
            self.rendered.push((name, change.new));
        }
    }

    fn record(c: &mut Counter) -> Arc<Mutex<Vec<LifeEvent<i64>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [LifeEventKind::PropertyChange, LifeEventKind::StateChange] {
            let sink = seen.clone();
            c.life.on(kind, move |e| {
                sink.lock().unwrap().push(e.clone());
                Flow::Continue
            });
        }
        seen
    }

    #[test]
    fn init_is_idempotent() {
        let mut life: Life<i64> = Life::new();
        assert!(life.init());
        assert!(!life.init());
        assert!(life.is_ready());
    }

    #[test]
    fn first_write_schedules_one_flush() {
        let mut c = Counter::new();
        assert_eq!(c.set_property("x", 2, SetOptions::default()), Schedule::NextTick);
        assert_eq!(c.set_property("y", 5, SetOptions::default()), Schedule::Idle);
        c.sync();
        assert_eq!(c.set_property("x", 3, SetOptions::default()), Schedule::NextTick);
    }

    #[test]
    fn round_trip_in_one_tick_emits_nothing() {
        let mut c = Counter::new();
        let seen = record(&mut c);
        let _ = c.set_property("x", 2, SetOptions::default());
        let _ = c.set_property("x", 1, SetOptions::default());
        let changes = c.sync();
        assert!(changes.is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert!(c.rendered.is_empty());
    }

    #[test]
    fn flush_runs_updater_watchers_then_bus() {
        let mut c = Counter::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let w = order.clone();
        c.life.watch("x", move |change| w.lock().unwrap().push(format!("watch {}", change.new)));
        let b = order.clone();
        c.life.on(LifeEventKind::PropertyChange, move |_| {
            b.lock().unwrap().push("bus".to_string());
            Flow::Continue
        });

        let _ = c.set_property("x", 4, SetOptions::default());
        let _ = c.set_property("y", 9, SetOptions::default());
        let changes = c.sync();

        assert_eq!(changes.property("x"), Some(&Change { old: 1, new: 4 }));
        assert_eq!(c.rendered, vec![("x", 4), ("y", 9)]);
        assert_eq!(*order.lock().unwrap(), vec!["watch 4".to_string(), "bus".to_string()]);
    }

    #[test]
    fn sync_option_notifies_immediately() {
        let mut c = Counter::new();
        let seen = record(&mut c);
        assert_eq!(c.set_property("x", 7, SetOptions::SYNC), Schedule::Idle);
        assert_eq!(c.rendered, vec![("x", 7)]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![LifeEvent::PropertyChange(vec![("x", Change { old: 1, new: 7 })])]
        );
    }

    #[test]
    fn sync_write_undoing_queued_write_is_silent() {
        let mut c = Counter::new();
        let seen = record(&mut c);
        let _ = c.set_property("x", 2, SetOptions::default());
        assert_eq!(c.set_property("x", 1, SetOptions::SYNC), Schedule::Idle);
        assert!(c.sync().is_empty());
        assert!(c.rendered.is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(c.life.property("x"), Some(&1));
    }

    #[test]
    fn states_flush_alongside_properties() {
        let mut c = Counter::new();
        let seen = record(&mut c);
        let _ = c.set_state("active", true, SetOptions::default());
        let _ = c.set_property("y", 1, SetOptions::default());
        c.sync();
        assert!(c.life.state("active"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[1], LifeEvent::StateChange(_)));
    }

    #[test]
    fn before_respects_guard_listeners_and_enrichment() {
        let mut life: Life<i64> = Life::new();
        life.init();
        assert_eq!(life.before("show", Guard::Veto, Detail::None), None);
        assert_eq!(
            life.before("show", Guard::Enrich(Detail::Index(3)), Detail::None),
            Some(Detail::Index(3))
        );
        life.on(LifeEventKind::Before("show"), |_| Flow::Veto);
        assert_eq!(life.before("show", Guard::Proceed, Detail::None), None);
        assert_eq!(
            life.before("hide", Guard::Proceed, Detail::Text("x".into())),
            Some(Detail::Text("x".into()))
        );
    }

    #[test]
    fn dispose_flushes_then_silences() {
        let mut c = Counter::new();
        let seen = record(&mut c);
        let _ = c.set_property("x", 5, SetOptions::default());
        let flushed = c.dispose_life();
        assert_eq!(flushed.property("x"), Some(&Change { old: 1, new: 5 }));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(c.life.is_disposed());

        assert_eq!(c.set_property("x", 6, SetOptions::default()), Schedule::Idle);
        assert!(c.sync().is_empty());
        assert_eq!(c.life.property("x"), Some(&5));
    }

    #[test]
    fn schedule_then_builds_next_tick() {
        let cmd: Command<u8> = Schedule::NextTick.then(1);
        assert!(!cmd.is_none());
        let cmd: Command<u8> = Schedule::Idle.then(1);
        assert!(cmd.is_none());
        assert_eq!(Schedule::Idle.and(Schedule::NextTick), Schedule::NextTick);
    }
}
