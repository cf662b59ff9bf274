//! The popup engine.
//!
//! A [`Stage`] owns the [`Scene`] and every [`Popup`] registered on it,
//! together with the ownership record of each layer (which popup, and which
//! of its triggers, currently has it shown) and the shared layers reused by
//! tooltips and context menus. Scene events are dispatched to each popup's
//! armed listeners; delayed transitions become [`Command::timer`]s and are
//! cancelled by their breakers.
//!
//! Operations called directly (`show`, `hide`, `dispose_popup`) are
//! synchronous. The commands they produce (notices, timer cancellations)
//! collect in an outbox returned by [`Stage::drain`]; [`Component::update`]
//! drains it automatically.

use crate::popup::{Pending, Popup, Reveal};
use crate::trigger::Transition;
use perch_core::{
    BusEvent, Command, Component, ComponentId, DomEvent, Element, ElementId, Error, EventBus,
    Flow, ListenerId, Namespace, Scene, TerminalEvent, TimerId,
};
use ratatui::layout::{Position, Rect};
use ratatui::widgets::{Block, Clear, Paragraph};
use ratatui::Frame;
use std::collections::{BTreeMap, HashMap};

/// Which popup, shown from which trigger, currently owns a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub popup: ComponentId,
    pub trigger: Option<ElementId>,
}

/// Layers shared between all widgets of one kind on a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedLayer {
    Tip,
    Menu,
}

impl SharedLayer {
    fn name(self) -> &'static str {
        match self {
            SharedLayer::Tip => "tip",
            SharedLayer::Menu => "menu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupEventKind {
    /// Cancelable.
    BeforeShow,
    AfterShow,
    /// Cancelable.
    BeforeHide,
    AfterHide,
}

/// Snapshot published around every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupEvent {
    pub kind: PopupEventKind,
    pub popup: ComponentId,
    pub layer: ElementId,
    pub trigger: Option<ElementId>,
    pub pointer: Option<Position>,
    /// The element holding keyboard focus.
    pub focus: Option<ElementId>,
    /// Whether focus sits inside the layer. Lets a hook keep a layer open
    /// while the user types into one of its inputs.
    pub focus_in_layer: bool,
}

impl BusEvent for PopupEvent {
    type Kind = PopupEventKind;

    fn kind(&self) -> PopupEventKind {
        self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Terminal(TerminalEvent),
    /// A scene event, for synthetic input.
    Dom(DomEvent),
    DelayElapsed {
        popup: ComponentId,
        timer: TimerId,
    },
    /// Notice for the parent: a popup was shown.
    Shown {
        popup: ComponentId,
        trigger: Option<ElementId>,
    },
    /// Notice for the parent: a popup was hidden.
    Hidden { popup: ComponentId },
}

pub struct Stage {
    scene: Scene,
    popups: BTreeMap<ComponentId, Popup>,
    owners: HashMap<ElementId, Owner>,
    shared: HashMap<SharedLayer, ElementId>,
    bus: EventBus<PopupEvent>,
    outbox: Vec<Command<Message>>,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("popups", &self.popups.len())
            .field("owners", &self.owners)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

impl Stage {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            popups: BTreeMap::new(),
            owners: HashMap::new(),
            shared: HashMap::new(),
            bus: EventBus::new(),
            outbox: Vec::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Register a popup. Fails if its layer or a trigger is not in the
    /// scene, or a trigger kind cannot drive the transition it is set for.
    pub fn add(&mut self, mut popup: Popup) -> Result<ComponentId, Error> {
        self.scene.require(popup.layer)?;
        for trigger in &popup.triggers {
            self.scene.require(*trigger)?;
        }
        popup.show.validate(Transition::Show)?;
        popup.hide.validate(Transition::Hide)?;
        popup.arm_show();

        let id = popup.id;
        tracing::debug!(
            popup = %id,
            layer = %popup.layer,
            show = %popup.show.kinds,
            hide = %popup.hide.kinds,
            "popup added"
        );
        self.popups.insert(id, popup);
        Ok(id)
    }

    pub fn popup(&self, id: ComponentId) -> Option<&Popup> {
        self.popups.get(&id)
    }

    pub fn len(&self) -> usize {
        self.popups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }

    pub fn owner(&self, layer: ElementId) -> Option<Owner> {
        self.owners.get(&layer).copied()
    }

    /// Whether `id` owns its layer and the layer is visible.
    pub fn is_shown(&self, id: ComponentId) -> bool {
        self.popups.get(&id).is_some_and(|p| {
            self.scene.is_visible(p.layer)
                && self.owners.get(&p.layer).is_some_and(|o| o.popup == id)
        })
    }

    /// The trigger `id` is currently shown from.
    pub fn active_trigger(&self, id: ComponentId) -> Option<ElementId> {
        let layer = self.popups.get(&id)?.layer;
        self.owners
            .get(&layer)
            .filter(|o| o.popup == id)
            .and_then(|o| o.trigger)
    }

    /// Whether `id` has a delayed transition waiting.
    pub fn is_pending(&self, id: ComponentId) -> bool {
        self.popups.get(&id).is_some_and(|p| p.pending.is_some())
    }

    /// The shared layer of `kind`, created on first use.
    pub fn shared_layer(&mut self, kind: SharedLayer) -> ElementId {
        if let Some(layer) = self.shared.get(&kind).filter(|l| self.scene.get(**l).is_some()) {
            return *layer;
        }
        let layer = self
            .scene
            .add(Element::layer().with_attr("data-shared", kind.name()));
        self.shared.insert(kind, layer);
        layer
    }

    /// Hook `kind` events of one popup. Removed when the popup is disposed.
    pub fn on(
        &mut self,
        popup: ComponentId,
        kind: PopupEventKind,
        mut handler: impl FnMut(&PopupEvent) -> Flow + Send + 'static,
    ) -> ListenerId {
        self.bus.on(popup.namespace(), kind, move |event| {
            if event.popup == popup {
                handler(event)
            } else {
                Flow::Continue
            }
        })
    }

    /// Hook `kind` events of every popup under `namespace`.
    pub fn observe(
        &mut self,
        namespace: Namespace,
        kind: PopupEventKind,
        handler: impl FnMut(&PopupEvent) -> Flow + Send + 'static,
    ) -> ListenerId {
        self.bus.on(namespace, kind, handler)
    }

    pub fn off(&mut self, listener: ListenerId) -> bool {
        self.bus.off(listener)
    }

    pub fn off_namespace(&mut self, namespace: Namespace) -> usize {
        self.bus.off_namespace(namespace)
    }

    fn event(&self, kind: PopupEventKind, reveal: &Reveal) -> PopupEvent {
        let focus = self.scene.focused();
        PopupEvent {
            kind,
            popup: reveal.popup,
            layer: reveal.layer,
            trigger: reveal.trigger,
            pointer: reveal.pointer,
            focus,
            focus_in_layer: focus.is_some_and(|f| self.scene.contains(reveal.layer, f)),
        }
    }

    /// Show `id` on behalf of `trigger`.
    ///
    /// A no-op when it is already shown from the same trigger. If another
    /// popup (or this one from another trigger) owns the layer, that owner is
    /// hidden first; if that hide is vetoed the show is abandoned. Returns
    /// whether the popup was shown.
    pub fn show(&mut self, id: ComponentId, trigger: Option<ElementId>) -> bool {
        let Some(layer) = self.popups.get(&id).map(|p| p.layer) else {
            return false;
        };
        if let Some(owner) = self.owner(layer) {
            if !self.scene.is_visible(layer) {
                self.release(layer, owner.popup);
            } else if owner.popup == id && owner.trigger == trigger {
                tracing::trace!(popup = %id, "already shown");
                return false;
            } else if !self.hide(owner.popup) {
                tracing::debug!(popup = %id, owner = %owner.popup, "show abandoned, owner stayed");
                return false;
            }
        }

        let reveal = Reveal {
            popup: id,
            layer,
            trigger,
            pointer: self.scene.pointer(),
        };
        let allowed = self
            .popups
            .get(&id)
            .is_some_and(|p| p.allows(&self.scene, &reveal, Transition::Show));
        if !allowed {
            tracing::trace!(popup = %id, "show refused by guard");
            return false;
        }
        if self.bus.emit(&self.event(PopupEventKind::BeforeShow, &reveal)).is_veto() {
            tracing::debug!(popup = %id, "show vetoed");
            return false;
        }

        self.cancel_pending(id);
        self.owners.insert(layer, Owner { popup: id, trigger });
        if let Some(popup) = self.popups.get_mut(&id) {
            match popup.on_show.as_mut() {
                Some(effect) => effect(&mut self.scene, &reveal),
                None => self.scene.set_visible(layer, true),
            }
            popup.arm_hide(trigger);
        }
        tracing::debug!(popup = %id, layer = %layer, trigger = ?trigger, "shown");
        self.bus.emit(&self.event(PopupEventKind::AfterShow, &reveal));
        self.outbox
            .push(Command::message(Message::Shown { popup: id, trigger }));
        true
    }

    /// Hide `id`. A no-op unless it owns a visible layer. Returns whether
    /// the popup was hidden.
    pub fn hide(&mut self, id: ComponentId) -> bool {
        self.hide_inner(id, false)
    }

    /// Show when hidden, hide when shown.
    pub fn toggle(&mut self, id: ComponentId, trigger: Option<ElementId>) -> bool {
        if self.is_shown(id) {
            self.hide(id)
        } else {
            self.show(id, trigger)
        }
    }

    fn hide_inner(&mut self, id: ComponentId, force: bool) -> bool {
        let Some(layer) = self.popups.get(&id).map(|p| p.layer) else {
            return false;
        };
        let Some(owner) = self.owner(layer).filter(|o| o.popup == id) else {
            return false;
        };
        if !self.scene.is_visible(layer) {
            self.release(layer, id);
            return false;
        }

        let reveal = Reveal {
            popup: id,
            layer,
            trigger: owner.trigger,
            pointer: self.scene.pointer(),
        };
        if !force {
            let allowed = self
                .popups
                .get(&id)
                .is_some_and(|p| p.allows(&self.scene, &reveal, Transition::Hide));
            if !allowed {
                tracing::trace!(popup = %id, "hide refused by guard");
                return false;
            }
            if self.bus.emit(&self.event(PopupEventKind::BeforeHide, &reveal)).is_veto() {
                tracing::debug!(popup = %id, "hide vetoed");
                return false;
            }
        }

        self.cancel_pending(id);
        if let Some(popup) = self.popups.get_mut(&id) {
            match popup.on_hide.as_mut() {
                Some(effect) => effect(&mut self.scene, &reveal),
                None => self.scene.set_visible(layer, false),
            }
        }
        self.release(layer, id);
        tracing::debug!(popup = %id, layer = %layer, forced = force, "hidden");
        self.bus.emit(&self.event(PopupEventKind::AfterHide, &reveal));
        self.outbox.push(Command::message(Message::Hidden { popup: id }));
        true
    }

    /// Drop the ownership record and go back to listening for show triggers.
    fn release(&mut self, layer: ElementId, id: ComponentId) {
        self.owners.remove(&layer);
        if let Some(popup) = self.popups.get_mut(&id) {
            popup.arm_show();
        }
    }

    fn cancel_pending(&mut self, id: ComponentId) {
        if let Some(pending) = self.popups.get_mut(&id).and_then(|p| p.pending.take()) {
            tracing::trace!(popup = %id, timer = pending.timer.get(), "pending delay cancelled");
            self.outbox.push(Command::cancel_timer(pending.timer));
        }
    }

    /// Force-hide `id`, cancel its pending delay, drop its hooks and forget
    /// it. Returns whether it existed.
    pub fn dispose_popup(&mut self, id: ComponentId) -> bool {
        if !self.popups.contains_key(&id) {
            return false;
        }
        self.cancel_pending(id);
        self.hide_inner(id, true);
        self.bus.off_namespace(id.namespace());
        self.popups.remove(&id);
        tracing::debug!(popup = %id, "popup disposed");
        true
    }

    /// Translate terminal input into scene events and dispatch them.
    /// Returns the events so the caller can route them to other widgets.
    pub fn feed(&mut self, input: &TerminalEvent) -> Vec<DomEvent> {
        let events = self.scene.translate(input);
        for event in &events {
            self.dispatch(event);
        }
        events
    }

    /// Run one scene event past every popup: breakers of pending delays
    /// first, then armed trigger listeners.
    pub fn dispatch(&mut self, event: &DomEvent) {
        let ids: Vec<ComponentId> = self.popups.keys().copied().collect();
        for id in ids {
            let Some(popup) = self.popups.get_mut(&id) else {
                continue;
            };
            if let Some(pending) = popup.pending {
                if !pending.broken_by(event, &self.scene, popup) {
                    continue;
                }
                popup.pending = None;
                tracing::trace!(popup = %id, kind = ?event.kind, "pending delay broken");
                self.outbox.push(Command::cancel_timer(pending.timer));
            }

            let Some((armed, cause)) = popup.fired(event, &self.scene) else {
                continue;
            };
            let delay = popup.spec(armed.transition).delay_for(armed.kind);
            if delay.is_zero() {
                self.transition(id, armed.transition, cause);
                continue;
            }
            let timer = TimerId::next();
            popup.pending = Some(Pending {
                timer,
                transition: armed.transition,
                kind: armed.kind,
                trigger: cause,
            });
            tracing::trace!(
                popup = %id,
                transition = armed.transition.name(),
                kind = %armed.kind,
                delay_ms = delay.as_millis() as u64,
                "delay started"
            );
            self.outbox.push(Command::timer(
                timer,
                delay,
                Message::DelayElapsed { popup: id, timer },
            ));
        }
    }

    /// A delay timer fired. Deliveries for cancelled or superseded delays
    /// are ignored.
    pub fn elapse(&mut self, id: ComponentId, timer: TimerId) {
        let due = self
            .popups
            .get_mut(&id)
            .and_then(|p| p.pending.take_if(|pending| pending.timer == timer));
        match due {
            Some(pending) => self.transition(id, pending.transition, pending.trigger),
            None => tracing::trace!(popup = %id, timer = timer.get(), "stale delay ignored"),
        }
    }

    fn transition(&mut self, id: ComponentId, transition: Transition, trigger: Option<ElementId>) {
        match transition {
            Transition::Show => {
                self.show(id, trigger);
            }
            Transition::Hide => {
                self.hide(id);
            }
        }
    }

    /// Everything produced since the last drain.
    pub fn drain(&mut self) -> Command<Message> {
        Command::batch(std::mem::take(&mut self.outbox))
    }

    /// Draw every visible layer that has text content, clipped to `area`.
    pub fn render_layers(&self, frame: &mut Frame, area: Rect) {
        for element in self.scene.stacked() {
            let Some(content) = element.content() else {
                continue;
            };
            if !element.is_visible() || element.role() != perch_core::Role::Layer {
                continue;
            }
            let rect = element.rect().intersection(area);
            if rect.is_empty() {
                continue;
            }
            frame.render_widget(Clear, rect);
            frame.render_widget(Paragraph::new(content).block(Block::bordered()), rect);
        }
    }
}

impl Component for Stage {
    type Message = Message;

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Terminal(input) => {
                self.feed(&input);
            }
            Message::Dom(event) => self.dispatch(&event),
            Message::DelayElapsed { popup, timer } => self.elapse(popup, timer),
            Message::Shown { .. } | Message::Hidden { .. } => {}
        }
        self.drain()
    }

    fn view(&self, frame: &mut Frame, area: Rect) {
        self.render_layers(frame, area);
    }

    /// Dispose every popup.
    fn dispose(&mut self) -> Command<Message> {
        let ids: Vec<ComponentId> = self.popups.keys().copied().collect();
        for id in ids {
            self.dispose_popup(id);
        }
        self.drain()
    }
}
