//! One show/hide-able layer bound to zero or more trigger elements.
//!
//! A [`Popup`] is a description handed to [`Stage::add`](crate::stage::Stage::add):
//! which elements trigger it, which layer it reveals, how each transition is
//! triggered and what showing and hiding actually do. The stage owns it from
//! then on and keeps its runtime bookkeeping here: the armed listener table
//! and the pending delay.

use crate::trigger::{Transition, TriggerKind, TriggerSpec};
use perch_core::{ComponentId, DomEvent, DomEventKind, ElementId, Scene, TimerId};
use ratatui::layout::Position;
use std::fmt;

/// Context handed to show/hide effects and guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    pub popup: ComponentId,
    pub layer: ElementId,
    /// The element that caused the transition, if any.
    pub trigger: Option<ElementId>,
    pub pointer: Option<Position>,
}

/// What a transition does to the scene.
pub type Effect = Box<dyn FnMut(&mut Scene, &Reveal) + Send>;

/// Popup-specific precondition for a transition.
pub type PopupGuard = Box<dyn Fn(&Scene, &Reveal, Transition) -> bool + Send>;

/// Where an armed listener listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Trigger(ElementId),
    /// The active trigger (if any) together with the layer.
    Owner(Option<ElementId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Armed {
    pub transition: Transition,
    pub kind: TriggerKind,
    pub target: Target,
}

impl Armed {
    /// Whether `event` fires this listener. Returns the causing element.
    pub(crate) fn fires(&self, event: &DomEvent, scene: &Scene, layer: ElementId) -> Option<Option<ElementId>> {
        use DomEventKind as K;
        match (self.transition, self.kind, self.target) {
            (Transition::Show, TriggerKind::Click, Target::Trigger(t)) => {
                (event.kind == K::Click && event.on(t)).then_some(Some(t))
            }
            (Transition::Show, TriggerKind::Over, Target::Trigger(t)) => {
                (event.kind == K::PointerEnter && event.target == Some(t)).then_some(Some(t))
            }
            (Transition::Show, TriggerKind::Context, Target::Trigger(t)) => {
                (event.kind == K::ContextMenu && event.on(t)).then_some(Some(t))
            }
            (Transition::Hide, TriggerKind::Click, Target::Trigger(t)) => {
                (event.kind == K::Click && event.on(t)).then_some(Some(t))
            }
            (Transition::Hide, TriggerKind::Out, Target::Owner(trigger)) => {
                let left = event.kind == K::PointerLeave
                    && event.target.is_some_and(|t| {
                        Some(t) == trigger || scene.contains(layer, t)
                    });
                let outside = !scene.pointer_within(layer)
                    && trigger.is_none_or(|t| !scene.pointer_within(t));
                (left && outside).then_some(trigger)
            }
            (Transition::Hide, TriggerKind::Blur, Target::Owner(trigger)) => {
                let outside = event.kind == K::Click
                    && !event.on(layer)
                    && trigger.is_none_or(|t| !event.on(t));
                outside.then_some(trigger)
            }
            _ => None,
        }
    }
}

/// A pending delayed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pending {
    pub timer: TimerId,
    pub transition: Transition,
    pub kind: TriggerKind,
    pub trigger: Option<ElementId>,
}

impl Pending {
    /// Whether `event` cancels this pending transition.
    pub(crate) fn broken_by(&self, event: &DomEvent, scene: &Scene, popup: &Popup) -> bool {
        use DomEventKind as K;
        let layer = popup.layer;
        match (self.transition, self.kind) {
            (Transition::Show, TriggerKind::Click) => {
                event.kind == K::Click && self.trigger.is_none_or(|t| !event.on(t))
            }
            (Transition::Show, TriggerKind::Over | TriggerKind::Context) => {
                event.kind == K::PointerLeave && event.target.is_some() && event.target == self.trigger
            }
            (Transition::Hide, TriggerKind::Click) => event.kind == K::Click && event.on(layer),
            (Transition::Hide, TriggerKind::Out) => {
                event.kind == K::PointerEnter
                    && event
                        .target
                        .is_some_and(|t| popup.triggers.contains(&t) || scene.contains(layer, t))
            }
            _ => false,
        }
    }
}

/// Description of a popup plus the stage's bookkeeping for it.
///
/// ```rust,ignore
/// let popup = Popup::new(layer)
///     .with_trigger(button)
///     .show_on(TriggerSpec::parse("click", Duration::ZERO)?)
///     .hide_on(TriggerSpec::parse("click,blur", Duration::ZERO)?);
/// let id = stage.add(popup)?;
/// ```
pub struct Popup {
    pub(crate) id: ComponentId,
    pub(crate) triggers: Vec<ElementId>,
    pub(crate) layer: ElementId,
    pub(crate) show: TriggerSpec,
    pub(crate) hide: TriggerSpec,
    pub(crate) on_show: Option<Effect>,
    pub(crate) on_hide: Option<Effect>,
    pub(crate) guard: Option<PopupGuard>,
    pub(crate) armed: Vec<Armed>,
    pub(crate) pending: Option<Pending>,
}

impl fmt::Debug for Popup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Popup")
            .field("id", &self.id)
            .field("triggers", &self.triggers)
            .field("layer", &self.layer)
            .field("show", &self.show)
            .field("hide", &self.hide)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Popup {
    /// A popup over `layer`, shown and hidden only by direct calls until
    /// triggers are configured.
    pub fn new(layer: ElementId) -> Self {
        Self {
            id: ComponentId::next(),
            triggers: Vec::new(),
            layer,
            show: TriggerSpec::manual(),
            hide: TriggerSpec::manual(),
            on_show: None,
            on_hide: None,
            guard: None,
            armed: Vec::new(),
            pending: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn layer(&self) -> ElementId {
        self.layer
    }

    pub fn triggers(&self) -> &[ElementId] {
        &self.triggers
    }

    pub fn with_trigger(mut self, trigger: ElementId) -> Self {
        if !self.triggers.contains(&trigger) {
            self.triggers.push(trigger);
        }
        self
    }

    pub fn with_triggers(self, triggers: impl IntoIterator<Item = ElementId>) -> Self {
        triggers.into_iter().fold(self, Popup::with_trigger)
    }

    pub fn show_on(mut self, spec: TriggerSpec) -> Self {
        self.show = spec;
        self
    }

    pub fn hide_on(mut self, spec: TriggerSpec) -> Self {
        self.hide = spec;
        self
    }

    /// Replace the default show effect (make the layer visible).
    pub fn on_show(mut self, effect: impl FnMut(&mut Scene, &Reveal) + Send + 'static) -> Self {
        self.on_show = Some(Box::new(effect));
        self
    }

    /// Replace the default hide effect (make the layer invisible).
    pub fn on_hide(mut self, effect: impl FnMut(&mut Scene, &Reveal) + Send + 'static) -> Self {
        self.on_hide = Some(Box::new(effect));
        self
    }

    pub fn with_guard(
        mut self,
        guard: impl Fn(&Scene, &Reveal, Transition) -> bool + Send + 'static,
    ) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    pub(crate) fn allows(&self, scene: &Scene, reveal: &Reveal, transition: Transition) -> bool {
        self.guard
            .as_ref()
            .is_none_or(|guard| guard(scene, reveal, transition))
    }

    pub(crate) fn spec(&self, transition: Transition) -> &TriggerSpec {
        match transition {
            Transition::Show => &self.show,
            Transition::Hide => &self.hide,
        }
    }

    /// Listeners while hidden: show triggers on every trigger element.
    pub(crate) fn arm_show(&mut self) {
        self.armed = self
            .show
            .kinds
            .iter()
            .flat_map(|kind| {
                self.triggers.iter().map(move |t| Armed {
                    transition: Transition::Show,
                    kind,
                    target: Target::Trigger(*t),
                })
            })
            .collect();
    }

    /// Listeners while shown from `active`: hide triggers, plus show
    /// triggers on the other trigger elements so the popup can move.
    pub(crate) fn arm_hide(&mut self, active: Option<ElementId>) {
        self.arm_show();
        if let Some(active) = active {
            self.armed.retain(|a| a.target != Target::Trigger(active));
        }
        for kind in self.hide.kinds.iter() {
            let target = match kind {
                TriggerKind::Click => match active {
                    Some(t) => Target::Trigger(t),
                    None => continue,
                },
                _ => Target::Owner(active),
            };
            self.armed.push(Armed {
                transition: Transition::Hide,
                kind,
                target,
            });
        }
    }

    /// The first armed listener `event` fires.
    pub(crate) fn fired(&self, event: &DomEvent, scene: &Scene) -> Option<(Armed, Option<ElementId>)> {
        self.armed
            .iter()
            .find_map(|a| a.fires(event, scene, self.layer).map(|cause| (*a, cause)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::Element;
    use ratatui::layout::Rect;

    #[test]
    fn builder_dedupes_triggers() {
        let mut scene = Scene::new(Rect::new(0, 0, 40, 10));
        let a = scene.add(Element::region(Rect::new(0, 0, 4, 1)));
        let layer = scene.add(Element::layer());
        let popup = Popup::new(layer).with_triggers([a, a]);
        assert_eq!(popup.triggers(), &[a]);
        assert_eq!(popup.layer(), layer);
    }
}
