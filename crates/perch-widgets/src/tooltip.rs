//! Hover tooltips.
//!
//! A [`Tooltip`] binds one popup to any number of trigger elements. The text
//! comes from the hovered trigger's `data-title`, falling back to the
//! tooltip's `title` property; placement comes from `data-placement`, falling
//! back to the option, and flips to the opposite side when there is no room.
//! By default every tooltip on a stage shares one tip layer, so at most one
//! tip is visible at a time.
//!
//! ```rust,ignore
//! let save = stage.scene_mut().add(Element::button(rect).with_attr("data-title", "Save"));
//! let tip = Tooltip::attach(&mut stage, [save], TooltipOptions::default())?;
//! ```

use crate::mount::Widget;
use crate::popup::{Popup, Reveal};
use crate::position::{self, Placement};
use crate::stage::{SharedLayer, Stage};
use crate::trigger::{Transition, TriggerKind, TriggerSpec};
use perch_core::{
    Change, Command, ComponentId, Element, ElementId, Error, Life, Lifecycle, Scene, SetOptions,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipOptions {
    /// Text used when a trigger has no `data-title`.
    pub title: Option<String>,
    pub placement: Placement,
    pub show: TriggerSpec,
    pub hide: TriggerSpec,
    /// Use the stage's shared tip layer instead of a private one.
    pub share: bool,
    /// Widest tip, border included. Longer titles are cut.
    pub max_width: u16,
}

impl Default for TooltipOptions {
    fn default() -> Self {
        Self {
            title: None,
            placement: Placement::Top,
            show: TriggerSpec::new([TriggerKind::Over], Duration::from_millis(200)),
            hide: TriggerSpec::new([TriggerKind::Out], Duration::from_millis(200)),
            share: true,
            max_width: 40,
        }
    }
}

impl TooltipOptions {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn delays(mut self, show: Duration, hide: Duration) -> Self {
        self.show.delay = show;
        self.hide.delay = hide;
        self
    }

    pub fn share(mut self, share: bool) -> Self {
        self.share = share;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Flush pending property changes.
    Sync,
}

type Fallback = Arc<Mutex<Option<String>>>;

fn fallback(shared: &Fallback) -> Option<String> {
    shared
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// The text a tip shows for `trigger`.
fn title_for(scene: &Scene, trigger: Option<ElementId>, fallback: Option<String>) -> Option<String> {
    trigger
        .and_then(|t| scene.get(t))
        .and_then(|e| e.data("title"))
        .map(str::to_string)
        .or(fallback)
        .filter(|t| !t.trim().is_empty())
}

pub struct Tooltip {
    life: Life<String>,
    popup: ComponentId,
    layer: ElementId,
    fallback: Fallback,
    placement: Placement,
}

impl Tooltip {
    /// Attach a tooltip to `triggers`. Fails if a trigger is missing from
    /// the scene or the trigger specs use kinds a tooltip cannot honour.
    pub fn attach(
        stage: &mut Stage,
        triggers: impl IntoIterator<Item = ElementId>,
        options: TooltipOptions,
    ) -> Result<Self, Error> {
        let layer = if options.share {
            stage.shared_layer(SharedLayer::Tip)
        } else {
            stage
                .scene_mut()
                .add(Element::layer().with_attr("data-role", "tip"))
        };

        let shared: Fallback = Arc::new(Mutex::new(options.title.clone()));
        let for_guard = shared.clone();
        let for_show = shared.clone();
        let preferred = options.placement;
        let max_width = options.max_width;

        let popup = Popup::new(layer)
            .with_triggers(triggers)
            .show_on(options.show)
            .hide_on(options.hide)
            .with_guard(move |scene, reveal, transition| match transition {
                Transition::Show => title_for(scene, reveal.trigger, fallback(&for_guard)).is_some(),
                Transition::Hide => true,
            })
            .on_show(move |scene, reveal| {
                reveal_tip(scene, reveal, fallback(&for_show), preferred, max_width)
            })
            .on_hide(|scene, reveal| scene.set_visible(reveal.layer, false));
        let popup = stage.add(popup)?;

        let mut life = Life::new();
        life.define_property("title", options.title.unwrap_or_default());
        life.init();
        tracing::debug!(tooltip = %life.id(), popup = %popup, layer = %layer, "tooltip attached");
        Ok(Self {
            life,
            popup,
            layer,
            fallback: shared,
            placement: preferred,
        })
    }

    pub fn popup(&self) -> ComponentId {
        self.popup
    }

    pub fn layer(&self) -> ElementId {
        self.layer
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn title(&self) -> &str {
        self.life.property("title").map_or("", String::as_str)
    }

    /// Change the fallback title. Takes effect on the next flush.
    pub fn set_title(&mut self, title: impl Into<String>) -> Command<Message> {
        self.set_property("title", title.into(), SetOptions::default())
            .then(Message::Sync)
    }

    pub fn is_visible(&self, stage: &Stage) -> bool {
        stage.is_shown(self.popup)
    }

    /// Show the tip for `trigger` right away, ignoring delays.
    pub fn show(&self, stage: &mut Stage, trigger: ElementId) -> bool {
        stage.show(self.popup, Some(trigger))
    }

    pub fn hide(&self, stage: &mut Stage) -> bool {
        stage.hide(self.popup)
    }
}

fn reveal_tip(
    scene: &mut Scene,
    reveal: &Reveal,
    fallback: Option<String>,
    preferred: Placement,
    max_width: u16,
) {
    let Some(title) = title_for(scene, reveal.trigger, fallback) else {
        return;
    };
    let anchor = reveal
        .trigger
        .and_then(|t| scene.rect(t))
        .unwrap_or_default();
    let placement = reveal
        .trigger
        .and_then(|t| scene.get(t))
        .and_then(|e| e.data("placement"))
        .and_then(|p| p.parse().ok())
        .unwrap_or(preferred);

    let bounds = scene.bounds();
    let width = (title.width() as u16).saturating_add(2).min(max_width.max(3));
    let (rect, side) = position::place(anchor, width, 3, bounds, placement);

    scene.set_content(reveal.layer, Some(title));
    scene.set_rect(reveal.layer, rect);
    scene.set_attr(reveal.layer, "data-placement", side_name(side));
    scene.set_visible(reveal.layer, true);
    scene.raise(reveal.layer);
}

fn side_name(side: Placement) -> &'static str {
    match side {
        Placement::Top => "top",
        Placement::Bottom => "bottom",
        Placement::Left => "left",
        Placement::Right => "right",
        Placement::Auto => "auto",
    }
}

impl Lifecycle for Tooltip {
    type Value = String;

    fn life(&self) -> &Life<String> {
        &self.life
    }

    fn life_mut(&mut self) -> &mut Life<String> {
        &mut self.life
    }

    fn update_property(&mut self, name: &'static str, change: &Change<String>) {
        if name == "title" {
            let title = Some(change.new.clone()).filter(|t| !t.is_empty());
            *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = title;
        }
    }
}

impl Widget for Tooltip {
    type Message = Message;

    fn update(&mut self, _stage: &mut Stage, msg: Message) -> Command<Message> {
        match msg {
            Message::Sync => {
                self.sync();
            }
        }
        Command::none()
    }

    fn dispose(&mut self, stage: &mut Stage) -> Command<Message> {
        stage.dispose_popup(self.popup);
        self.dispose_life();
        Command::none()
    }
}
