//! Widgets that live on a [`Stage`].
//!
//! Popup-based widgets do not own the scene: they attach popups to a stage
//! the application owns and react to the scene events the stage produces. The
//! [`Widget`] trait is the seam between the two. An application holding
//! several widgets feeds terminal input to its stage and hands every returned
//! [`DomEvent`] to each widget; [`Mounted`] does exactly that for a single
//! widget and is itself a [`Component`].

use crate::stage::{self, Stage};
use perch_core::{Command, Component, ComponentId, DomEvent, Subscription};
use ratatui::layout::Rect;
use ratatui::Frame;

/// A widget attached to a [`Stage`].
pub trait Widget: Send + 'static {
    type Message: Send + 'static;

    /// A scene event, delivered after the stage ran it past its popups.
    fn handle(&mut self, _stage: &mut Stage, _event: &DomEvent) -> Command<Self::Message> {
        Command::none()
    }

    /// A popup on the stage was shown or hidden.
    fn popup_changed(
        &mut self,
        _stage: &mut Stage,
        _popup: ComponentId,
        _shown: bool,
    ) -> Command<Self::Message> {
        Command::none()
    }

    fn update(&mut self, stage: &mut Stage, msg: Self::Message) -> Command<Self::Message>;

    /// Draw whatever the stage's default layer rendering does not cover.
    fn view(&self, _stage: &Stage, _frame: &mut Frame, _area: Rect) {}

    fn subscriptions(&self) -> Vec<Subscription<Self::Message>> {
        vec![]
    }

    /// Detach from the stage: dispose popups, flush pending changes.
    fn dispose(&mut self, _stage: &mut Stage) -> Command<Self::Message> {
        Command::none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message<M> {
    Stage(stage::Message),
    Widget(M),
}

/// A stage with one widget on it.
pub struct Mounted<W> {
    stage: Stage,
    widget: W,
}

impl<W: Widget> Mounted<W> {
    pub fn new(stage: Stage, widget: W) -> Self {
        Self { stage, widget }
    }

    /// Build the widget against the stage, e.g. `Mounted::attach(stage, |s| Tooltip::attach(s, ..))`.
    pub fn attach<E>(
        mut stage: Stage,
        build: impl FnOnce(&mut Stage) -> Result<W, E>,
    ) -> Result<Self, E> {
        let widget = build(&mut stage)?;
        Ok(Self { stage, widget })
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    /// Call a widget method that needs the stage.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut W, &mut Stage) -> R) -> R {
        f(&mut self.widget, &mut self.stage)
    }

    fn settle(&mut self, mut cmds: Vec<Command<Message<W::Message>>>) -> Command<Message<W::Message>> {
        cmds.push(self.stage.drain().map(Message::Stage));
        Command::batch(cmds)
    }
}

impl<W: Widget> Component for Mounted<W> {
    type Message = Message<W::Message>;

    fn update(&mut self, msg: Self::Message) -> Command<Self::Message> {
        let mut cmds = Vec::new();
        match msg {
            Message::Stage(stage::Message::Terminal(input)) => {
                for event in self.stage.feed(&input) {
                    cmds.push(self.widget.handle(&mut self.stage, &event).map(Message::Widget));
                }
            }
            Message::Stage(stage::Message::Dom(event)) => {
                self.stage.dispatch(&event);
                cmds.push(self.widget.handle(&mut self.stage, &event).map(Message::Widget));
            }
            Message::Stage(stage::Message::Shown { popup, .. }) => {
                cmds.push(
                    self.widget
                        .popup_changed(&mut self.stage, popup, true)
                        .map(Message::Widget),
                );
            }
            Message::Stage(stage::Message::Hidden { popup }) => {
                cmds.push(
                    self.widget
                        .popup_changed(&mut self.stage, popup, false)
                        .map(Message::Widget),
                );
            }
            Message::Stage(msg) => {
                cmds.push(self.stage.update(msg).map(Message::Stage));
            }
            Message::Widget(msg) => {
                cmds.push(self.widget.update(&mut self.stage, msg).map(Message::Widget));
            }
        }
        self.settle(cmds)
    }

    fn view(&self, frame: &mut Frame, area: Rect) {
        self.widget.view(&self.stage, frame, area);
        self.stage.render_layers(frame, area);
    }

    fn subscriptions(&self) -> Vec<Subscription<Self::Message>> {
        self.widget
            .subscriptions()
            .into_iter()
            .map(|s| s.map(Message::Widget))
            .collect()
    }

    fn dispose(&mut self) -> Command<Self::Message> {
        let widget = self.widget.dispose(&mut self.stage).map(Message::Widget);
        let stage = Component::dispose(&mut self.stage).map(Message::Stage);
        Command::batch([widget, stage])
    }
}
