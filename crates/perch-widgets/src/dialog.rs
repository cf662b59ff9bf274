//! Centered modal dialog with a title, a body and action buttons.
//!
//! The dialog is a popup over its own layer. `show` and `hide` go through
//! the before/after convention on the dialog's [`Life`], so listeners can
//! veto either. While shown, the dialog captures the keyboard: Esc closes,
//! Left/Right/Tab move between actions, Enter picks the focused one and
//! shortcut letters pick theirs. The title row is a drag handle.

use crate::draggable::{self, Draggable};
use crate::iterator::Cursor;
use crate::mount::Widget;
use crate::popup::Popup;
use crate::position;
use crate::stage::Stage;
use crate::trigger::{TriggerKind, TriggerSpec};
use crossterm::event::{KeyCode, KeyModifiers};
use perch_core::{
    Command, ComponentId, Detail, DomEvent, DomEventKind, Element, ElementId, Error, Guard, Life,
    Lifecycle, SetOptions,
};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use ratatui::Frame;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// A button in the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    /// Picks the action when typed while the dialog is shown.
    pub shortcut: Option<char>,
}

impl Action {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            shortcut: None,
        }
    }

    pub fn with_shortcut(mut self, key: char) -> Self {
        self.shortcut = Some(key.to_ascii_lowercase());
        self
    }

    fn text(&self) -> String {
        match self.shortcut {
            Some(key) => format!("[{key}] {}", self.label),
            None => self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogOptions {
    pub title: String,
    pub body: String,
    pub actions: Vec<Action>,
    pub width: u16,
    pub height: u16,
    pub draggable: bool,
    pub close_on_escape: bool,
    /// Hide after an action is picked.
    pub hide_on_action: bool,
    /// Move back to the centre every time it is shown.
    pub recenter: bool,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            body: String::new(),
            actions: Vec::new(),
            width: 40,
            height: 9,
            draggable: true,
            close_on_escape: true,
            hide_on_action: true,
            recenter: false,
        }
    }
}

impl DialogOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Sync,
    /// Notice: the action at this index was picked.
    Selected(usize),
    /// Notice: closed without picking an action.
    Dismissed,
    /// Notice: dragged to a new place.
    Moved(Rect),
}

pub struct Dialog {
    life: Life<String>,
    popup: ComponentId,
    layer: ElementId,
    title_bar: ElementId,
    buttons: Vec<ElementId>,
    actions: Vec<Action>,
    focus: Cursor,
    drag: Draggable,
    options: DialogOptions,
}

impl Dialog {
    /// Create the dialog's layer and elements. `triggers` open it on click.
    pub fn attach(
        stage: &mut Stage,
        triggers: impl IntoIterator<Item = ElementId>,
        options: DialogOptions,
    ) -> Result<Self, Error> {
        let scene = stage.scene_mut();
        let rect = position::centered_fixed(options.width, options.height, scene.bounds());
        let layer = scene.add(Element::layer().with_attr("data-role", "dialog"));
        scene.set_rect(layer, rect);
        let title_bar = scene.add(
            Element::region(Rect::new(rect.x, rect.y, rect.width, 1)).with_parent(layer),
        );
        let buttons = layout_buttons(rect, &options.actions)
            .into_iter()
            .map(|r| scene.add(Element::button(r).with_parent(layer)))
            .collect();

        let popup = Popup::new(layer)
            .with_triggers(triggers)
            .show_on(TriggerSpec::new([TriggerKind::Click], Duration::ZERO));
        let popup = stage.add(popup)?;

        let mut life = Life::new();
        life.define_property("title", options.title.clone());
        life.define_property("body", options.body.clone());
        life.define_state("visible", false);
        life.init();

        let mut drag = Draggable::new(layer, title_bar);
        drag.set_enabled(options.draggable);
        tracing::debug!(dialog = %life.id(), layer = %layer, "dialog attached");
        Ok(Self {
            life,
            popup,
            layer,
            title_bar,
            buttons,
            focus: Cursor::looping(options.actions.len()),
            actions: options.actions.clone(),
            drag,
            options,
        })
    }

    pub fn layer(&self) -> ElementId {
        self.layer
    }

    pub fn popup(&self) -> ComponentId {
        self.popup
    }

    pub fn title_bar(&self) -> ElementId {
        self.title_bar
    }

    /// The button element of each action, in order.
    pub fn buttons(&self) -> &[ElementId] {
        &self.buttons
    }

    pub fn focused_action(&self) -> usize {
        self.focus.index()
    }

    pub fn is_visible(&self, stage: &Stage) -> bool {
        stage.is_shown(self.popup)
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Command<Message> {
        self.set_property("title", title.into(), SetOptions::default())
            .then(Message::Sync)
    }

    pub fn set_body(&mut self, body: impl Into<String>) -> Command<Message> {
        self.set_property("body", body.into(), SetOptions::default())
            .then(Message::Sync)
    }

    /// Show the dialog unless a `Before("show")` listener vetoes.
    pub fn show(&mut self, stage: &mut Stage) -> bool {
        let Some(detail) = self.life.before("show", Guard::Proceed, Detail::None) else {
            return false;
        };
        if self.options.recenter {
            self.recenter(stage);
        }
        if !stage.show(self.popup, None) {
            return false;
        }
        self.opened(stage, detail);
        true
    }

    /// Hide the dialog unless a `Before("hide")` listener vetoes.
    pub fn hide(&mut self, stage: &mut Stage) -> bool {
        if !self.is_visible(stage) {
            return false;
        }
        let Some(detail) = self.life.before("hide", Guard::Proceed, Detail::None) else {
            return false;
        };
        if !stage.hide(self.popup) {
            return false;
        }
        let _ = self.set_state("visible", false, SetOptions::SYNC);
        self.life.after("hide", detail);
        true
    }

    fn opened(&mut self, stage: &mut Stage, detail: Detail) {
        stage.scene_mut().raise(self.layer);
        self.focus.first();
        let _ = self.set_state("visible", true, SetOptions::SYNC);
        self.life.after("show", detail);
    }

    fn recenter(&self, stage: &mut Stage) {
        let scene = stage.scene_mut();
        let Some(from) = scene.rect(self.layer) else {
            return;
        };
        let to = position::centered_fixed(from.width, from.height, scene.bounds());
        draggable::move_tree(
            scene,
            self.layer,
            to.x as i32 - from.x as i32,
            to.y as i32 - from.y as i32,
        );
    }

    fn pick(&mut self, stage: &mut Stage, index: usize) -> Command<Message> {
        tracing::debug!(dialog = %self.life.id(), index, "action picked");
        if self.options.hide_on_action {
            self.hide(stage);
        }
        Command::message(Message::Selected(index))
    }

    fn key(&mut self, stage: &mut Stage, code: KeyCode, modifiers: KeyModifiers) -> Command<Message> {
        match code {
            KeyCode::Esc if self.options.close_on_escape => {
                if self.hide(stage) {
                    Command::message(Message::Dismissed)
                } else {
                    Command::none()
                }
            }
            KeyCode::Left | KeyCode::BackTab => {
                self.focus.prev();
                Command::none()
            }
            KeyCode::Right | KeyCode::Tab => {
                self.focus.next();
                Command::none()
            }
            KeyCode::Enter if !self.actions.is_empty() => self.pick(stage, self.focus.index()),
            KeyCode::Char(c) if modifiers.difference(KeyModifiers::SHIFT).is_empty() => {
                let c = c.to_ascii_lowercase();
                match self.actions.iter().position(|a| a.shortcut == Some(c)) {
                    Some(index) => self.pick(stage, index),
                    None => Command::none(),
                }
            }
            _ => Command::none(),
        }
    }
}

/// Button rectangles on the second-to-last row of `rect`, centred as a
/// group with two columns between buttons.
fn layout_buttons(rect: Rect, actions: &[Action]) -> Vec<Rect> {
    let widths: Vec<u16> = actions
        .iter()
        .map(|a| u16::try_from(a.text().width()).unwrap_or(u16::MAX).saturating_add(2))
        .collect();
    let gaps = u16::try_from(widths.len().saturating_sub(1)).unwrap_or(u16::MAX);
    let total = widths
        .iter()
        .fold(gaps.saturating_mul(2), |sum, w| sum.saturating_add(*w));
    let y = rect.bottom().saturating_sub(2);
    let mut x = rect.x + rect.width.saturating_sub(total) / 2;
    widths
        .into_iter()
        .map(|w| {
            let r = Rect::new(x, y, w, 1);
            x = x.saturating_add(w).saturating_add(2);
            r
        })
        .collect()
}

impl Lifecycle for Dialog {
    type Value = String;

    fn life(&self) -> &Life<String> {
        &self.life
    }

    fn life_mut(&mut self) -> &mut Life<String> {
        &mut self.life
    }
}

impl Widget for Dialog {
    type Message = Message;

    fn handle(&mut self, stage: &mut Stage, event: &DomEvent) -> Command<Message> {
        if !self.is_visible(stage) {
            return Command::none();
        }
        if let Some(draggable::Message::Moved { rect }) = self.drag.track(stage.scene_mut(), event) {
            return Command::message(Message::Moved(rect));
        }
        match event.kind {
            DomEventKind::KeyDown => match event.key {
                Some(key) => self.key(stage, key.code, key.modifiers),
                None => Command::none(),
            },
            DomEventKind::Click => match self.buttons.iter().position(|b| event.on(*b)) {
                Some(index) => {
                    self.focus.go(index as i64);
                    self.pick(stage, index)
                }
                None => Command::none(),
            },
            _ => Command::none(),
        }
    }

    /// Keeps the `visible` state right when the stage shows or hides the
    /// dialog on its own, e.g. through a trigger click.
    fn popup_changed(&mut self, stage: &mut Stage, popup: ComponentId, shown: bool) -> Command<Message> {
        if popup != self.popup || shown == self.life.state("visible") {
            return Command::none();
        }
        if shown {
            self.opened(stage, Detail::None);
        } else {
            let _ = self.set_state("visible", false, SetOptions::SYNC);
        }
        Command::none()
    }

    fn update(&mut self, _stage: &mut Stage, msg: Message) -> Command<Message> {
        if msg == Message::Sync {
            self.sync();
        }
        Command::none()
    }

    fn view(&self, stage: &Stage, frame: &mut Frame, area: Rect) {
        if !self.is_visible(stage) {
            return;
        }
        let Some(rect) = stage.scene().rect(self.layer).map(|r| r.intersection(area)) else {
            return;
        };
        frame.render_widget(Clear, rect);
        let title = self.life.property("title").map_or("", String::as_str);
        let block = Block::bordered()
            .title(title)
            .title_style(Style::default().add_modifier(Modifier::BOLD))
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let body = self.life.property("body").map_or("", String::as_str);
        let body_area = Rect {
            height: inner.height.saturating_sub(2),
            ..inner
        };
        frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), body_area);

        for (index, (action, button)) in self.actions.iter().zip(&self.buttons).enumerate() {
            let Some(at) = stage.scene().rect(*button).map(|r| r.intersection(area)) else {
                continue;
            };
            let focused = index == self.focus.index();
            let style = if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let marker = if focused { "▸" } else { " " };
            let line = Line::from(vec![Span::raw(marker), Span::styled(action.text(), style)]);
            frame.render_widget(Paragraph::new(line).alignment(Alignment::Left), at);
        }
    }

    fn dispose(&mut self, stage: &mut Stage) -> Command<Message> {
        stage.dispose_popup(self.popup);
        self.dispose_life();
        Command::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::{Message as MountedMessage, Mounted};
    use crate::stage::tests::{click, mouse};
    use crossterm::event::{KeyEvent, MouseButton, MouseEventKind};
    use perch_core::testing::TestComponent;
    use perch_core::{Flow, LifeEventKind, Scene, TerminalEvent};
    use ratatui::layout::Position;
    use std::sync::{Arc, Mutex};

    #[test]
    fn oversized_action_labels_saturate() {
        let actions = [Action::new("x".repeat(70_000)), Action::new("OK")];
        let rects = layout_buttons(Rect::new(0, 0, 80, 24), &actions);
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].x, 0);
        assert!(rects[1].x >= rects[0].x);
    }

    fn confirm() -> DialogOptions {
        DialogOptions::new("Confirm")
            .body("Really quit?")
            .action(Action::new("Yes").with_shortcut('y'))
            .action(Action::new("No").with_shortcut('n'))
    }

    fn stage() -> Stage {
        Stage::new(Scene::new(Rect::new(0, 0, 60, 20)))
    }

    fn key(code: KeyCode) -> MountedMessage<Message> {
        MountedMessage::Stage(crate::stage::Message::Terminal(TerminalEvent::Key(
            KeyEvent::new(code, KeyModifiers::NONE),
        )))
    }

    fn ui(msg: crate::stage::Message) -> MountedMessage<Message> {
        MountedMessage::Stage(msg)
    }

    #[test]
    fn buttons_laid_out_on_bottom_row() {
        let mut stage = stage();
        let dialog = Dialog::attach(&mut stage, [], confirm()).unwrap();
        let layer = stage.scene().rect(dialog.layer()).unwrap();
        assert_eq!(layer, Rect::new(10, 5, 40, 9));
        let rects: Vec<_> = dialog
            .buttons()
            .iter()
            .map(|b| stage.scene().rect(*b).unwrap())
            .collect();
        // "[y] Yes" and "[n] No" plus a marker column each.
        assert_eq!(rects[0], Rect::new(20, 12, 9, 1));
        assert_eq!(rects[1], Rect::new(31, 12, 8, 1));
    }

    #[test]
    fn show_and_hide_emit_before_and_after() {
        let mut stage = stage();
        let mut dialog = Dialog::attach(&mut stage, [], confirm()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            LifeEventKind::Before("show"),
            LifeEventKind::After("show"),
            LifeEventKind::Before("hide"),
            LifeEventKind::After("hide"),
        ] {
            let sink = seen.clone();
            dialog.life_mut().on(kind, move |_| {
                sink.lock().unwrap().push(kind);
                Flow::Continue
            });
        }
        assert!(dialog.show(&mut stage));
        assert!(dialog.life().state("visible"));
        assert!(dialog.hide(&mut stage));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                LifeEventKind::Before("show"),
                LifeEventKind::After("show"),
                LifeEventKind::Before("hide"),
                LifeEventKind::After("hide"),
            ]
        );
    }

    #[test]
    fn vetoed_hide_keeps_dialog_open() {
        let mut stage = stage();
        let mut dialog = Dialog::attach(&mut stage, [], confirm()).unwrap();
        dialog
            .life_mut()
            .on(LifeEventKind::Before("hide"), |_| Flow::Veto);
        dialog.show(&mut stage);
        assert!(!dialog.hide(&mut stage));
        assert!(dialog.is_visible(&stage));
    }

    #[test]
    fn escape_dismisses() {
        let mut stage = stage();
        let mut dialog = Dialog::attach(&mut stage, [], confirm()).unwrap();
        dialog.show(&mut stage);
        let mut t = TestComponent::new(Mounted::new(stage, dialog));
        t.send(key(KeyCode::Esc));
        assert!(!t.component().widget().is_visible(t.component().stage()));
    }

    #[test]
    fn keyboard_and_clicks_pick_actions() {
        let mut stage = stage();
        let mut dialog = Dialog::attach(&mut stage, [], confirm()).unwrap();
        dialog.show(&mut stage);
        let right = stage
            .scene()
            .key_pressed(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        assert!(dialog.handle(&mut stage, &right).is_none());
        assert_eq!(dialog.focused_action(), 1);
        let enter = stage
            .scene()
            .key_pressed(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        let picked = dialog.handle(&mut stage, &enter).into_message();
        assert_eq!(picked, Some(Message::Selected(1)));
        assert!(!dialog.is_visible(&stage));

        dialog.show(&mut stage);
        let yes = stage.scene().rect(dialog.buttons()[0]).unwrap();
        let events = stage
            .scene_mut()
            .pointer_pressed(Position::new(yes.x, yes.y), MouseButton::Left);
        let clicked = events
            .iter()
            .map(|e| dialog.handle(&mut stage, e))
            .find_map(|c| c.into_message());
        assert_eq!(clicked, Some(Message::Selected(0)));
    }

    #[test]
    fn trigger_click_opens_and_title_bar_drags() {
        let mut stage = stage();
        let open = stage.scene_mut().add(Element::button(Rect::new(0, 0, 6, 1)));
        let m = Mounted::attach(stage, |s| Dialog::attach(s, [open], confirm())).unwrap();
        let mut t = TestComponent::new(m);

        t.send(ui(click(2, 0)));
        t.drain_messages();
        assert!(t.component().widget().is_visible(t.component().stage()));
        assert!(t.component().widget().life().state("visible"));
        assert!(t.render_string(60, 20).contains("Really quit?"));

        t.send(ui(mouse(MouseEventKind::Down(MouseButton::Left), 12, 5)));
        t.send(ui(mouse(MouseEventKind::Drag(MouseButton::Left), 8, 3)));
        t.send(ui(mouse(MouseEventKind::Up(MouseButton::Left), 8, 3)));
        t.drain_messages();
        let layer = t.component().widget().layer();
        assert_eq!(t.component().stage().scene().rect(layer), Some(Rect::new(6, 3, 40, 9)));
    }
}
