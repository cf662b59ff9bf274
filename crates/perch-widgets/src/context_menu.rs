//! Right-click menus.
//!
//! A [`ContextMenu`] opens at the pointer when one of its triggers is right
//! clicked and closes on a click anywhere outside it or on Esc. All menus on
//! a stage share one layer, so opening a menu closes any other. Items are
//! picked with the mouse or with Up/Down/Home/End and Enter; picking one
//! sends a [`Message::Selected`] notice and closes the menu.

use crate::iterator::Cursor;
use crate::keyboard::{Binding, Keymap};
use crate::mount::Widget;
use crate::popup::{Popup, Reveal};
use crate::position;
use crate::stage::{SharedLayer, Stage};
use crate::trigger::{TriggerKind, TriggerSpec};
use crossterm::event::KeyCode;
use perch_core::{
    Command, ComponentId, Detail, DomEvent, DomEventKind, ElementId, Error, Guard, Life, Scene,
};
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph};
use ratatui::Frame;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub disabled: bool,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl From<&str> for MenuItem {
    fn from(label: &str) -> Self {
        MenuItem::new(label)
    }
}

impl From<String> for MenuItem {
    fn from(label: String) -> Self {
        MenuItem::new(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenuOptions {
    pub items: Vec<MenuItem>,
    pub show: TriggerSpec,
    pub hide: TriggerSpec,
}

impl Default for ContextMenuOptions {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            show: TriggerSpec::new([TriggerKind::Context], Duration::ZERO),
            hide: TriggerSpec::new([TriggerKind::Blur], Duration::ZERO),
        }
    }
}

impl ContextMenuOptions {
    pub fn items<I: Into<MenuItem>>(items: impl IntoIterator<Item = I>) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Notice: an item was picked. Carries its index and label.
    Selected(usize, String),
    /// Notice: the menu opened from this trigger.
    Opened(Option<ElementId>),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Up,
    Down,
    Home,
    End,
    Pick,
    Close,
}

/// Size of the menu box for `items`, border included.
fn menu_size(items: &[MenuItem]) -> (u16, u16) {
    let widest = items.iter().map(|i| i.label.width()).max().unwrap_or(0);
    let widest = u16::try_from(widest).unwrap_or(u16::MAX);
    let rows = u16::try_from(items.len()).unwrap_or(u16::MAX);
    (widest.saturating_add(4), rows.saturating_add(2))
}

pub struct ContextMenu {
    life: Life<String>,
    popup: ComponentId,
    layer: ElementId,
    items: Vec<MenuItem>,
    cursor: Cursor,
    keys: Keymap<Key>,
}

impl ContextMenu {
    pub fn attach(
        stage: &mut Stage,
        triggers: impl IntoIterator<Item = ElementId>,
        options: ContextMenuOptions,
    ) -> Result<Self, Error> {
        let layer = stage.shared_layer(SharedLayer::Menu);
        let (width, height) = menu_size(&options.items);
        let popup = Popup::new(layer)
            .with_triggers(triggers)
            .show_on(options.show)
            .hide_on(options.hide)
            .on_show(move |scene, reveal| open_at_pointer(scene, reveal, width, height));
        let popup = stage.add(popup)?;

        let mut life = Life::new();
        life.init();
        Ok(Self {
            life,
            popup,
            layer,
            cursor: Cursor::clamped(options.items.len()),
            items: options.items,
            keys: Keymap::new()
                .bind(Binding::key(KeyCode::Up, "previous item"), Key::Up)
                .bind(Binding::key(KeyCode::Down, "next item"), Key::Down)
                .bind(Binding::key(KeyCode::Home, "first item"), Key::Home)
                .bind(Binding::key(KeyCode::End, "last item"), Key::End)
                .bind(Binding::key(KeyCode::Enter, "pick"), Key::Pick)
                .bind(Binding::key(KeyCode::Esc, "close"), Key::Close),
        })
    }

    pub fn popup(&self) -> ComponentId {
        self.popup
    }

    pub fn layer(&self) -> ElementId {
        self.layer
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn highlighted(&self) -> usize {
        self.cursor.index()
    }

    pub fn is_open(&self, stage: &Stage) -> bool {
        stage.is_shown(self.popup)
    }

    /// Open at `at` without a trigger.
    pub fn open_at(&mut self, stage: &mut Stage, at: Position) -> bool {
        let (width, height) = menu_size(&self.items);
        let scene = stage.scene_mut();
        let rect = position::at_point(at, width, height, scene.bounds());
        scene.set_rect(self.layer, rect);
        stage.show(self.popup, None)
    }

    pub fn close(&mut self, stage: &mut Stage) -> bool {
        stage.hide(self.popup)
    }

    /// Pick item `index`. Disabled items and vetoed picks do nothing.
    pub fn select(&mut self, stage: &mut Stage, index: usize) -> Command<Message> {
        let Some(item) = self.items.get(index) else {
            return Command::none();
        };
        let guard = Guard::from(!item.disabled);
        let Some(detail) = self.life.before("select", guard, Detail::Index(index)) else {
            return Command::none();
        };
        let label = item.label.clone();
        tracing::debug!(menu = %self.life.id(), index, label = %label, "menu item picked");
        self.close(stage);
        self.life.after("select", detail);
        Command::message(Message::Selected(index, label))
    }

    fn row_at(&self, stage: &Stage, pos: Position) -> Option<usize> {
        let rect = stage.scene().rect(self.layer)?;
        let inner = Block::bordered().inner(rect);
        if !inner.contains(pos) {
            return None;
        }
        Some((pos.y - inner.y) as usize).filter(|row| *row < self.items.len())
    }
}

fn open_at_pointer(scene: &mut Scene, reveal: &Reveal, width: u16, height: u16) {
    let at = reveal
        .pointer
        .or_else(|| reveal.trigger.and_then(|t| scene.rect(t)).map(|r| Position::new(r.x, r.y)))
        .unwrap_or_default();
    let rect = position::at_point(at, width, height, scene.bounds());
    scene.set_rect(reveal.layer, rect);
    scene.set_content(reveal.layer, None);
    scene.set_visible(reveal.layer, true);
    scene.raise(reveal.layer);
}

impl Widget for ContextMenu {
    type Message = Message;

    fn handle(&mut self, stage: &mut Stage, event: &DomEvent) -> Command<Message> {
        if !self.is_open(stage) {
            return Command::none();
        }
        match event.kind {
            DomEventKind::KeyDown => {
                let Some(key) = event.key.as_ref().and_then(|k| self.keys.resolve(k)) else {
                    return Command::none();
                };
                match key {
                    Key::Up => {
                        self.cursor.prev();
                    }
                    Key::Down => {
                        self.cursor.next();
                    }
                    Key::Home => {
                        self.cursor.first();
                    }
                    Key::End => {
                        self.cursor.last();
                    }
                    Key::Pick => return self.select(stage, self.cursor.index()),
                    Key::Close => {
                        self.close(stage);
                    }
                }
                Command::none()
            }
            DomEventKind::PointerMove => {
                if let Some(row) = event.pos.and_then(|p| self.row_at(stage, p)) {
                    self.cursor.go(row as i64);
                }
                Command::none()
            }
            DomEventKind::Click if event.on(self.layer) => {
                match event.pos.and_then(|p| self.row_at(stage, p)) {
                    Some(row) => self.select(stage, row),
                    None => Command::none(),
                }
            }
            _ => Command::none(),
        }
    }

    fn popup_changed(&mut self, stage: &mut Stage, popup: ComponentId, shown: bool) -> Command<Message> {
        if popup != self.popup {
            return Command::none();
        }
        if shown {
            self.cursor.first();
            Command::message(Message::Opened(stage.active_trigger(popup)))
        } else {
            Command::message(Message::Closed)
        }
    }

    fn update(&mut self, _stage: &mut Stage, _msg: Message) -> Command<Message> {
        Command::none()
    }

    fn view(&self, stage: &Stage, frame: &mut Frame, area: Rect) {
        if !self.is_open(stage) {
            return;
        }
        let Some(rect) = stage.scene().rect(self.layer).map(|r| r.intersection(area)) else {
            return;
        };
        let lines: Vec<Line> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let style = if item.disabled {
                    Style::default().fg(Color::DarkGray)
                } else if i == self.cursor.index() {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Line::styled(format!(" {} ", item.label), style)
            })
            .collect();
        frame.render_widget(Clear, rect);
        frame.render_widget(Paragraph::new(lines).block(Block::bordered()), rect);
    }

    fn dispose(&mut self, stage: &mut Stage) -> Command<Message> {
        stage.dispose_popup(self.popup);
        self.life.teardown();
        Command::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::{Message as MountedMessage, Mounted};
    use crate::stage::tests::{click, right_click};
    use crossterm::event::{KeyEvent, KeyModifiers};
    use perch_core::testing::TestComponent;
    use perch_core::{Component, Element, TerminalEvent};

    #[test]
    fn menu_size_saturates() {
        let items: Vec<MenuItem> = (0..70_000).map(|_| MenuItem::new("Cut")).collect();
        assert_eq!(menu_size(&items), (7, u16::MAX));
        assert_eq!(menu_size(&[MenuItem::new("y".repeat(70_000))]), (u16::MAX, 3));
    }

    fn ui(msg: crate::stage::Message) -> MountedMessage<Message> {
        MountedMessage::Stage(msg)
    }

    fn key(code: KeyCode) -> MountedMessage<Message> {
        ui(crate::stage::Message::Terminal(TerminalEvent::Key(KeyEvent::new(
            code,
            KeyModifiers::NONE,
        ))))
    }

    fn editor() -> (Stage, ElementId) {
        let mut scene = Scene::new(Rect::new(0, 0, 60, 20));
        let area = scene.add(Element::region(Rect::new(0, 0, 40, 15)));
        (Stage::new(scene), area)
    }

    fn menu(stage: Stage, area: ElementId) -> TestComponent<Mounted<ContextMenu>> {
        let m = Mounted::attach(stage, |s| {
            ContextMenu::attach(
                s,
                [area],
                ContextMenuOptions::items(["Cut", "Copy", "Paste"]),
            )
        })
        .unwrap();
        TestComponent::new(m)
    }

    #[test]
    fn opens_at_pointer_and_picks_with_keys() {
        let (stage, area) = editor();
        let mut t = menu(stage, area);
        t.send(ui(right_click(5, 3)));
        t.drain_messages();
        let m = t.component();
        assert!(m.widget().is_open(m.stage()));
        assert_eq!(m.stage().scene().rect(m.widget().layer()), Some(Rect::new(5, 3, 9, 5)));

        t.send(key(KeyCode::Down));
        t.send(key(KeyCode::Down));
        t.send(key(KeyCode::Down));
        assert_eq!(t.component().widget().highlighted(), 2);
        t.send(key(KeyCode::Home));
        t.send(key(KeyCode::Down));
        let cmd = t.component_mut().update(key(KeyCode::Enter));
        let picked = cmd
            .into_batch()
            .into_iter()
            .flatten()
            .find_map(|c| c.into_message());
        assert_eq!(
            picked,
            Some(MountedMessage::Widget(Message::Selected(1, "Copy".into())))
        );
        let m = t.component();
        assert!(!m.widget().is_open(m.stage()));
    }

    #[test]
    fn clicking_a_row_picks_it_and_outside_closes() {
        let (stage, area) = editor();
        let mut t = menu(stage, area);
        t.send(ui(right_click(5, 3)));
        t.drain_messages();
        // Rows start one below the top border.
        let cmd = t.component_mut().update(ui(click(7, 6)));
        let picked = cmd
            .into_batch()
            .into_iter()
            .flatten()
            .find_map(|c| c.into_message());
        assert_eq!(
            picked,
            Some(MountedMessage::Widget(Message::Selected(2, "Paste".into())))
        );

        t.send(ui(right_click(5, 3)));
        t.send(ui(click(50, 18)));
        t.drain_messages();
        let m = t.component();
        assert!(!m.widget().is_open(m.stage()));
    }

    #[test]
    fn disabled_items_cannot_be_picked() {
        let (mut stage, area) = editor();
        let mut menu = ContextMenu::attach(
            &mut stage,
            [area],
            ContextMenuOptions::items([MenuItem::new("Undo").disabled(), MenuItem::new("Redo")]),
        )
        .unwrap();
        menu.open_at(&mut stage, Position::new(1, 1));
        assert!(menu.select(&mut stage, 0).is_none());
        assert!(menu.is_open(&stage));
        assert!(!menu.select(&mut stage, 1).is_none());
        assert!(!menu.is_open(&stage));
    }

    #[test]
    fn menus_share_one_layer() {
        let (mut stage, area) = editor();
        let other = stage.scene_mut().add(Element::region(Rect::new(40, 0, 20, 15)));
        let mut first =
            ContextMenu::attach(&mut stage, [area], ContextMenuOptions::items(["A"])).unwrap();
        let mut second =
            ContextMenu::attach(&mut stage, [other], ContextMenuOptions::items(["B"])).unwrap();
        assert_eq!(first.layer(), second.layer());
        first.open_at(&mut stage, Position::new(2, 2));
        second.open_at(&mut stage, Position::new(45, 2));
        assert!(!first.is_open(&stage));
        assert!(second.is_open(&stage));
    }

    #[test]
    fn escape_closes() {
        let (stage, area) = editor();
        let mut t = menu(stage, area);
        t.send(ui(right_click(5, 3)));
        t.send(key(KeyCode::Esc));
        t.drain_messages();
        let m = t.component();
        assert!(!m.widget().is_open(m.stage()));
    }
}
