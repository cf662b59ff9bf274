//! Slide carousel with autoplay and indicator dots.
//!
//! The carousel owns two arrow buttons it adds under its root element. While
//! autoplay is on it returns a repeating [`Every`] subscription; hovering the
//! root pauses it simply by no longer returning the subscription, which makes
//! the runtime stop the timer.

use crate::iterator::Cursor;
use crate::mount::Widget;
use crate::stage::Stage;
use crossterm::event::KeyCode;
use perch_core::{
    subscribe, Change, Command, DomEvent, DomEventKind, Element, ElementId, Error, Every, Life,
    Lifecycle, SetOptions, Subscription,
};
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::Frame;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselOptions {
    pub interval: Duration,
    pub autoplay: bool,
    /// Wrap from the last slide to the first and back.
    pub looping: bool,
    pub pause_on_hover: bool,
}

impl Default for CarouselOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            autoplay: true,
            looping: true,
            pause_on_hover: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Prev,
    Next,
    Go(usize),
    /// Autoplay tick.
    Tick,
    Sync,
    /// Notice: the visible slide changed.
    Changed { from: usize, to: usize },
}

pub struct Carousel {
    life: Life<usize>,
    root: ElementId,
    prev: ElementId,
    next: ElementId,
    slides: Vec<String>,
    cursor: Cursor,
    options: CarouselOptions,
}

impl Carousel {
    /// Attach to `root`, adding the arrow buttons as its children.
    pub fn attach(
        stage: &mut Stage,
        root: ElementId,
        slides: impl IntoIterator<Item = impl Into<String>>,
        options: CarouselOptions,
    ) -> Result<Self, Error> {
        let area = stage.scene().require(root)?.rect();
        let middle = area.y + area.height / 2;
        let scene = stage.scene_mut();
        let prev = scene.add(
            Element::button(Rect::new(area.x, middle, 1, 1))
                .with_parent(root)
                .with_attr("data-role", "prev"),
        );
        let next = scene.add(
            Element::button(Rect::new(area.right().saturating_sub(1), middle, 1, 1))
                .with_parent(root)
                .with_attr("data-role", "next"),
        );

        let slides: Vec<String> = slides.into_iter().map(Into::into).collect();
        let cursor = Cursor::new(slides.len(), options.looping);
        let mut life = Life::new();
        life.define_property("index", 0);
        life.define_state("paused", false);
        life.init();
        tracing::debug!(carousel = %life.id(), slides = slides.len(), "carousel attached");
        Ok(Self {
            life,
            root,
            prev,
            next,
            slides,
            cursor,
            options,
        })
    }

    pub fn index(&self) -> usize {
        self.cursor.index()
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn current(&self) -> Option<&str> {
        self.slides.get(self.cursor.index()).map(String::as_str)
    }

    pub fn is_paused(&self) -> bool {
        self.life.state("paused")
    }

    pub fn buttons(&self) -> (ElementId, ElementId) {
        (self.prev, self.next)
    }

    pub fn prev(&mut self) -> Command<Message> {
        self.shift(|c| c.prev())
    }

    pub fn next(&mut self) -> Command<Message> {
        self.shift(|c| c.next())
    }

    pub fn go(&mut self, index: usize) -> Command<Message> {
        self.shift(|c| c.go(index as i64))
    }

    pub fn set_paused(&mut self, paused: bool) -> Command<Message> {
        self.set_state("paused", paused, SetOptions::default())
            .then(Message::Sync)
    }

    fn shift(&mut self, step: impl FnOnce(&mut Cursor) -> bool) -> Command<Message> {
        let from = self.cursor.index();
        if !step(&mut self.cursor) {
            return Command::none();
        }
        let to = self.cursor.index();
        let flush = self.set_property("index", to, SetOptions::default());
        Command::batch([
            flush.then(Message::Sync),
            Command::message(Message::Changed { from, to }),
        ])
    }

    fn dots_row(&self, area: Rect) -> (u16, u16) {
        let width = (self.slides.len() * 2).saturating_sub(1) as u16;
        let x = area.x + area.width.saturating_sub(width) / 2;
        (x, area.bottom().saturating_sub(1))
    }

    /// The slide whose indicator dot is drawn at `pos`.
    pub fn dot_at(&self, area: Rect, pos: Position) -> Option<usize> {
        let (x, y) = self.dots_row(area);
        if pos.y != y || pos.x < x || (pos.x - x) % 2 != 0 {
            return None;
        }
        let index = ((pos.x - x) / 2) as usize;
        (index < self.slides.len()).then_some(index)
    }
}

impl Lifecycle for Carousel {
    type Value = usize;

    fn life(&self) -> &Life<usize> {
        &self.life
    }

    fn life_mut(&mut self) -> &mut Life<usize> {
        &mut self.life
    }

    fn update_property(&mut self, _name: &'static str, change: &Change<usize>) {
        tracing::trace!(carousel = %self.life.id(), from = change.old, to = change.new, "slide changed");
    }
}

impl Widget for Carousel {
    type Message = Message;

    fn handle(&mut self, stage: &mut Stage, event: &DomEvent) -> Command<Message> {
        match event.kind {
            DomEventKind::PointerEnter if self.options.pause_on_hover && event.on(self.root) => {
                self.set_paused(true)
            }
            DomEventKind::PointerLeave if self.options.pause_on_hover && event.on(self.root) => {
                self.set_paused(false)
            }
            DomEventKind::Click if event.on(self.prev) => self.prev(),
            DomEventKind::Click if event.on(self.next) => self.next(),
            DomEventKind::Click if event.on(self.root) => {
                let area = stage.scene().rect(self.root).unwrap_or_default();
                match event.pos.and_then(|p| self.dot_at(area, p)) {
                    Some(index) => self.go(index),
                    None => Command::none(),
                }
            }
            DomEventKind::KeyDown if event.on(self.root) => match event.key.map(|k| k.code) {
                Some(KeyCode::Left) => self.prev(),
                Some(KeyCode::Right) => self.next(),
                Some(KeyCode::Home) => self.go(0),
                Some(KeyCode::End) => self.go(self.slides.len().saturating_sub(1)),
                _ => Command::none(),
            },
            _ => Command::none(),
        }
    }

    fn update(&mut self, _stage: &mut Stage, msg: Message) -> Command<Message> {
        match msg {
            Message::Prev => self.prev(),
            Message::Next => self.next(),
            Message::Go(index) => self.go(index),
            // A tick already in flight when the pointer arrived.
            Message::Tick if self.is_paused() || !self.options.autoplay => Command::none(),
            Message::Tick => self.next(),
            Message::Sync => {
                self.sync();
                Command::none()
            }
            Message::Changed { .. } => Command::none(),
        }
    }

    fn view(&self, stage: &Stage, frame: &mut Frame, area: Rect) {
        let Some(rect) = stage.scene().rect(self.root) else {
            return;
        };
        let rect = rect.intersection(area);
        let block = Block::bordered().title(format!(" {}/{} ", self.index() + 1, self.len().max(1)));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);
        frame.render_widget(
            Paragraph::new(self.current().unwrap_or_default())
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            Rect::new(inner.x + 1, inner.y, inner.width.saturating_sub(2), inner.height.saturating_sub(1)),
        );

        let arrows = [(self.prev, "‹"), (self.next, "›")];
        for (id, glyph) in arrows {
            if let Some(r) = stage.scene().rect(id) {
                frame.render_widget(Paragraph::new(glyph), r.intersection(area));
            }
        }

        let (x, y) = self.dots_row(rect);
        let dots: String = (0..self.len())
            .map(|i| if i == self.index() { "●" } else { "○" })
            .collect::<Vec<_>>()
            .join(" ");
        let width = (self.len() * 2).saturating_sub(1) as u16;
        let line = Line::styled(dots, Style::default().add_modifier(Modifier::BOLD));
        frame.render_widget(Paragraph::new(line), Rect::new(x, y, width, 1).intersection(area));
    }

    fn subscriptions(&self) -> Vec<Subscription<Message>> {
        if !self.options.autoplay || self.is_paused() || self.slides.len() < 2 {
            return vec![];
        }
        vec![subscribe(Every::new(self.options.interval, self.life.id().get())).map(|_| Message::Tick)]
    }

    fn dispose(&mut self, stage: &mut Stage) -> Command<Message> {
        for id in [self.prev, self.next] {
            stage.scene_mut().remove(id);
        }
        self.dispose_life();
        Command::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::{Message as MountedMessage, Mounted};
    use crate::stage::tests::{click, move_to};
    use perch_core::testing::TestComponent;
    use perch_core::{Component, Scene};

    type Harness = TestComponent<Mounted<Carousel>>;

    fn carousel(options: CarouselOptions) -> Harness {
        let mut scene = Scene::new(Rect::new(0, 0, 60, 20));
        let root = scene.add(Element::region(Rect::new(10, 2, 30, 7)));
        let m = Mounted::attach(Stage::new(scene), |s| {
            Carousel::attach(s, root, ["one", "two", "three"], options)
        })
        .unwrap();
        TestComponent::new(m)
    }

    fn notices(cmd: Command<Message>) -> Vec<Message> {
        match cmd.into_batch() {
            Some(cmds) => cmds.into_iter().filter_map(|c| c.into_message()).collect(),
            None => vec![],
        }
    }

    #[test]
    fn next_and_prev_loop() {
        let mut t = carousel(CarouselOptions::default());
        let cmd = t.component_mut().with(|c, _| c.prev());
        assert_eq!(notices(cmd), vec![Message::Changed { from: 0, to: 2 }]);
        t.send(MountedMessage::Widget(Message::Next));
        t.drain_messages();
        assert_eq!(t.component().widget().index(), 0);
        assert_eq!(t.component().widget().current(), Some("one"));
        assert!(!t.component().widget().life().has_pending());
    }

    #[test]
    fn clamped_carousel_stops_at_the_end() {
        let mut t = carousel(CarouselOptions {
            looping: false,
            ..CarouselOptions::default()
        });
        let cmd = t.component_mut().with(|c, _| c.prev());
        assert!(cmd.is_none());
        t.send(MountedMessage::Widget(Message::Go(2)));
        t.send(MountedMessage::Widget(Message::Tick));
        t.drain_messages();
        assert_eq!(t.component().widget().index(), 2);
    }

    #[test]
    fn arrow_buttons_and_dots_navigate() {
        let mut t = carousel(CarouselOptions::default());
        // Arrows sit on the middle row (y = 5) at both edges.
        t.send(MountedMessage::Stage(click(39, 5)));
        assert_eq!(t.component().widget().index(), 1);
        t.send(MountedMessage::Stage(click(10, 5)));
        assert_eq!(t.component().widget().index(), 0);
        // Dots "● ○ ○" are centred on the bottom row: x = 22, 24, 26.
        t.send(MountedMessage::Stage(click(26, 8)));
        assert_eq!(t.component().widget().index(), 2);
        t.send(MountedMessage::Stage(click(25, 8)));
        assert_eq!(t.component().widget().index(), 2);
    }

    #[test]
    fn hovering_pauses_autoplay() {
        let mut t = carousel(CarouselOptions::default());
        assert_eq!(t.component().subscriptions().len(), 1);

        t.send(MountedMessage::Stage(move_to(20, 4)));
        t.drain_messages();
        assert!(t.component().widget().is_paused());
        assert!(t.component().subscriptions().is_empty());
        t.send(MountedMessage::Widget(Message::Tick));
        assert_eq!(t.component().widget().index(), 0);

        t.send(MountedMessage::Stage(move_to(50, 15)));
        t.drain_messages();
        assert!(!t.component().widget().is_paused());
        assert_eq!(t.component().subscriptions().len(), 1);
        t.send(MountedMessage::Widget(Message::Tick));
        assert_eq!(t.component().widget().index(), 1);
    }

    #[test]
    fn autoplay_needs_two_slides() {
        let mut scene = Scene::new(Rect::new(0, 0, 60, 20));
        let root = scene.add(Element::region(Rect::new(0, 0, 20, 5)));
        let mut stage = Stage::new(scene);
        let single = Carousel::attach(&mut stage, root, ["only"], CarouselOptions::default()).unwrap();
        assert!(single.subscriptions().is_empty());

        let off = carousel(CarouselOptions {
            autoplay: false,
            ..CarouselOptions::default()
        });
        assert!(off.component().subscriptions().is_empty());
    }

    #[test]
    fn renders_slide_and_dots() {
        let mut t = carousel(CarouselOptions::default());
        t.send(MountedMessage::Widget(Message::Next));
        let screen = t.render_string(60, 20);
        assert!(screen.contains("two"));
        assert!(screen.contains("○ ● ○"));
        assert!(screen.contains("2/3"));
    }

    #[test]
    fn dispose_removes_buttons() {
        let mut t = carousel(CarouselOptions::default());
        t.dispose();
        let m = t.component();
        let (prev, next) = m.widget().buttons();
        assert!(m.stage().scene().get(prev).is_none());
        assert!(m.stage().scene().get(next).is_none());
        assert!(m.widget().life().is_disposed());
    }
}
