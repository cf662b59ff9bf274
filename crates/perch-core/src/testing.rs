//! Headless harnesses for models and components.
//!
//! [`TestProgram`] and [`TestComponent`] run the update loop without a
//! terminal or a tokio runtime. Commands are interpreted by a [`Scheduler`]
//! with a virtual clock: immediate messages and next-tick messages follow the
//! runtime's ordering, and timers fire only when the test calls
//! [`advance`](TestProgram::advance). Futures are held until the test awaits
//! [`settle`](TestComponent::settle); streams and terminal commands are
//! dropped.
//!
//! ```rust,ignore
//! let mut t = TestComponent::new(stage);
//! t.send(stage::Message::Dom(pointer_enter(trigger)));
//! t.drain_messages();
//! t.advance(Duration::from_millis(200));
//! assert!(t.component().scene().is_visible(tip));
//! ```

use crate::command::{Action, Command, CommandInner, TimerId};
use futures::future::BoxFuture;
use crate::component::Component;
use crate::model::Model;
use ratatui::buffer::Buffer;
use ratatui::{Frame, Terminal};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Command interpreter with a virtual clock.
pub struct Scheduler<Msg> {
    now: Duration,
    ready: VecDeque<Msg>,
    deferred: Vec<Msg>,
    timers: BTreeMap<(Duration, u64), (TimerId, Msg)>,
    futures: Vec<BoxFuture<'static, Msg>>,
    seq: u64,
    quit: bool,
}

impl<Msg> Default for Scheduler<Msg> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            ready: VecDeque::new(),
            deferred: Vec::new(),
            timers: BTreeMap::new(),
            futures: Vec::new(),
            seq: 0,
            quit: false,
        }
    }
}

impl<Msg: Send + 'static> Scheduler<Msg> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since the harness started.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn has_timer(&self, id: TimerId) -> bool {
        self.timers.values().any(|(t, _)| *t == id)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn pending_futures(&self) -> usize {
        self.futures.len()
    }

    /// Queue everything `cmd` asks for.
    pub fn collect(&mut self, cmd: Command<Msg>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Action(Action::Message(msg)) => self.ready.push_back(msg),
            CommandInner::Action(Action::Quit) => self.quit = true,
            CommandInner::Batch(cmds) | CommandInner::Sequence(cmds) => {
                for cmd in cmds {
                    self.collect(cmd);
                }
            }
            CommandInner::NextTick(msg) => self.deferred.push(msg),
            CommandInner::Timer { id, after, msg } => {
                self.cancel(id);
                self.seq += 1;
                self.timers.insert((self.now + after, self.seq), (id, msg));
            }
            CommandInner::CancelTimer(id) => self.cancel(id),
            CommandInner::Future(fut) => self.futures.push(fut),
            CommandInner::Terminal(_) => {}
        }
    }

    fn cancel(&mut self, id: TimerId) {
        self.timers.retain(|_, (t, _)| *t != id);
    }

    /// Next message to deliver: immediate ones first, then the next-tick
    /// queue once the immediate one is empty.
    pub fn next_message(&mut self) -> Option<Msg> {
        if self.ready.is_empty() {
            self.ready.extend(self.deferred.drain(..));
        }
        self.ready.pop_front()
    }

    /// Deliver queued messages until none are left.
    pub fn drain(&mut self, mut update: impl FnMut(Msg) -> Command<Msg>) {
        while let Some(msg) = self.next_message() {
            let cmd = update(msg);
            self.collect(cmd);
        }
    }

    /// Move the clock forward by `by`, firing due timers in order and
    /// draining the messages each one produces.
    pub fn advance(&mut self, by: Duration, mut update: impl FnMut(Msg) -> Command<Msg>) {
        let target = self.now + by;
        self.drain(&mut update);
        loop {
            let Some(key) = self.timers.keys().next().copied().filter(|(due, _)| *due <= target)
            else {
                break;
            };
            if let Some((_, msg)) = self.timers.remove(&key) {
                self.now = key.0;
                self.ready.push_back(msg);
                self.drain(&mut update);
            }
        }
        self.now = target;
    }

    /// Await every held future, deliver what they resolve to, and repeat
    /// until no future is left. The virtual clock does not move.
    pub async fn settle(&mut self, mut update: impl FnMut(Msg) -> Command<Msg>) {
        self.drain(&mut update);
        while !self.futures.is_empty() {
            let batch: Vec<_> = self.futures.drain(..).collect();
            for msg in futures::future::join_all(batch).await {
                self.ready.push_back(msg);
            }
            self.drain(&mut update);
        }
    }
}

fn render_with(width: u16, height: u16, draw: impl FnOnce(&mut Frame)) -> Buffer {
    let backend = ratatui::backend::TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    terminal.backend().buffer().clone()
}

fn buffer_string(buf: &Buffer) -> String {
    let area = buf.area;
    let mut lines = Vec::with_capacity(area.height as usize);
    for y in area.top()..area.bottom() {
        let line: String = (area.left()..area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect();
        lines.push(line);
    }
    lines.join("\n")
}

/// Drives a [`Model`].
pub struct TestProgram<M: Model> {
    model: M,
    scheduler: Scheduler<M::Message>,
}

impl<M: Model> TestProgram<M> {
    /// Run [`Model::init`] and queue its command. Call
    /// [`drain_messages`](Self::drain_messages) to process it.
    pub fn new(flags: M::Flags) -> Self {
        let (model, cmd) = M::init(flags);
        let mut scheduler = Scheduler::new();
        scheduler.collect(cmd);
        Self { model, scheduler }
    }

    /// One update. Follow-up messages stay queued.
    pub fn send(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.scheduler.collect(cmd);
    }

    pub fn drain_messages(&mut self) {
        let model = &mut self.model;
        self.scheduler.drain(|msg| model.update(msg));
    }

    pub fn advance(&mut self, by: Duration) {
        let model = &mut self.model;
        self.scheduler.advance(by, |msg| model.update(msg));
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn scheduler(&self) -> &Scheduler<M::Message> {
        &self.scheduler
    }

    pub fn render(&self, width: u16, height: u16) -> Buffer {
        render_with(width, height, |frame| self.model.view(frame))
    }

    /// Rendered rows joined by newlines.
    pub fn render_string(&self, width: u16, height: u16) -> String {
        buffer_string(&self.render(width, height))
    }
}

/// Drives a [`Component`] directly.
pub struct TestComponent<C: Component> {
    component: C,
    scheduler: Scheduler<C::Message>,
}

impl<C: Component> TestComponent<C> {
    pub fn new(component: C) -> Self {
        Self {
            component,
            scheduler: Scheduler::new(),
        }
    }

    /// Queue a command produced outside `update`, e.g. by a widget method.
    pub fn run(&mut self, cmd: Command<C::Message>) {
        self.scheduler.collect(cmd);
    }

    pub fn send(&mut self, msg: C::Message) {
        let cmd = self.component.update(msg);
        self.scheduler.collect(cmd);
    }

    pub fn drain_messages(&mut self) {
        let component = &mut self.component;
        self.scheduler.drain(|msg| component.update(msg));
    }

    pub fn advance(&mut self, by: Duration) {
        let component = &mut self.component;
        self.scheduler.advance(by, |msg| component.update(msg));
    }

    /// Run held futures to completion, see [`Scheduler::settle`].
    pub async fn settle(&mut self) {
        let component = &mut self.component;
        self.scheduler.settle(|msg| component.update(msg)).await;
    }

    /// Dispose the component and process what that returns.
    pub fn dispose(&mut self) {
        let cmd = self.component.dispose();
        self.scheduler.collect(cmd);
        self.drain_messages();
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    pub fn scheduler(&self) -> &Scheduler<C::Message> {
        &self.scheduler
    }

    pub fn render(&self, width: u16, height: u16) -> Buffer {
        render_with(width, height, |frame| {
            let area = frame.area();
            self.component.view(frame, area)
        })
    }

    pub fn render_string(&self, width: u16, height: u16) -> String {
        buffer_string(&self.render(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::widgets::Paragraph;

    struct Log {
        seen: Vec<String>,
        timer: Option<TimerId>,
    }

    #[derive(Debug)]
    enum Msg {
        Start,
        Immediate(&'static str),
        Tick(&'static str),
        Arm(u64),
        Disarm,
        Fired,
    }

    impl Model for Log {
        type Message = Msg;
        type Flags = ();

        fn init(_: ()) -> (Self, Command<Msg>) {
            (
                Log {
                    seen: Vec::new(),
                    timer: None,
                },
                Command::none(),
            )
        }

        fn update(&mut self, msg: Msg) -> Command<Msg> {
            match msg {
                Msg::Start => Command::batch(vec![
                    Command::next_tick(Msg::Tick("flush")),
                    Command::message(Msg::Immediate("a")),
                    Command::message(Msg::Immediate("b")),
                ]),
                Msg::Immediate(s) | Msg::Tick(s) => {
                    self.seen.push(s.to_string());
                    Command::none()
                }
                Msg::Arm(ms) => {
                    let id = TimerId::next();
                    self.timer = Some(id);
                    Command::timer(id, Duration::from_millis(ms), Msg::Fired)
                }
                Msg::Disarm => match self.timer.take() {
                    Some(id) => Command::cancel_timer(id),
                    None => Command::none(),
                },
                Msg::Fired => {
                    self.seen.push("fired".into());
                    Command::none()
                }
            }
        }

        fn view(&self, frame: &mut Frame) {
            frame.render_widget(Paragraph::new(self.seen.join(",")), frame.area());
        }
    }

    #[test]
    fn next_tick_runs_after_immediate_messages() {
        let mut prog = TestProgram::<Log>::new(());
        prog.send(Msg::Start);
        prog.drain_messages();
        assert_eq!(prog.model().seen, vec!["a", "b", "flush"]);
    }

    #[test]
    fn timers_fire_on_advance() {
        let mut prog = TestProgram::<Log>::new(());
        prog.send(Msg::Arm(100));
        prog.advance(Duration::from_millis(99));
        assert!(prog.model().seen.is_empty());
        prog.advance(Duration::from_millis(1));
        assert_eq!(prog.model().seen, vec!["fired"]);
        assert_eq!(prog.scheduler().pending_timers(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut prog = TestProgram::<Log>::new(());
        prog.send(Msg::Arm(100));
        prog.advance(Duration::from_millis(50));
        prog.send(Msg::Disarm);
        prog.advance(Duration::from_secs(1));
        assert!(prog.model().seen.is_empty());
        assert_eq!(prog.scheduler().now(), Duration::from_millis(1050));
    }

    #[test]
    fn render_string_shows_model() {
        let mut prog = TestProgram::<Log>::new(());
        prog.send(Msg::Immediate("x"));
        assert!(prog.render_string(10, 1).starts_with('x'));
    }
}
