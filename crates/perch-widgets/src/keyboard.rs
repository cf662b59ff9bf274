//! Key bindings, keymaps and long-press auto-repeat.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use perch_core::{Command, TimerId};
use std::time::Duration;

/// A single key press with optional modifier keys (Ctrl, Alt, Shift).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombination {
    pub code: KeyCode,
    /// Modifiers that must be held alongside the key.
    pub modifiers: KeyModifiers,
}

impl KeyCombination {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn shift(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::SHIFT,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.code == event.code && event.modifiers.contains(self.modifiers)
    }
}

impl From<KeyCode> for KeyCombination {
    fn from(code: KeyCode) -> Self {
        Self::new(code)
    }
}

/// One or more key combinations with a description for help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub keys: Vec<KeyCombination>,
    pub description: String,
    /// Disabled bindings never match.
    pub enabled: bool,
}

impl Binding {
    pub fn new(keys: impl IntoIterator<Item = KeyCombination>, description: impl Into<String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            description: description.into(),
            enabled: true,
        }
    }

    pub fn key(code: KeyCode, description: impl Into<String>) -> Self {
        Self::new([KeyCombination::new(code)], description)
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.enabled && self.keys.iter().any(|k| k.matches(event))
    }
}

/// Bindings to widget actions, checked in insertion order.
///
/// ```rust,ignore
/// let keys = Keymap::new()
///     .bind(Binding::key(KeyCode::Up, "previous"), Action::Prev)
///     .bind(Binding::key(KeyCode::Down, "next"), Action::Next);
/// if let Some(action) = keys.resolve(&key) { ... }
/// ```
#[derive(Debug, Clone)]
pub struct Keymap<A> {
    bindings: Vec<(Binding, A)>,
}

impl<A> Default for Keymap<A> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<A: Copy + PartialEq> Keymap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, binding: Binding, action: A) -> Self {
        self.bindings.push((binding, action));
        self
    }

    pub fn resolve(&self, event: &KeyEvent) -> Option<A> {
        self.bindings
            .iter()
            .find(|(binding, _)| binding.matches(event))
            .map(|(_, action)| *action)
    }

    pub fn set_enabled(&mut self, action: A, enabled: bool) {
        for (binding, a) in self.bindings.iter_mut() {
            if *a == action {
                binding.enabled = enabled;
            }
        }
    }

    /// Enabled bindings, for help lines.
    pub fn help(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().map(|(b, _)| b).filter(|b| b.enabled)
    }
}

/// Auto-repeat for a held key or button: one action on press, then a
/// repeat after `delay` and every `interval` after that until stopped.
///
/// Every scheduled timer gets a fresh [`TimerId`] carried in its message,
/// so deliveries from a stopped or restarted run are recognised as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repeater {
    delay: Duration,
    interval: Duration,
    timer: Option<TimerId>,
}

impl Default for Repeater {
    fn default() -> Self {
        Self::new(Duration::from_millis(400), Duration::from_millis(60))
    }
}

impl Repeater {
    pub fn new(delay: Duration, interval: Duration) -> Self {
        Self {
            delay,
            interval,
            timer: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Start (or restart) a run. `tick` builds the message a timer delivers.
    pub fn start<M: Send + 'static>(&mut self, tick: impl FnOnce(TimerId) -> M) -> Command<M> {
        let stop = self.stop();
        let id = TimerId::next();
        self.timer = Some(id);
        Command::batch([stop, Command::timer(id, self.delay, tick(id))])
    }

    /// A repeat timer fired. Returns the next timer if `id` belongs to the
    /// current run, `None` if it is stale.
    pub fn fire<M: Send + 'static>(
        &mut self,
        id: TimerId,
        tick: impl FnOnce(TimerId) -> M,
    ) -> Option<Command<M>> {
        if self.timer != Some(id) {
            return None;
        }
        let next = TimerId::next();
        self.timer = Some(next);
        Some(Command::timer(next, self.interval, tick(next)))
    }

    pub fn stop<M: Send + 'static>(&mut self) -> Command<M> {
        match self.timer.take() {
            Some(id) => Command::cancel_timer(id),
            None => Command::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Action {
        Up,
        Quit,
    }

    #[test]
    fn keymap_resolves_first_enabled_match() {
        let mut keys = Keymap::new()
            .bind(Binding::key(KeyCode::Up, "up"), Action::Up)
            .bind(
                Binding::new([KeyCombination::ctrl(KeyCode::Char('c')), KeyCode::Esc.into()], "quit"),
                Action::Quit,
            );
        let up = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(keys.resolve(&up), Some(Action::Up));
        assert_eq!(keys.resolve(&ctrl_c), Some(Action::Quit));
        assert_eq!(keys.resolve(&plain_c), None);

        keys.set_enabled(Action::Up, false);
        assert_eq!(keys.resolve(&up), None);
        assert_eq!(keys.help().count(), 1);
    }

    #[test]
    fn repeater_schedules_delay_then_interval() {
        let mut r = Repeater::default();
        let cmd = r.start(|id| id);
        let first = cmd.scheduled_timers();
        assert_eq!(first.len(), 1);
        assert!(r.is_running());

        assert!(r.fire(TimerId::next(), |id| id).is_none());
        let next = r.fire(first[0], |id| id).map(|c| c.scheduled_timers());
        assert!(next.is_some_and(|t| t.len() == 1 && t[0] != first[0]));

        let stop: Command<TimerId> = r.stop();
        assert_eq!(stop.cancelled_timers().len(), 1);
        assert!(!r.is_running());
    }
}
