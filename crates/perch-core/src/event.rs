use crossterm::event::{KeyEvent, KeyEventKind, MouseEvent};

/// Raw terminal input delivered by the
/// [`terminal_events`](crate::subscriptions::terminal_events) subscription.
///
/// Widgets rarely look at these directly: a [`Scene`](crate::Scene) turns them
/// into element-addressed [`DomEvent`](crate::scene::DomEvent)s (clicks,
/// pointer enter/leave, focus changes) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// A keyboard event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
    /// Terminal window gained focus.
    FocusGained,
    /// Terminal window lost focus.
    FocusLost,
    /// Bracketed paste content.
    Paste(String),
}

impl TerminalEvent {
    /// The key event, if this is a press or auto-repeat (releases are skipped).
    pub fn key_press(&self) -> Option<&KeyEvent> {
        match self {
            TerminalEvent::Key(k) if k.kind != KeyEventKind::Release => Some(k),
            _ => None,
        }
    }
}

impl From<crossterm::event::Event> for TerminalEvent {
    fn from(event: crossterm::event::Event) -> Self {
        match event {
            crossterm::event::Event::Key(k) => TerminalEvent::Key(k),
            crossterm::event::Event::Mouse(m) => TerminalEvent::Mouse(m),
            crossterm::event::Event::Resize(w, h) => TerminalEvent::Resize(w, h),
            crossterm::event::Event::FocusGained => TerminalEvent::FocusGained,
            crossterm::event::Event::FocusLost => TerminalEvent::FocusLost,
            crossterm::event::Event::Paste(s) => TerminalEvent::Paste(s),
        }
    }
}
