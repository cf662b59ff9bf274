use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A side effect returned from [`Model::update`](crate::Model::update),
/// [`Component::update`](crate::Component::update) or widget operations.
///
/// Besides async work and terminal management, commands carry the two
/// scheduling primitives every perch widget relies on:
///
/// * [`Command::next_tick`] delivers a message after everything already queued
///   in the current turn, which is how property changes are batched.
/// * [`Command::timer`] / [`Command::cancel_timer`] drive show/hide delays,
///   long-press repeats and other cancellable deferred work.
///
/// # Examples
///
/// ```rust,ignore
/// let cmd = Command::next_tick(Msg::Sync);
///
/// let id = TimerId::next();
/// let cmd = Command::timer(id, Duration::from_millis(200), Msg::DelayElapsed(id));
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) inner: CommandInner<Msg>,
}

pub(crate) enum CommandInner<Msg: Send + 'static> {
    None,
    Action(Action<Msg>),
    Future(BoxFuture<'static, Msg>),
    Batch(Vec<Command<Msg>>),
    Sequence(Vec<Command<Msg>>),
    Terminal(TerminalCommand),
    /// Deliver after the current turn's queued messages.
    NextTick(Msg),
    Timer {
        id: TimerId,
        after: Duration,
        msg: Msg,
    },
    CancelTimer(TimerId),
}

/// Actions handled synchronously by the runtime.
pub enum Action<Msg> {
    /// Send a message immediately (no async).
    Message(Msg),
    /// Quit the program.
    Quit,
}

/// Identity of a scheduled timer, used to cancel it or to recognise stale
/// deliveries.
///
/// Ids are process-unique; allocate one with [`TimerId::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

impl TimerId {
    /// Allocate a fresh timer id.
    pub fn next() -> Self {
        TimerId(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Terminal management commands executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    /// Switch to the alternate screen buffer.
    EnterAltScreen,
    /// Return to the primary screen buffer.
    ExitAltScreen,
    /// Enable mouse event capture with the specified mode.
    EnableMouseCapture(MouseMode),
    /// Disable mouse event capture.
    DisableMouse,
    /// Make the terminal cursor visible.
    ShowCursor,
    /// Hide the terminal cursor.
    HideCursor,
    /// Set the terminal window title.
    SetTitle(String),
    /// Clear the entire terminal screen.
    ClearScreen,
}

/// Mouse capture modes for the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Click, release, wheel, drag.
    CellMotion,
    /// All of the above plus hover motion. Required by `over`/`out` triggers.
    AllMotion,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// No-op command.
    pub fn none() -> Self {
        Command {
            inner: CommandInner::None,
        }
    }

    /// Run an async future, map the result to a message.
    pub fn perform<F, T>(future: F, map: impl FnOnce(T) -> Msg + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Command {
            inner: CommandInner::Future(Box::pin(async move { map(future.await) })),
        }
    }

    /// Send a message immediately.
    pub fn message(msg: Msg) -> Self {
        Command {
            inner: CommandInner::Action(Action::Message(msg)),
        }
    }

    /// Deliver `msg` once every message queued in the current turn has been
    /// processed.
    pub fn next_tick(msg: Msg) -> Self {
        Command {
            inner: CommandInner::NextTick(msg),
        }
    }

    /// Deliver `msg` after `after` unless [`Command::cancel_timer`] is issued
    /// for `id` first.
    pub fn timer(id: TimerId, after: Duration, msg: Msg) -> Self {
        Command {
            inner: CommandInner::Timer { id, after, msg },
        }
    }

    /// Cancel a timer scheduled with [`Command::timer`]. Unknown or already
    /// fired ids are ignored.
    pub fn cancel_timer(id: TimerId) -> Self {
        Command {
            inner: CommandInner::CancelTimer(id),
        }
    }

    /// Quit the program.
    pub fn quit() -> Self {
        Command {
            inner: CommandInner::Action(Action::Quit),
        }
    }

    /// Run multiple commands concurrently.
    pub fn batch(cmds: impl IntoIterator<Item = Command<Msg>>) -> Self {
        let mut cmds: Vec<_> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Command::none(),
            1 => cmds.pop().unwrap_or_else(Command::none),
            _ => Command {
                inner: CommandInner::Batch(cmds),
            },
        }
    }

    /// Run commands sequentially: each command's messages are delivered
    /// before the next command starts.
    pub fn sequence(cmds: impl IntoIterator<Item = Command<Msg>>) -> Self {
        let mut cmds: Vec<_> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Command::none(),
            1 => cmds.pop().unwrap_or_else(Command::none),
            _ => Command {
                inner: CommandInner::Sequence(cmds),
            },
        }
    }

    /// Terminal management command.
    pub fn terminal(cmd: TerminalCommand) -> Self {
        Command {
            inner: CommandInner::Terminal(cmd),
        }
    }

    /// Enable mouse capture including hover motion.
    pub fn enable_mouse_all() -> Self {
        Command::terminal(TerminalCommand::EnableMouseCapture(MouseMode::AllMotion))
    }

    /// Set the terminal window title.
    pub fn set_title(title: impl Into<String>) -> Self {
        Command::terminal(TerminalCommand::SetTitle(title.into()))
    }

    /// Transform the message type (for component composition).
    pub fn map<NewMsg: Send + 'static>(
        self,
        f: impl Fn(Msg) -> NewMsg + Send + Sync + 'static,
    ) -> Command<NewMsg> {
        self.map_with(std::sync::Arc::new(f))
    }

    fn map_with<NewMsg: Send + 'static>(
        self,
        f: std::sync::Arc<dyn Fn(Msg) -> NewMsg + Send + Sync>,
    ) -> Command<NewMsg> {
        let inner = match self.inner {
            CommandInner::None => CommandInner::None,
            CommandInner::Action(Action::Message(msg)) => {
                CommandInner::Action(Action::Message(f(msg)))
            }
            CommandInner::Action(Action::Quit) => CommandInner::Action(Action::Quit),
            CommandInner::Future(fut) => {
                CommandInner::Future(Box::pin(async move { f(fut.await) }))
            }
            CommandInner::Batch(cmds) => CommandInner::Batch(
                cmds.into_iter().map(|cmd| cmd.map_with(f.clone())).collect(),
            ),
            CommandInner::Sequence(cmds) => CommandInner::Sequence(
                cmds.into_iter().map(|cmd| cmd.map_with(f.clone())).collect(),
            ),
            CommandInner::Terminal(tcmd) => CommandInner::Terminal(tcmd),
            CommandInner::NextTick(msg) => CommandInner::NextTick(f(msg)),
            CommandInner::Timer { id, after, msg } => CommandInner::Timer {
                id,
                after,
                msg: f(msg),
            },
            CommandInner::CancelTimer(id) => CommandInner::CancelTimer(id),
        };
        Command { inner }
    }

    // --- Inspection methods (useful for testing) ---

    /// Returns `true` if this is a no-op command.
    pub fn is_none(&self) -> bool {
        matches!(self.inner, CommandInner::None)
    }

    /// If this command is an immediate message action, return it.
    pub fn into_message(self) -> Option<Msg> {
        match self.inner {
            CommandInner::Action(Action::Message(msg)) => Some(msg),
            _ => None,
        }
    }

    /// If this command is a batch, return the inner commands.
    pub fn into_batch(self) -> Option<Vec<Command<Msg>>> {
        match self.inner {
            CommandInner::Batch(cmds) => Some(cmds),
            _ => None,
        }
    }

    /// Every immediate message anywhere in this command tree, in order.
    pub fn into_messages(self) -> Vec<Msg> {
        match self.inner {
            CommandInner::Action(Action::Message(msg)) => vec![msg],
            CommandInner::Batch(cmds) | CommandInner::Sequence(cmds) => {
                cmds.into_iter().flat_map(Command::into_messages).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Every timer id scheduled anywhere in this command tree.
    pub fn scheduled_timers(&self) -> Vec<TimerId> {
        let mut out = Vec::new();
        self.walk(&mut |inner| {
            if let CommandInner::Timer { id, .. } = inner {
                out.push(*id);
            }
        });
        out
    }

    /// Every timer id cancelled anywhere in this command tree.
    pub fn cancelled_timers(&self) -> Vec<TimerId> {
        let mut out = Vec::new();
        self.walk(&mut |inner| {
            if let CommandInner::CancelTimer(id) = inner {
                out.push(*id);
            }
        });
        out
    }

    fn walk(&self, visit: &mut dyn FnMut(&CommandInner<Msg>)) {
        match &self.inner {
            CommandInner::Batch(cmds) | CommandInner::Sequence(cmds) => {
                for cmd in cmds {
                    cmd.walk(visit);
                }
            }
            other => visit(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_message_creates_action() {
        let cmd: Command<i32> = Command::message(42);
        assert_eq!(cmd.into_message(), Some(42));
    }

    #[test]
    fn batch_drops_noops_and_unwraps_single() {
        let cmd: Command<i32> = Command::batch(vec![Command::none(), Command::message(1)]);
        assert_eq!(cmd.into_message(), Some(1));

        let cmd: Command<i32> = Command::batch(vec![Command::none(), Command::none()]);
        assert!(cmd.is_none());
    }

    #[test]
    fn timer_ids_are_unique() {
        let a = TimerId::next();
        let b = TimerId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn map_preserves_timer_identity() {
        let id = TimerId::next();
        let cmd: Command<i32> = Command::timer(id, Duration::from_millis(10), 7);
        let mapped: Command<String> = cmd.map(|n| n.to_string());
        match mapped.inner {
            CommandInner::Timer { id: got, after, msg } => {
                assert_eq!(got, id);
                assert_eq!(after, Duration::from_millis(10));
                assert_eq!(msg, "7");
            }
            _ => panic!("expected mapped timer"),
        }
    }

    #[test]
    fn map_next_tick() {
        let cmd: Command<i32> = Command::next_tick(3);
        let mapped: Command<i64> = cmd.map(i64::from);
        assert!(matches!(mapped.inner, CommandInner::NextTick(3)));
    }

    #[test]
    fn inspection_walks_batches() {
        let a = TimerId::next();
        let b = TimerId::next();
        let cmd: Command<()> = Command::batch(vec![
            Command::timer(a, Duration::from_millis(5), ()),
            Command::sequence(vec![Command::cancel_timer(b), Command::message(())]),
        ]);
        assert_eq!(cmd.scheduled_timers(), vec![a]);
        assert_eq!(cmd.cancelled_timers(), vec![b]);
    }

    #[test]
    fn terminal_constructors() {
        let cmd: Command<()> = Command::enable_mouse_all();
        assert!(matches!(
            cmd.inner,
            CommandInner::Terminal(TerminalCommand::EnableMouseCapture(MouseMode::AllMotion))
        ));
        let cmd: Command<()> = Command::set_title("perch");
        match cmd.inner {
            CommandInner::Terminal(TerminalCommand::SetTitle(s)) => assert_eq!(s, "perch"),
            _ => panic!("expected SetTitle"),
        }
    }
}
