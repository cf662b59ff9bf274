use crate::command::{Action, Command, CommandInner, MouseMode, TerminalCommand, TimerId};
use crate::model::Model;
use crate::subscription::SubscriptionManager;
use crossterm::{
    cursor,
    event::{
        DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
        EnableFocusChange, EnableMouseCapture,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen, SetTitle,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::{HashMap, VecDeque};
use std::io::{self, stderr, stdout, Stderr, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

/// Where the UI is drawn. Use stderr when stdout is piped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    #[default]
    Stdout,
    Stderr,
}

enum Output {
    Stdout(Stdout),
    Stderr(Stderr),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::Stderr(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::Stderr(w) => w.flush(),
        }
    }
}

impl Output {
    fn new(target: OutputTarget) -> Self {
        match target {
            OutputTarget::Stdout => Output::Stdout(stdout()),
            OutputTarget::Stderr => Output::Stderr(stderr()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot install log subscriber: {0}")]
    Logging(String),
}

/// Configuration for a [`Program`].
///
/// ```rust,ignore
/// let opts = ProgramOptions {
///     title: Some("perch demo".into()),
///     log_file: Some("perch.log".into()),
///     ..ProgramOptions::default()
/// };
/// ```
pub struct ProgramOptions {
    /// Target frames per second (default 60, clamped to 1..=120).
    pub fps: u32,
    pub alt_screen: bool,
    /// Mouse capture. Hover triggers need [`MouseMode::AllMotion`], the default.
    pub mouse_mode: Option<MouseMode>,
    pub bracketed_paste: bool,
    pub focus_reporting: bool,
    pub title: Option<String>,
    /// Restore the terminal before the panic message is printed.
    pub catch_panics: bool,
    /// Quit on Ctrl+C delivered as a signal.
    pub handle_signals: bool,
    /// Send `tracing` output to this file. The filter is read from
    /// `PERCH_LOG` and defaults to `info`.
    pub log_file: Option<PathBuf>,
    pub output: OutputTarget,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            fps: 60,
            alt_screen: true,
            mouse_mode: Some(MouseMode::AllMotion),
            bracketed_paste: true,
            focus_reporting: false,
            title: None,
            catch_panics: true,
            handle_signals: true,
            log_file: None,
            output: OutputTarget::default(),
        }
    }
}

/// Install a global `tracing` subscriber writing to `path`.
///
/// Fails if the file cannot be opened or a subscriber is already installed.
pub fn init_logging(path: impl AsRef<Path>) -> Result<(), ProgramError> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;
    let filter = EnvFilter::try_from_env("PERCH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| ProgramError::Logging(e.to_string()))
}

/// Cloneable handle for talking to a running [`Program`] from other tasks.
#[derive(Clone)]
pub struct ProgramHandle<Msg: Send + 'static> {
    msg_tx: mpsc::UnboundedSender<Msg>,
    killed: Arc<AtomicBool>,
}

impl<Msg: Send + 'static> ProgramHandle<Msg> {
    /// Inject a message. Ignored once the program has exited.
    pub fn send(&self, msg: Msg) {
        let _ = self.msg_tx.send(msg);
    }

    /// Stop the program at the next loop iteration, skipping queued messages.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }
}

/// Owns the terminal and drives a [`Model`] until it quits.
///
/// Message order within a turn: a message from the channel is processed,
/// then every message its commands produce immediately, then the next-tick
/// queue (repeating until both are empty). Timers are tokio tasks tracked by
/// [`TimerId`] so they can be aborted; a delivery whose id is no longer
/// tracked is dropped.
pub struct Program<M: Model> {
    model: M,
    terminal: Terminal<CrosstermBackend<Output>>,
    msg_tx: mpsc::UnboundedSender<M::Message>,
    msg_rx: mpsc::UnboundedReceiver<M::Message>,
    timer_tx: mpsc::UnboundedSender<(TimerId, M::Message)>,
    timer_rx: mpsc::UnboundedReceiver<(TimerId, M::Message)>,
    timers: HashMap<TimerId, AbortHandle>,
    ready: VecDeque<M::Message>,
    deferred: Vec<M::Message>,
    subscription_manager: SubscriptionManager<M::Message>,
    options: ProgramOptions,
    needs_redraw: bool,
    should_quit: bool,
    killed: Arc<AtomicBool>,
}

impl<M: Model> Program<M> {
    pub fn new(flags: M::Flags) -> Result<Self, ProgramError> {
        Self::with_options(flags, ProgramOptions::default())
    }

    pub fn with_options(flags: M::Flags, options: ProgramOptions) -> Result<Self, ProgramError> {
        if let Some(path) = &options.log_file {
            init_logging(path)?;
        }

        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (model, init_cmd) = M::init(flags);
        let terminal = init_terminal(&options)?;
        let subscription_manager = SubscriptionManager::new(msg_tx.clone());

        let mut program = Self {
            model,
            terminal,
            msg_tx,
            msg_rx,
            timer_tx,
            timer_rx,
            timers: HashMap::new(),
            ready: VecDeque::new(),
            deferred: Vec::new(),
            subscription_manager,
            options,
            needs_redraw: true,
            should_quit: false,
            killed: Arc::new(AtomicBool::new(false)),
        };
        tracing::info!("program initialized");

        program.execute_command(init_cmd);
        program.run_turn();
        Ok(program)
    }

    pub fn handle(&self) -> ProgramHandle<M::Message> {
        ProgramHandle {
            msg_tx: self.msg_tx.clone(),
            killed: self.killed.clone(),
        }
    }

    /// Run until the model quits. Returns the final model.
    pub async fn run(mut self) -> Result<M, ProgramError> {
        let result = self.event_loop().await;

        tracing::info!("shutting down");
        self.subscription_manager.shutdown();
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        restore_terminal(self.options.alt_screen, self.options.output)?;
        result.map(|()| self.model)
    }

    async fn event_loop(&mut self) -> Result<(), ProgramError> {
        self.render()?;

        let fps = self.options.fps.clamp(1, 120);
        let mut frame_interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let handle_signals = self.options.handle_signals;

        loop {
            if self.should_quit || self.killed.load(Ordering::SeqCst) {
                return Ok(());
            }

            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c(), if handle_signals => {
                    tracing::info!("received ctrl+c");
                    return Ok(());
                }

                Some(msg) = self.msg_rx.recv() => {
                    self.ready.push_back(msg);
                    while let Ok(more) = self.msg_rx.try_recv() {
                        self.ready.push_back(more);
                    }
                    self.run_turn();
                }

                Some((id, msg)) = self.timer_rx.recv() => {
                    if self.timers.remove(&id).is_some() {
                        self.ready.push_back(msg);
                        self.run_turn();
                    } else {
                        tracing::trace!(timer = id.get(), "stale timer delivery dropped");
                    }
                }

                _ = frame_interval.tick() => {
                    if self.needs_redraw {
                        self.render()?;
                        self.needs_redraw = false;
                    }
                }
            }
        }
    }

    /// Process ready messages, then next-tick messages, until both queues
    /// are empty.
    fn run_turn(&mut self) {
        loop {
            while let Some(msg) = self.ready.pop_front() {
                let cmd = self.model.update(msg);
                self.execute_command(cmd);
                self.needs_redraw = true;
            }
            if self.deferred.is_empty() {
                break;
            }
            self.ready.extend(self.deferred.drain(..));
        }
        let subs = self.model.subscriptions();
        self.subscription_manager.reconcile(subs);
    }

    fn execute_command(&mut self, cmd: Command<M::Message>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Action(Action::Message(msg)) => self.ready.push_back(msg),
            CommandInner::Action(Action::Quit) => self.should_quit = true,
            CommandInner::NextTick(msg) => self.deferred.push(msg),
            CommandInner::Timer { id, after, msg } => self.schedule_timer(id, after, msg),
            CommandInner::CancelTimer(id) => {
                if let Some(timer) = self.timers.remove(&id) {
                    tracing::trace!(timer = id.get(), "timer cancelled");
                    timer.abort();
                }
            }
            CommandInner::Future(fut) => {
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(fut.await);
                });
            }
            CommandInner::Batch(cmds) => {
                for cmd in cmds {
                    self.execute_command(cmd);
                }
            }
            CommandInner::Sequence(cmds) => {
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    for cmd in cmds {
                        execute_sequential(cmd, &tx).await;
                    }
                });
            }
            CommandInner::Terminal(tcmd) => self.execute_terminal_command(tcmd),
        }
    }

    fn schedule_timer(&mut self, id: TimerId, after: Duration, msg: M::Message) {
        let tx = self.timer_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send((id, msg));
        });
        if let Some(previous) = self.timers.insert(id, task.abort_handle()) {
            previous.abort();
        }
        tracing::trace!(timer = id.get(), after_ms = after.as_millis() as u64, "timer scheduled");
    }

    fn execute_terminal_command(&mut self, cmd: TerminalCommand) {
        let mut writer = Output::new(self.options.output);
        let result = match cmd {
            TerminalCommand::EnterAltScreen => execute!(writer, EnterAlternateScreen),
            TerminalCommand::ExitAltScreen => execute!(writer, LeaveAlternateScreen),
            TerminalCommand::EnableMouseCapture(_) => execute!(writer, EnableMouseCapture),
            TerminalCommand::DisableMouse => execute!(writer, DisableMouseCapture),
            TerminalCommand::ShowCursor => execute!(writer, cursor::Show),
            TerminalCommand::HideCursor => execute!(writer, cursor::Hide),
            TerminalCommand::SetTitle(title) => execute!(writer, SetTitle(title)),
            TerminalCommand::ClearScreen => execute!(writer, Clear(ClearType::All)),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "terminal command failed");
        }
    }

    fn render(&mut self) -> Result<(), ProgramError> {
        self.terminal.draw(|frame| self.model.view(frame))?;
        Ok(())
    }
}

/// One step of a [`Command::sequence`]. Scheduling and terminal commands
/// need the program itself and are not supported inside sequences; next-tick
/// messages are delivered as ordinary messages.
fn execute_sequential<Msg: Send + 'static>(
    cmd: Command<Msg>,
    tx: &mpsc::UnboundedSender<Msg>,
) -> futures::future::BoxFuture<'_, ()> {
    Box::pin(async move {
        match cmd.inner {
            CommandInner::Action(Action::Message(msg)) | CommandInner::NextTick(msg) => {
                let _ = tx.send(msg);
            }
            CommandInner::Future(fut) => {
                let _ = tx.send(fut.await);
            }
            CommandInner::Batch(cmds) => {
                let steps = cmds.into_iter().map(|cmd| execute_sequential(cmd, tx));
                futures::future::join_all(steps).await;
            }
            CommandInner::Sequence(cmds) => {
                for cmd in cmds {
                    execute_sequential(cmd, tx).await;
                }
            }
            CommandInner::Timer { id, .. } | CommandInner::CancelTimer(id) => {
                tracing::warn!(timer = id.get(), "timer command inside a sequence ignored");
            }
            CommandInner::None
            | CommandInner::Action(Action::Quit)
            | CommandInner::Terminal(_) => {}
        }
    })
}

fn init_terminal(
    options: &ProgramOptions,
) -> Result<Terminal<CrosstermBackend<Output>>, ProgramError> {
    if options.catch_panics {
        use std::sync::Once;
        static HOOK_INSTALLED: Once = Once::new();
        let alt_screen = options.alt_screen;
        let output = options.output;
        HOOK_INSTALLED.call_once(|| {
            let original_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let _ = restore_terminal(alt_screen, output);
                original_hook(info);
            }));
        });
    }

    enable_raw_mode()?;
    let mut writer = Output::new(options.output);
    if options.alt_screen {
        execute!(writer, EnterAlternateScreen)?;
    }
    if options.bracketed_paste {
        execute!(writer, EnableBracketedPaste)?;
    }
    if options.mouse_mode.is_some() {
        execute!(writer, EnableMouseCapture)?;
    }
    if options.focus_reporting {
        execute!(writer, EnableFocusChange)?;
    }
    if let Some(title) = &options.title {
        execute!(writer, SetTitle(title))?;
    }
    execute!(writer, cursor::Hide)?;

    Ok(Terminal::new(CrosstermBackend::new(writer))?)
}

/// Best effort: every step runs even if an earlier one failed.
fn restore_terminal(alt_screen: bool, output: OutputTarget) -> Result<(), io::Error> {
    let raw = disable_raw_mode();
    let mut writer = Output::new(output);
    execute!(writer, DisableBracketedPaste).ok();
    execute!(writer, DisableMouseCapture).ok();
    execute!(writer, DisableFocusChange).ok();
    execute!(writer, cursor::Show).ok();
    if alt_screen {
        execute!(writer, LeaveAlternateScreen).ok();
    }
    raw
}
