use crate::command::Command;
use crate::subscription::Subscription;
use ratatui::Frame;

/// The top-level application trait.
///
/// The runtime drives an **init → update → view** cycle:
///
/// 1. [`init`](Model::init) builds the initial state (typically a
///    [`Scene`](crate::Scene) with its elements and the widgets attached to it).
/// 2. [`view`](Model::view) renders the state to a [`ratatui::Frame`].
/// 3. Input arrives through [`Subscription`]s as messages.
/// 4. [`update`](Model::update) routes each message to the widgets and returns
///    their [`Command`]s.
///
/// # Example
///
/// ```rust,ignore
/// use perch_core::{Command, Model};
/// use ratatui::Frame;
///
/// struct Counter { count: i32 }
///
/// enum Msg { Increment }
///
/// impl Model for Counter {
///     type Message = Msg;
///     type Flags = ();
///
///     fn init(_: ()) -> (Self, Command<Msg>) {
///         (Counter { count: 0 }, Command::none())
///     }
///
///     fn update(&mut self, msg: Msg) -> Command<Msg> {
///         match msg {
///             Msg::Increment => self.count += 1,
///         }
///         Command::none()
///     }
///
///     fn view(&self, frame: &mut Frame) {
///         frame.render_widget(format!("{}", self.count), frame.area());
///     }
/// }
/// ```
pub trait Model: Sized + Send + 'static {
    /// The application's message type.
    type Message: Send + 'static;

    /// Initialization data passed to [`Model::init`]. Use `()` when none is needed.
    type Flags: Send + 'static;

    /// Create the initial model state and an optional startup command.
    fn init(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Process a message, mutate state, and return a command for side effects.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Render the current state. Must be a pure function of `&self`.
    fn view(&self, frame: &mut Frame);

    /// Declare active subscriptions. Called after every update; the runtime
    /// starts new ones and cancels those no longer returned.
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>> {
        vec![]
    }
}
