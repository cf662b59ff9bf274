use crate::command::Command;
use crate::subscription::Subscription;
use ratatui::{layout::Rect, Frame};

/// A reusable widget that renders into a given [`Rect`].
///
/// `Component` mirrors [`Model`](crate::Model) but its [`view`](Component::view)
/// receives the area to draw in, so a parent decides placement. Widgets that
/// own timers or pending property changes also get a [`dispose`](Component::dispose)
/// hook: the parent calls it when the widget goes away and executes the
/// returned command (usually timer cancellations).
///
/// # Composition pattern
///
/// Wrap the child's message type in a parent variant and lift commands with
/// [`Command::map`]:
///
/// ```rust,ignore
/// struct App { carousel: Carousel }
///
/// enum AppMsg { Carousel(carousel::Message) }
///
/// impl Model for App {
///     // ...
///     fn update(&mut self, msg: AppMsg) -> Command<AppMsg> {
///         match msg {
///             AppMsg::Carousel(m) => self.carousel.update(m).map(AppMsg::Carousel),
///         }
///     }
/// }
/// ```
pub trait Component: Send + 'static {
    /// The component's internal message type.
    type Message: Send + 'static;

    /// Process a message, mutate state, and return a [`Command`] for side effects.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Render into `area`. Implementations confine drawing to that rectangle.
    fn view(&self, frame: &mut Frame, area: Rect);

    /// Declare active subscriptions for this component.
    ///
    /// The parent collects child subscriptions and maps their messages.
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>> {
        vec![]
    }

    /// Whether this component currently captures keyboard input.
    fn focused(&self) -> bool {
        false
    }

    /// Tear the component down. Pending property changes are flushed and the
    /// returned command cancels any outstanding timers.
    fn dispose(&mut self) -> Command<Self::Message> {
        Command::none()
    }
}
