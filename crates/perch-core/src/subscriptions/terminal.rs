use crate::event::TerminalEvent;
use crate::subscription::{forward, Subscription, SubscriptionId};
use crossterm::event::EventStream;
use futures::StreamExt;
use tokio::sync::mpsc;

/// Marker type identifying the terminal input subscription.
pub struct TerminalEvents;

/// Terminal input (keys, mouse, resize, focus, paste), mapped through `map`.
/// Returning `None` drops the event.
///
/// A stage usually wants everything:
///
/// ```rust,ignore
/// fn subscriptions(&self) -> Vec<Subscription<Msg>> {
///     vec![terminal_events(|e| Some(Msg::Stage(stage::Message::Terminal(e))))]
/// }
/// ```
pub fn terminal_events<Msg: Send + 'static>(
    map: impl Fn(TerminalEvent) -> Option<Msg> + Send + Sync + 'static,
) -> Subscription<Msg> {
    Subscription {
        id: SubscriptionId::of::<TerminalEvents>(),
        // Built only when the subscription starts. A fresh EventStream on
        // every `subscriptions()` call would disturb the reader already polling.
        spawn: Box::new(move |tx: mpsc::UnboundedSender<Msg>| {
            let events = EventStream::new().filter_map(move |read| {
                let msg = match read {
                    Ok(event) => map(TerminalEvent::from(event)),
                    Err(e) => {
                        tracing::warn!(error = %e, "terminal read failed");
                        None
                    }
                };
                futures::future::ready(msg)
            });
            forward(Box::pin(events), tx)
        }),
    }
}
