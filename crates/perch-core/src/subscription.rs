use futures::stream::BoxStream;
use futures::StreamExt;
use std::any::TypeId;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// A long-lived event source owned by the runtime.
///
/// Models return their subscriptions from
/// [`Model::subscriptions`](crate::Model::subscriptions) after every update.
/// The runtime keeps the ones whose [`SubscriptionId`] it already runs,
/// starts the new ones and aborts the ones that disappeared. A carousel
/// pausing autoplay therefore simply stops returning its timer.
pub struct Subscription<Msg: Send + 'static> {
    pub(crate) id: SubscriptionId,
    pub(crate) spawn: Box<dyn FnOnce(mpsc::UnboundedSender<Msg>) -> AbortHandle + Send>,
}

/// Identity used to diff subscriptions between updates: the source type
/// plus a key distinguishing instances of the same source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    source: TypeId,
    key: u64,
}

impl SubscriptionId {
    pub fn new<T: 'static>(key: u64) -> Self {
        Self {
            source: TypeId::of::<T>(),
            key,
        }
    }

    /// Identity of a source that only ever runs once.
    pub fn of<T: 'static>() -> Self {
        Self::new::<T>(0)
    }

    pub fn key(&self) -> u64 {
        self.key
    }
}

/// A type that can be turned into a message stream.
pub trait SubscriptionSource: Send + 'static {
    type Output: Send + 'static;

    fn id(&self) -> SubscriptionId;

    /// Called once, when the subscription starts.
    fn stream(self) -> BoxStream<'static, Self::Output>;
}

/// Wrap a [`SubscriptionSource`] as a [`Subscription`].
pub fn subscribe<S: SubscriptionSource>(source: S) -> Subscription<S::Output> {
    let id = source.id();
    Subscription {
        id,
        spawn: Box::new(move |tx| forward(source.stream(), tx)),
    }
}

/// Drive `stream` on a task, sending every item to `tx` until the receiver
/// goes away.
pub(crate) fn forward<Msg: Send + 'static>(
    mut stream: BoxStream<'static, Msg>,
    tx: mpsc::UnboundedSender<Msg>,
) -> AbortHandle {
    tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            if tx.send(msg).is_err() {
                break;
            }
        }
    })
    .abort_handle()
}

impl<Msg: Send + 'static> Subscription<Msg> {
    pub fn from_stream(id: SubscriptionId, stream: BoxStream<'static, Msg>) -> Self {
        Subscription {
            id,
            spawn: Box::new(move |tx| forward(stream, tx)),
        }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Transform the message type (for component composition).
    pub fn map<NewMsg: Send + 'static>(
        self,
        f: impl Fn(Msg) -> NewMsg + Send + Sync + 'static,
    ) -> Subscription<NewMsg> {
        let Subscription { id, spawn } = self;
        Subscription {
            id,
            spawn: Box::new(move |outer: mpsc::UnboundedSender<NewMsg>| {
                let (tx, rx) = mpsc::unbounded_channel::<Msg>();
                let source = spawn(tx);
                // Ends on its own once the source task drops `tx`.
                let mapped = tokio_stream::wrappers::UnboundedReceiverStream::new(rx).map(f);
                forward(Box::pin(mapped), outer);
                source
            }),
        }
    }
}

/// Running subscriptions keyed by identity.
pub(crate) struct SubscriptionManager<Msg: Send + 'static> {
    active: HashMap<SubscriptionId, AbortHandle>,
    msg_tx: mpsc::UnboundedSender<Msg>,
}

impl<Msg: Send + 'static> SubscriptionManager<Msg> {
    pub fn new(msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self {
            active: HashMap::new(),
            msg_tx,
        }
    }

    pub fn reconcile(&mut self, wanted: Vec<Subscription<Msg>>) {
        let mut wanted: HashMap<SubscriptionId, Subscription<Msg>> =
            wanted.into_iter().map(|s| (s.id.clone(), s)).collect();

        self.active.retain(|id, handle| {
            let keep = wanted.remove(id).is_some();
            if !keep {
                tracing::trace!(key = id.key, "subscription stopped");
                handle.abort();
            }
            keep
        });

        for (id, sub) in wanted {
            tracing::trace!(key = id.key, "subscription started");
            let handle = (sub.spawn)(self.msg_tx.clone());
            self.active.insert(id, handle);
        }
    }

    pub fn shutdown(&mut self) {
        for (_, handle) in self.active.drain() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(key: u64) -> Subscription<i32> {
        Subscription::from_stream(
            SubscriptionId::new::<String>(key),
            Box::pin(futures::stream::pending()),
        )
    }

    #[test]
    fn ids_compare_by_source_and_key() {
        assert_eq!(SubscriptionId::of::<String>(), SubscriptionId::new::<String>(0));
        assert_ne!(SubscriptionId::of::<String>(), SubscriptionId::of::<i32>());
        assert_ne!(SubscriptionId::new::<String>(1), SubscriptionId::new::<String>(2));
    }

    #[tokio::test]
    async fn reconcile_starts_keeps_and_stops() {
        let (tx, _rx) = mpsc::unbounded_channel::<i32>();
        let mut manager = SubscriptionManager::new(tx);

        manager.reconcile(vec![pending(1), pending(2)]);
        assert_eq!(manager.active_count(), 2);

        manager.reconcile(vec![pending(2)]);
        assert_eq!(manager.active_count(), 1);

        manager.shutdown();
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn mapped_subscription_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut manager = SubscriptionManager::new(tx);
        let sub = Subscription::from_stream(
            SubscriptionId::of::<u8>(),
            Box::pin(futures::stream::iter(vec![1, 2])),
        )
        .map(|n: i32| format!("n{n}"));
        manager.reconcile(vec![sub]);
        assert_eq!(rx.recv().await.as_deref(), Some("n1"));
        assert_eq!(rx.recv().await.as_deref(), Some("n2"));
    }
}
