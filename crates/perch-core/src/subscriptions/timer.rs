use crate::subscription::{SubscriptionId, SubscriptionSource};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::{Duration, Instant};

/// A repeating timer.
///
/// `key` separates timers of the same interval; widgets pass their
/// component id so two carousels never share one autoplay clock.
/// The first tick fires one interval after the subscription starts.
///
/// ```rust,ignore
/// subscribe(Every::new(Duration::from_secs(3), self.life.id().get()))
///     .map(|_| Message::Autoplay)
/// ```
pub struct Every {
    pub interval: Duration,
    pub key: u64,
}

impl Every {
    pub fn new(interval: Duration, key: u64) -> Self {
        Self { interval, key }
    }
}

impl SubscriptionSource for Every {
    type Output = Instant;

    fn id(&self) -> SubscriptionId {
        SubscriptionId::new::<Self>(self.key)
    }

    fn stream(self) -> BoxStream<'static, Instant> {
        let start = tokio::time::Instant::now() + self.interval;
        let ticks = tokio::time::interval_at(start, self.interval);
        Box::pin(tokio_stream::wrappers::IntervalStream::new(ticks).map(|t| t.into_std()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_identity() {
        let a = Every::new(Duration::from_secs(1), 7);
        let b = Every::new(Duration::from_secs(2), 7);
        let c = Every::new(Duration::from_secs(1), 8);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let started = tokio::time::Instant::now();
        let mut stream = Every::new(Duration::from_millis(50), 1).stream();
        stream.next().await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
