//! Stream throttling utilities

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most once per `duration`, keeping only the latest item
    fn throttle(self, duration: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, duration)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// A stream combinator that coalesces bursts into one item per interval
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        ended: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, duration: Duration) -> Self {
        let mut interval = interval(duration);
        // An idle stream emits its next item at once instead of bursting
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, ended: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain everything available, latest wins
        while !*this.ended {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.ended = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.ended { Poll::Ready(None) } else { Poll::Pending };
        }

        match this.interval.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(this.pending.take()),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::watch;
    use tokio_stream::wrappers::WatchStream;

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_to_latest() {
        let (tx, rx) = watch::channel(0u64);
        let mut ticks = WatchStream::new(rx).throttle(Duration::from_millis(100));

        assert_eq!(ticks.next().await, Some(0));
        for revision in 1..=5 {
            tx.send(revision).unwrap();
        }
        assert_eq!(ticks.next().await, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn ends_after_flushing_last_item() {
        let items = futures::stream::iter([1, 2, 3]);
        let collected: Vec<_> = items.throttle(Duration::from_millis(50)).collect().await;
        assert_eq!(collected, vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_stream_stays_pending() {
        let (_tx, rx) = watch::channel(0u64);
        let mut ticks = WatchStream::new(rx).throttle(Duration::from_millis(100));
        assert_eq!(ticks.next().await, Some(0));

        let idle = tokio::time::timeout(Duration::from_secs(5), ticks.next()).await;
        assert!(idle.is_err());
    }
}
