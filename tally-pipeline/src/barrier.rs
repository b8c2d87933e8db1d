//! Completion barrier for a burst.
//!
//! A burst of `expected` sends is complete once every send has resolved
//! (queued or dropped) and every queued send has had its delivery outcome
//! observed. If the delivery stream closes early, the barrier stops waiting
//! on outcomes that can no longer arrive.

use std::sync::Arc;

use tokio::sync::watch;

/// Snapshot of a burst's accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstProgress {
    pub expected: usize,
    /// Sends handed to the broker client
    pub submitted: usize,
    /// Sends that never reached the broker client (encode or queue failure)
    pub dropped: usize,
    /// Delivery outcomes seen by the tracker
    pub observed: usize,
    /// The delivery stream has ended
    pub closed: bool,
}

impl BurstProgress {
    pub const fn resolved(&self) -> usize {
        self.submitted + self.dropped
    }

    /// Queued sends whose outcome has not been seen.
    pub const fn unobserved(&self) -> usize {
        self.submitted.saturating_sub(self.observed)
    }

    pub const fn is_complete(&self) -> bool {
        self.resolved() >= self.expected && (self.observed >= self.submitted || self.closed)
    }
}

#[derive(Debug, Clone)]
pub struct BurstBarrier {
    state: Arc<watch::Sender<BurstProgress>>,
}

impl BurstBarrier {
    #[must_use]
    pub fn new(expected: usize) -> Self {
        let (state, _) = watch::channel(BurstProgress {
            expected,
            ..BurstProgress::default()
        });

        Self {
            state: Arc::new(state),
        }
    }

    /// A guard for one send. It counts as dropped unless
    /// [`Participant::submitted`] is called.
    #[must_use]
    pub fn participant(&self) -> Participant {
        Participant {
            barrier: self.clone(),
            resolved: false,
        }
    }

    pub fn record_submitted(&self) {
        self.state.send_modify(|progress| progress.submitted += 1);
    }

    pub fn record_dropped(&self) {
        self.state.send_modify(|progress| progress.dropped += 1);
    }

    pub fn record_observed(&self) {
        self.state.send_modify(|progress| progress.observed += 1);
    }

    /// No further outcomes will be observed.
    pub fn close(&self) {
        self.state.send_modify(|progress| progress.closed = true);
    }

    #[must_use]
    pub fn progress(&self) -> BurstProgress {
        *self.state.borrow()
    }

    /// Wait until the burst is complete.
    pub async fn wait(&self) -> BurstProgress {
        let mut updates = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let complete = updates
            .wait_for(BurstProgress::is_complete)
            .await
            .map(|progress| *progress);

        complete.unwrap_or_else(|_| self.progress())
    }
}

/// Resolves one send against its [`BurstBarrier`] exactly once.
///
/// Dropping the guard without calling [`Participant::submitted`] records the
/// send as dropped, so a send that errors, panics or is cancelled still
/// resolves.
#[derive(Debug)]
pub struct Participant {
    barrier: BurstBarrier,
    resolved: bool,
}

impl Participant {
    pub fn submitted(mut self) {
        self.resolved = true;
        self.barrier.record_submitted();
    }
}

impl Drop for Participant {
    fn drop(&mut self) {
        if !self.resolved {
            self.barrier.record_dropped();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_burst_is_complete() {
        assert!(BurstBarrier::new(0).progress().is_complete());
    }

    #[test]
    fn participants_resolve_once() {
        let barrier = BurstBarrier::new(3);
        barrier.participant().submitted();
        drop(barrier.participant());
        {
            let _unresolved = barrier.participant();
        }

        let progress = barrier.progress();
        assert_eq!(progress.submitted, 1);
        assert_eq!(progress.dropped, 2);
        assert_eq!(progress.resolved(), 3);
        assert!(!progress.is_complete());

        barrier.record_observed();
        assert!(barrier.progress().is_complete());
    }

    #[test]
    fn close_releases_unobserved() {
        let barrier = BurstBarrier::new(2);
        barrier.record_submitted();
        barrier.record_submitted();
        barrier.record_observed();
        assert!(!barrier.progress().is_complete());

        barrier.close();
        let progress = barrier.progress();
        assert!(progress.is_complete());
        assert_eq!(progress.unobserved(), 1);
    }

    #[tokio::test]
    async fn wait_returns_on_completion() {
        let barrier = BurstBarrier::new(1);
        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait().await })
        };

        barrier.participant().submitted();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        barrier.record_observed();
        let progress = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("barrier released")
            .expect("join");
        assert_eq!(progress.observed, 1);
    }
}
