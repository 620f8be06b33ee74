//! Broadcast channel for tracker notices.
//!
//! [`NoticeBus`] wraps a [`tokio::sync::broadcast`] channel. Trackers
//! publish a [`TrackerNotice`] after every displayable change and any
//! number of renderers subscribe.

use tokio::sync::broadcast;

use super::TrackerNotice;

/// Broadcast bus for [`TrackerNotice`]s.
///
/// When the ring buffer is full, the oldest notices are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct NoticeBus {
    sender: broadcast::Sender<TrackerNotice>,
}

impl NoticeBus {
    /// Creates a new `NoticeBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a notice to all subscribers.
    ///
    /// Returns the number of receivers that got the notice. Without
    /// receivers the notice is silently dropped.
    pub fn publish(&self, notice: TrackerNotice) -> usize {
        tracing::debug!(notice = notice.notice_type_str(), "publishing notice");
        self.sender.send(notice).unwrap_or(0)
    }

    /// Creates a receiver for all future notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerNotice> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
