// SPDX-License-Identifier: Apache-2.0

//! Control-plane channels between a running source and its controller.
//!
//! The engine owns the mutable stats record and only ever hands out value
//! copies; a missed periodic publish is acceptable. The final publish is a
//! rendezvous: the engine blocks until the controller accepts the terminal
//! snapshot, so a controller must always keep a receiver ready for it.

use crate::bounded_channel::{BoundedReceiver, BoundedSender, SendError, bounded};

const CLEAR_CHAN_SIZE: usize = 1;

// Single slot: the observer sees the latest snapshot or nothing.
const STATS_CHAN_SIZE: usize = 1;

/// Value-copy snapshot of a source's counters and liveness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub name: String,
    pub messages_received: u64,
    pub messages_sent: u64,
    pub running: bool,
}

impl SourceStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages_received: 0,
            messages_sent: 0,
            running: false,
        }
    }

    /// Reset counters, keeping name and running state.
    pub fn clear(&mut self) {
        self.messages_received = 0;
        self.messages_sent = 0;
    }
}

pub struct MonitorChannel {
    clear_tx: BoundedSender<()>,
    clear_rx: BoundedReceiver<()>,
    stats_tx: BoundedSender<SourceStats>,
    stats_rx: BoundedReceiver<SourceStats>,
    final_tx: BoundedSender<SourceStats>,
    final_rx: BoundedReceiver<SourceStats>,
}

impl MonitorChannel {
    pub fn new() -> Self {
        let (clear_tx, clear_rx) = bounded(CLEAR_CHAN_SIZE);
        let (stats_tx, stats_rx) = bounded(STATS_CHAN_SIZE);
        // Rendezvous, so the final handoff completes only on receipt
        let (final_tx, final_rx) = bounded(0);

        Self {
            clear_tx,
            clear_rx,
            stats_tx,
            stats_rx,
            final_tx,
            final_rx,
        }
    }

    pub fn into_parts(self) -> (MonitorHandle, MonitorControl) {
        let handle = MonitorHandle {
            clear_tx: self.clear_tx,
            stats_rx: self.stats_rx,
            final_rx: self.final_rx,
        };
        let control = MonitorControl {
            clear_rx: self.clear_rx,
            stats_tx: self.stats_tx,
            final_tx: self.final_tx,
        };

        (handle, control)
    }
}

impl Default for MonitorChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller-side half.
pub struct MonitorHandle {
    clear_tx: BoundedSender<()>,
    stats_rx: BoundedReceiver<SourceStats>,
    final_rx: BoundedReceiver<SourceStats>,
}

impl MonitorHandle {
    /// Ask the source to zero its counters. Advisory: if a clear is already
    /// pending or the source is gone, this one is simply dropped.
    pub fn clear_stats(&self) {
        let _ = self.clear_tx.try_send(());
    }

    /// Wait for the next periodic snapshot.
    pub async fn next_stats(&mut self) -> Option<SourceStats> {
        self.stats_rx.next().await
    }

    /// Take a pending periodic snapshot without waiting.
    pub fn try_next_stats(&self) -> Option<SourceStats> {
        self.stats_rx.try_recv()
    }

    /// Accept the terminal snapshot. Every controller must reach this point
    /// once per run or the source task never finishes shutting down.
    pub async fn final_stats(&mut self) -> Option<SourceStats> {
        self.final_rx.next().await
    }
}

/// Source-side half, owned by the engine task.
pub struct MonitorControl {
    clear_rx: BoundedReceiver<()>,
    stats_tx: BoundedSender<SourceStats>,
    final_tx: BoundedSender<SourceStats>,
}

impl MonitorControl {
    /// Drain any pending clear signal. Returns true if one was observed.
    pub fn take_clear(&self) -> bool {
        let mut seen = false;
        while self.clear_rx.try_recv().is_some() {
            seen = true;
        }
        seen
    }

    /// Offer a snapshot copy to the observer. Dropped without waiting when
    /// the slot is still occupied or the observer went away.
    pub fn try_publish(&self, stats: &SourceStats) {
        let _ = self.stats_tx.try_send(stats.clone());
    }

    /// Blocking terminal handoff; consumes the control half so it can happen
    /// at most once.
    pub async fn publish_final(self, stats: SourceStats) -> Result<(), SendError> {
        self.final_tx.send(stats).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_ok, assert_pending, assert_ready, task::spawn};

    #[test]
    fn clear_is_drained_once() {
        let (handle, control) = MonitorChannel::new().into_parts();

        assert!(!control.take_clear());

        // repeated clears collapse into one observation
        handle.clear_stats();
        handle.clear_stats();
        assert!(control.take_clear());
        assert!(!control.take_clear());
    }

    #[test]
    fn clear_resets_counters_only() {
        let mut stats = SourceStats::new("src");
        stats.running = true;
        stats.messages_received = 5;
        stats.messages_sent = 3;

        stats.clear();

        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.messages_sent, 0);
        assert_eq!(stats.name, "src");
        assert!(stats.running);
    }

    #[test]
    fn publish_is_lossy_and_by_value() {
        let (handle, control) = MonitorChannel::new().into_parts();

        let mut stats = SourceStats::new("src");
        stats.messages_received = 1;
        control.try_publish(&stats);

        // slot occupied: this publish is dropped
        stats.messages_received = 2;
        control.try_publish(&stats);

        // mutating after publish never changes what the observer sees
        stats.messages_received = 99;

        let seen = handle.try_next_stats().unwrap();
        assert_eq!(seen.messages_received, 1);
        assert_eq!(handle.try_next_stats(), None);
    }

    #[tokio::test]
    async fn final_publish_blocks_until_accepted() {
        let (mut handle, control) = MonitorChannel::new().into_parts();

        let stats = SourceStats::new("src");
        let mut publish = spawn(async move { control.publish_final(stats).await });

        // nobody is receiving yet
        assert_pending!(publish.poll());

        let mut accept = spawn(async { handle.final_stats().await });
        let got = assert_ready!(accept.poll()).unwrap();
        assert_eq!(got.name, "src");

        assert!(publish.is_woken());
        assert_ok!(assert_ready!(publish.poll()));
    }

    #[tokio::test]
    async fn final_publish_errors_when_controller_gone() {
        let (handle, control) = MonitorChannel::new().into_parts();
        drop(handle);

        let res = control.publish_final(SourceStats::new("src")).await;
        assert_eq!(res, Err(crate::bounded_channel::SendError::Disconnected));
    }
}
