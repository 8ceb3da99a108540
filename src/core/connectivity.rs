//! # Channel connectivity tracker with sequence-based ordering.
//!
//! Read-side mirror of the per-channel connectivity flags, fed by the listener task
//! from `ChannelConnected` / `ChannelDisconnected` events. Lets code outside the
//! scheduler task query liveness without touching supervisor state.
//!
//! ```text
//! ChannelSupervisor ──► Bus ──► listener ──► ConnectivityTracker::update()
//!                                                    │
//!                                                    ▼
//!                                      HashMap<u32, {last_seq, connected}>
//! ```
//!
//! ## Rules
//! - Only connectivity events change state; others are ignored.
//! - Events with `seq <= last_seq` for their channel are rejected (stale).
//! - Reads are eventually consistent with the scheduler.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy)]
struct ChannelState {
    last_seq: u64,
    connected: bool,
}

/// Thread-safe view of which channels are connected.
#[derive(Debug, Default)]
pub struct ConnectivityTracker {
    state: RwLock<HashMap<u32, ChannelState>>,
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a connectivity event if it is newer than the last one seen for its channel.
    ///
    /// Returns `true` when the event was applied.
    pub async fn update(&self, ev: &Event) -> bool {
        let connected = match ev.kind {
            EventKind::ChannelConnected => true,
            EventKind::ChannelDisconnected => false,
            _ => return false,
        };
        let Some(channel) = ev.channel else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(channel).or_insert(ChannelState {
            last_seq: 0,
            connected: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        entry.connected = connected;
        true
    }

    /// Sorted ids of connected channels.
    pub async fn snapshot(&self) -> Vec<u32> {
        let state = self.state.read().await;
        let mut connected: Vec<u32> = state
            .iter()
            .filter(|(_, st)| st.connected)
            .map(|(id, _)| *id)
            .collect();
        connected.sort_unstable();
        connected
    }

    pub async fn is_connected(&self, channel: u32) -> bool {
        self.state
            .read()
            .await
            .get(&channel)
            .is_some_and(|st| st.connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = ConnectivityTracker::new();
        let up = Event::new(EventKind::ChannelConnected).with_channel(2);
        let down = Event::new(EventKind::ChannelDisconnected).with_channel(2);

        assert!(tracker.update(&down).await);
        assert!(!tracker.update(&up).await);
        assert!(!tracker.is_connected(2).await);
    }

    #[tokio::test]
    async fn snapshot_is_sorted() {
        let tracker = ConnectivityTracker::new();
        for ch in [4, 1, 3] {
            tracker
                .update(&Event::new(EventKind::ChannelConnected).with_channel(ch))
                .await;
        }
        tracker
            .update(&Event::new(EventKind::ChannelDisconnected).with_channel(3))
            .await;
        assert!(
            !tracker
                .update(&Event::new(EventKind::UpstreamAvailable).with_channel(1))
                .await
        );
        assert_eq!(tracker.snapshot().await, vec![1, 4]);
    }
}
