//! # Logging subscriber.
//!
//! [`LogWriter`] renders relay events through [`tracing`]. The library never installs
//! a global `tracing` subscriber; binaries decide where the records go.
//!
//! ## Levels
//! ```text
//! info   upstream available, endpoint created, channel connected, shutdown, stopped
//! warn   upstream unavailable, endpoint failed, channel disconnected,
//!        subscriber panicked / overflow
//! debug  out-of-range id, stuck-value promotion, external write
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that turns relay events into `tracing` records (target `tankrelay`).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::UpstreamAvailable => {
                info!(target: "tankrelay", seq = e.seq, upstream = reason, "upstream available");
            }
            EventKind::UpstreamUnavailable => {
                warn!(target: "tankrelay", seq = e.seq, reason, "upstream unavailable");
            }
            EventKind::EndpointCreated => {
                info!(target: "tankrelay", seq = e.seq, channel = e.channel, service = reason, "endpoint created");
            }
            EventKind::EndpointFailed => {
                warn!(target: "tankrelay", seq = e.seq, channel = e.channel, field = e.field, reason, "endpoint call failed");
            }
            EventKind::ChannelConnected => {
                info!(target: "tankrelay", seq = e.seq, channel = e.channel, "channel connected");
            }
            EventKind::ChannelDisconnected => {
                warn!(target: "tankrelay", seq = e.seq, channel = e.channel, "channel disconnected");
            }
            EventKind::ExternalWrite => {
                debug!(target: "tankrelay", seq = e.seq, channel = e.channel, field = e.field, value = e.value, "external write");
            }
            EventKind::ChannelOutOfRange => {
                debug!(target: "tankrelay", seq = e.seq, raw = e.raw, "channel id out of range, dropped");
            }
            EventKind::StuckValuePromoted => {
                debug!(target: "tankrelay", seq = e.seq, field = e.field, value = e.value, "promoted polled value");
            }
            EventKind::ShutdownRequested => {
                info!(target: "tankrelay", seq = e.seq, "shutdown requested");
            }
            EventKind::RelayStopped => {
                info!(target: "tankrelay", seq = e.seq, connected = reason, "relay stopped");
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                warn!(target: "tankrelay", seq = e.seq, kind = ?e.kind, reason, "subscriber fault");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
