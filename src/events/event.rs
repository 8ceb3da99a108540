//! # Runtime events emitted by the relay.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Upstream events**: availability transitions of the multiplexed feed
//! - **Channel events**: endpoint creation and connectivity edges per channel
//! - **Fusion events**: discarded ids and stuck-value promotions
//! - **Runtime events**: shutdown and subscriber health
//!
//! The [`Event`] struct carries additional metadata such as timestamps, channel id,
//! field name, raw values and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use tankrelay::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ChannelDisconnected)
//!     .with_channel(2)
//!     .with_reason("watchdog expired");
//!
//! assert_eq!(ev.kind, EventKind::ChannelDisconnected);
//! assert_eq!(ev.channel, Some(2));
//! assert_eq!(ev.reason.as_deref(), Some("watchdog expired"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Upstream events ===
    /// Upstream handles were resolved (first time or after a loss).
    ///
    /// Sets:
    /// - `reason`: upstream address
    UpstreamAvailable,

    /// Upstream became unavailable. Published once per transition, never per tick.
    ///
    /// Sets:
    /// - `reason`: bus fault description
    UpstreamUnavailable,

    // === Channel events ===
    /// Downstream endpoint was created for a channel.
    ///
    /// Sets:
    /// - `channel`: channel id
    /// - `reason`: endpoint service name
    EndpointCreated,

    /// The downstream collaborator refused a create or write call.
    ///
    /// Sets:
    /// - `channel`: channel id
    /// - `reason`: publish error
    EndpointFailed,

    /// Channel connectivity flipped false → true.
    ///
    /// Sets:
    /// - `channel`: channel id
    ChannelConnected,

    /// Channel connectivity flipped true → false (watchdog expired).
    ///
    /// Sets:
    /// - `channel`: channel id
    ChannelDisconnected,

    /// An operator wrote a published field through the endpoint.
    ///
    /// Sets:
    /// - `channel`: channel id
    /// - `field`: endpoint field path
    /// - `value`: written value (numeric fields only)
    ExternalWrite,

    // === Fusion events ===
    /// A channel id outside the configured space was dropped.
    ///
    /// Sets:
    /// - `raw`: id as reported upstream
    ChannelOutOfRange,

    /// A polled value replaced a pending field stuck at the sentinel.
    ///
    /// Sets:
    /// - `field`: `"level"` or `"capacity"`
    /// - `value`: promoted value
    StuckValuePromoted,

    // === Runtime events ===
    /// Shutdown requested (OS signal or cancellation token).
    ShutdownRequested,

    /// The scheduler loop has exited.
    ///
    /// Sets:
    /// - `reason`: connected channels at exit
    RelayStopped,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and cause
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Channel the event refers to, if applicable.
    pub channel: Option<u32>,
    /// Field path or name, if applicable.
    pub field: Option<&'static str>,
    /// Raw upstream id (out-of-range drops).
    pub raw: Option<i64>,
    /// Numeric value attached to the event.
    pub value: Option<f64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            channel: None,
            field: None,
            raw: None,
            value: None,
            reason: None,
        }
    }

    /// Attaches a channel id.
    #[inline]
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Attaches a field name.
    #[inline]
    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    /// Attaches a raw upstream id.
    #[inline]
    pub fn with_raw(mut self, raw: i64) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Attaches a numeric value.
    #[inline]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// True for the two connectivity edges.
    #[inline]
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ChannelConnected | EventKind::ChannelDisconnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::UpstreamAvailable);
        let b = Event::new(EventKind::UpstreamUnavailable);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn overflow_event_names_subscriber() {
        let ev = Event::subscriber_overflow("log", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.reason.as_deref(), Some("subscriber=log reason=full"));
    }

    #[test]
    fn builder_sets_metadata() {
        let ev = Event::new(EventKind::StuckValuePromoted)
            .with_field("level")
            .with_value(42.0);
        assert_eq!(ev.field, Some("level"));
        assert_eq!(ev.value, Some(42.0));
        assert!(!ev.is_connectivity());
    }
}
