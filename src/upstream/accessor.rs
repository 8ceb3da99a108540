//! # Upstream feed accessor
//!
//! Holds cached handles to the three upstream fields plus the origin id of the
//! connection that owns the address.
//!
//! ## Lifecycle
//! ```text
//!            ensure_resolved() ok
//!   Unknown ───────────────────────► Available ◄──────────┐
//!      │                                │                  │ ensure_resolved() ok
//!      │ ensure_resolved() fails        │ read fault /     │
//!      ▼                                ▼ invalidate()     │
//!   Unavailable ◄──────────────────── (handles dropped) ───┘
//! ```
//!
//! ## Rules
//! - `ensure_resolved()` is idempotent and attempts resolution at most once per call;
//!   the scheduler calls it once per poll tick (no backoff, no busy loop).
//! - Any bus fault drops every handle; the next `ensure_resolved()` starts over.
//!   This is the only recovery path after the upstream restarts.
//! - `UpstreamAvailable` / `UpstreamUnavailable` are published on transitions only.

use std::sync::Arc;

use crate::error::{BusFault, RelayError};
use crate::events::{Bus, Event, EventKind};

use super::bus::{Handle, UpstreamBus};
use super::value::{Field, OriginId, Value};

/// Upstream reachability as last observed by the accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No resolution attempted yet.
    Unknown,
    Available,
    Unavailable,
}

/// Handles cached after a successful resolution.
#[derive(Debug, Clone)]
pub struct FeedHandles {
    pub channel_id: Handle,
    pub level: Handle,
    pub capacity: Handle,
    pub origin: OriginId,
}

impl FeedHandles {
    fn get(&self, field: Field) -> &Handle {
        match field {
            Field::ChannelId => &self.channel_id,
            Field::Level => &self.level,
            Field::Capacity => &self.capacity,
        }
    }
}

/// Resolves and caches upstream field handles; single writer (the scheduler task).
pub struct FeedAccessor {
    bus: Arc<dyn UpstreamBus>,
    address: Arc<str>,
    handles: Option<FeedHandles>,
    availability: Availability,
    events: Bus,
}

impl FeedAccessor {
    pub fn new(bus: Arc<dyn UpstreamBus>, address: impl Into<Arc<str>>, events: Bus) -> Self {
        Self {
            bus,
            address: address.into(),
            handles: None,
            availability: Availability::Unknown,
            events,
        }
    }

    /// Resolves all three handles and the owner id unless already cached.
    ///
    /// On failure nothing is cached and [`RelayError::UpstreamUnavailable`] is returned.
    pub async fn ensure_resolved(&mut self) -> Result<(), RelayError> {
        if self.handles.is_some() {
            return Ok(());
        }
        match self.resolve_all().await {
            Ok(handles) => {
                self.handles = Some(handles);
                self.mark_available();
                Ok(())
            }
            Err(fault) => {
                self.mark_unavailable(&fault);
                Err(self.unavailable(fault.reason))
            }
        }
    }

    /// Drops cached handles so the next [`ensure_resolved`](Self::ensure_resolved) retries.
    ///
    /// Returns `true` if handles were cached before the call.
    pub fn invalidate(&mut self, fault: &BusFault) -> bool {
        let was_resolved = self.handles.take().is_some();
        self.mark_unavailable(fault);
        was_resolved
    }

    /// Reads one field through its cached handle; a fault invalidates the accessor.
    pub async fn read(&mut self, field: Field) -> Result<Value, RelayError> {
        let handle = match &self.handles {
            Some(handles) => handles.get(field).clone(),
            None => return Err(self.unavailable("handles not resolved".to_string())),
        };
        match self.bus.read(&handle).await {
            Ok(value) => Ok(value),
            Err(fault) => {
                self.invalidate(&fault);
                Err(self.unavailable(fault.reason))
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.handles.is_some()
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    /// Origin id of the resolved owner; `None` while unresolved.
    pub fn origin(&self) -> Option<&OriginId> {
        self.handles.as_ref().map(|h| &h.origin)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn resolve_all(&self) -> Result<FeedHandles, BusFault> {
        let address = self.address.as_ref();
        let channel_id = self.bus.resolve(address, Field::ChannelId).await?;
        let level = self.bus.resolve(address, Field::Level).await?;
        let capacity = self.bus.resolve(address, Field::Capacity).await?;
        let origin = self.bus.owner(address).await?;
        Ok(FeedHandles {
            channel_id,
            level,
            capacity,
            origin,
        })
    }

    fn mark_available(&mut self) {
        if self.availability != Availability::Available {
            self.availability = Availability::Available;
            self.events.publish(
                Event::new(EventKind::UpstreamAvailable).with_reason(self.address.as_ref()),
            );
        }
    }

    fn mark_unavailable(&mut self, fault: &BusFault) {
        if self.availability != Availability::Unavailable {
            self.availability = Availability::Unavailable;
            self.events.publish(
                Event::new(EventKind::UpstreamUnavailable)
                    .with_reason(format!("{}: {}", self.address, fault.reason)),
            );
        }
    }

    fn unavailable(&self, reason: String) -> RelayError {
        RelayError::UpstreamUnavailable {
            address: self.address.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFeed;

    const ADDR: &str = "com.example.feed";

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test]
    async fn absent_upstream_is_reported_once() {
        let feed = Arc::new(MemoryFeed::new(ADDR));
        let events = Bus::new(16);
        let mut rx = events.subscribe();
        let mut accessor = FeedAccessor::new(feed, ADDR, events);

        for _ in 0..5 {
            assert!(accessor.ensure_resolved().await.is_err());
        }
        assert_eq!(accessor.availability(), Availability::Unavailable);
        assert_eq!(drain(&mut rx), vec![EventKind::UpstreamUnavailable]);
    }

    #[tokio::test]
    async fn read_fault_invalidates_and_recovers() {
        let feed = Arc::new(MemoryFeed::new(ADDR));
        feed.set_present(true);
        feed.set_fields(1, 80, 500);
        let events = Bus::new(16);
        let mut rx = events.subscribe();
        let mut accessor = FeedAccessor::new(feed.clone(), ADDR, events);

        accessor.ensure_resolved().await.expect("resolves");
        assert_eq!(accessor.read(Field::Level).await, Ok(Value::Int(80)));

        feed.set_present(false);
        assert!(accessor.read(Field::Level).await.is_err());
        assert!(!accessor.is_resolved());
        assert!(accessor.origin().is_none());

        feed.set_present(true);
        accessor.ensure_resolved().await.expect("re-resolves");
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::UpstreamAvailable,
                EventKind::UpstreamUnavailable,
                EventKind::UpstreamAvailable,
            ]
        );
    }

    #[tokio::test]
    async fn ensure_resolved_is_idempotent() {
        let feed = Arc::new(MemoryFeed::new(ADDR));
        feed.set_present(true);
        let mut accessor = FeedAccessor::new(feed.clone(), ADDR, Bus::new(4));

        accessor.ensure_resolved().await.expect("resolves");
        let calls = feed.resolve_calls();
        accessor.ensure_resolved().await.expect("cached");
        assert_eq!(feed.resolve_calls(), calls);
    }
}
