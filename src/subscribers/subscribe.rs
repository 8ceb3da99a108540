//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing relay events. Each subscriber is
//! driven by a dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block the scheduler nor other subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   If the queue overflows, events for that subscriber are dropped and a
//!   `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use tankrelay::subscribers::Subscribe;
//! use tankrelay::{Event, EventKind};
//!
//! struct Disconnects;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Disconnects {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ChannelDisconnected {
//!             // page someone
//!         }
//!     }
//!     fn name(&self) -> &'static str { "disconnects" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
