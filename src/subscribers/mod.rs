//! # Event subscribers.
//!
//! ```text
//! Relay components ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                   │              │
//!                                                   │        ┌─────┴─────┐
//!                                                   │        ▼           ▼
//!                                                   │    LogWriter     Custom ...
//!                                                   ▼
//!                                          ConnectivityTracker (updated inline)
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] bounded, panic-isolated fan-out
//! - `LogWriter` `tracing` output (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
