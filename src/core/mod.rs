//! Runtime core: scheduling and lifecycle.
//!
//! - [`relay`]: the single-task scheduler and its step methods;
//! - [`builder`]: validates [`Config`] and assembles a [`Relay`];
//! - [`inlet`]: inbound queue fed by transports;
//! - [`connectivity`]: read-side connectivity view;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod config;
mod connectivity;
mod inlet;
mod relay;
mod shutdown;

pub use builder::RelayBuilder;
pub use config::Config;
pub use connectivity::ConnectivityTracker;
pub use inlet::{Inbound, Inlet};
pub use relay::Relay;
