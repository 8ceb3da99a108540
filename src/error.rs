//! Error types used by the relay runtime and its collaborators.
//!
//! This module defines:
//!
//! - [`RelayError`]: the recoverable conditions met while reconciling the upstream feed
//!   (upstream unavailable, torn read, out-of-range channel). None of them is fatal.
//! - [`BusFault`]: a failure reported by the upstream bus collaborator.
//! - [`PublishError`]: a failure reported by the downstream publish collaborator.
//! - [`RuntimeError`]: bootstrap failures (invalid configuration, signal setup); the only fatal path.
//! - [`InletError`]: a transport could not hand an inbound item to the relay.
//!
//! The enums provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// # Recoverable conditions raised while reading and reconciling the upstream feed.
///
/// Every variant is handled locally by the scheduler: the cycle that produced it is
/// dropped and the next tick retries. Users observe failures only through the
/// per-channel connectivity flag.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    /// Upstream address does not exist or a read/resolve call faulted.
    #[error("upstream {address} unavailable: {reason}")]
    UpstreamUnavailable {
        /// Upstream address that was being watched.
        address: String,
        /// Fault reported by the bus.
        reason: String,
    },

    /// The feed switched channels between the two channel-id reads.
    #[error("torn read: channel id changed from {first} to {second}")]
    TornRead {
        /// Channel id read before the data fields.
        first: i64,
        /// Channel id read after the data fields.
        second: i64,
    },

    /// Channel id outside the configured channel space.
    #[error("channel {raw} outside configured space 0..{limit}")]
    OutOfRangeChannel {
        /// Raw id as reported upstream.
        raw: i64,
        /// Size of the configured channel space.
        limit: u32,
    },
}

impl RelayError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tankrelay::RelayError;
    ///
    /// let err = RelayError::TornRead { first: 3, second: 5 };
    /// assert_eq!(err.as_label(), "relay_torn_read");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RelayError::UpstreamUnavailable { .. } => "relay_upstream_unavailable",
            RelayError::TornRead { .. } => "relay_torn_read",
            RelayError::OutOfRangeChannel { .. } => "relay_out_of_range_channel",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RelayError::UpstreamUnavailable { address, reason } => {
                format!("upstream={address} reason={reason}")
            }
            RelayError::TornRead { first, second } => {
                format!("channel id {first} -> {second} between reads")
            }
            RelayError::OutOfRangeChannel { raw, limit } => {
                format!("channel={raw} limit={limit}")
            }
        }
    }

    /// Indicates whether the scheduler recovers from this condition on its own.
    ///
    /// All current variants are retried on the next tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RelayError::UpstreamUnavailable { .. }
                | RelayError::TornRead { .. }
                | RelayError::OutOfRangeChannel { .. }
        )
    }
}

/// Failure reported by the upstream bus collaborator (resolve/read/owner calls).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bus fault: {reason}")]
pub struct BusFault {
    /// Description supplied by the transport.
    pub reason: String,
}

impl BusFault {
    /// Creates a fault with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// # Errors produced by the downstream publish collaborator.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The endpoint could not be registered or is gone.
    #[error("endpoint {name} unavailable: {reason}")]
    EndpointUnavailable {
        /// Service name of the endpoint.
        name: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The write was refused by the endpoint.
    #[error("write to {field} rejected: {reason}")]
    Rejected {
        /// Field path that was written.
        field: &'static str,
        /// Transport-level reason.
        reason: String,
    },
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::EndpointUnavailable { .. } => "publish_endpoint_unavailable",
            PublishError::Rejected { .. } => "publish_rejected",
        }
    }
}

/// # Errors produced while bootstrapping the relay.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Configuration cannot describe a working relay (e.g. empty channel space).
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// OS signal listeners could not be registered.
    #[error("signal handling failed: {reason}")]
    Signal {
        /// I/O error reported by the signal driver.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tankrelay::RuntimeError;
    ///
    /// let err = RuntimeError::InvalidConfig { reason: "channel_count = 0".into() };
    /// assert_eq!(err.as_label(), "runtime_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidConfig { .. } => "runtime_invalid_config",
            RuntimeError::Signal { .. } => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::InvalidConfig { reason } => format!("invalid config: {reason}"),
            RuntimeError::Signal { reason } => format!("signal: {reason}"),
        }
    }
}

/// # Errors returned by [`Inlet`](crate::Inlet) when queueing inbound items.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InletError {
    /// The inbound queue is full; the item was dropped.
    #[error("inbound queue full")]
    Full,

    /// The relay has stopped.
    #[error("relay stopped")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let unavailable = RelayError::UpstreamUnavailable {
            address: "svc".into(),
            reason: "gone".into(),
        };
        assert_eq!(unavailable.as_label(), "relay_upstream_unavailable");
        assert_eq!(unavailable.as_message(), "upstream=svc reason=gone");

        let range = RelayError::OutOfRangeChannel { raw: 99, limit: 6 };
        assert_eq!(range.as_label(), "relay_out_of_range_channel");
        assert_eq!(range.to_string(), "channel 99 outside configured space 0..6");
    }

    #[test]
    fn every_relay_error_is_recoverable() {
        assert!(RelayError::TornRead { first: 1, second: 2 }.is_recoverable());
        assert!(RelayError::OutOfRangeChannel { raw: -1, limit: 6 }.is_recoverable());
    }

    #[test]
    fn runtime_and_inlet_errors_display() {
        let err = RuntimeError::Signal {
            reason: "no driver".into(),
        };
        assert_eq!(err.as_label(), "runtime_signal");
        assert_eq!(err.to_string(), "signal handling failed: no driver");
        assert_eq!(InletError::Full.to_string(), "inbound queue full");
    }

    #[test]
    fn bus_fault_displays_reason() {
        assert_eq!(BusFault::new("no such name").to_string(), "bus fault: no such name");
    }
}
