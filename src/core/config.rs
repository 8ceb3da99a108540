//! # Relay configuration.
//!
//! [`Config`] centralizes every setting the relay reads at startup. It is consumed
//! once by [`RelayBuilder::build`](crate::RelayBuilder::build), which calls
//! [`Config::validate`] and derives the watchdog tick count and the channel space.
//!
//! ## Derived values
//! - `timeout_ticks() = ceil(watchdog_timeout / watchdog_period)`, at least 1
//! - capacities and the stuck threshold are clamped to a minimum of 1

use std::time::Duration;

use crate::channels::ChannelSpace;
use crate::error::RuntimeError;
use crate::upstream::TearPolicy;

/// Global configuration for the relay runtime.
///
/// All fields are public. Prefer the helper accessors over reading the raw
/// values so clamping stays in one place.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bus address of the multiplexed upstream service.
    pub upstream_address: String,

    /// Size of the fixed channel space `0..channel_count`. Must be non-zero.
    pub channel_count: u32,

    /// Fast tick: accessor resolution, snapshot poll and fusion.
    pub poll_period: Duration,

    /// Slow tick: per-channel watchdog.
    pub watchdog_period: Duration,

    /// Liveness window; a channel without commits for this long is disconnected.
    pub watchdog_timeout: Duration,

    /// Consecutive channel-id notifications before a polled value replaces a
    /// pending field stuck at the sentinel.
    pub stuck_threshold: u32,

    /// Behavior when the two channel-id reads of a poll disagree.
    pub tear_policy: TearPolicy,

    /// Endpoint service name prefix; the two-digit channel id is appended.
    pub service_prefix: String,

    /// Endpoint product name prefix; `" <id>"` is appended.
    pub product_label: String,

    /// Capacity of the event bus ring buffer.
    pub bus_capacity: usize,

    /// Capacity of the inbound notification / external-write queue.
    pub inbound_capacity: usize,

    /// Whether [`Relay::run`](crate::Relay::run) also stops on OS termination signals.
    pub handle_signals: bool,
}

impl Config {
    /// Watchdog timeout expressed in watchdog ticks (rounded up, at least 1).
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use tankrelay::Config;
    ///
    /// let mut cfg = Config::default();
    /// cfg.watchdog_period = Duration::from_millis(300);
    /// cfg.watchdog_timeout = Duration::from_secs(1);
    /// assert_eq!(cfg.timeout_ticks(), 4);
    /// ```
    pub fn timeout_ticks(&self) -> u32 {
        let period = self.watchdog_period.as_nanos().max(1);
        let ticks = self.watchdog_timeout.as_nanos().div_ceil(period);
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }

    #[inline]
    pub fn stuck_threshold_clamped(&self) -> u32 {
        self.stuck_threshold.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn inbound_capacity_clamped(&self) -> usize {
        self.inbound_capacity.max(1)
    }

    #[inline]
    pub fn channel_space(&self) -> ChannelSpace {
        ChannelSpace::new(self.channel_count)
    }

    /// Rejects configurations that cannot describe a working relay.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        let invalid = |reason: &str| {
            Err(RuntimeError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if self.channel_count == 0 {
            return invalid("channel_count must be greater than zero");
        }
        if self.upstream_address.is_empty() {
            return invalid("upstream_address is empty");
        }
        if self.poll_period.is_zero() {
            return invalid("poll_period must be non-zero");
        }
        if self.watchdog_period.is_zero() {
            return invalid("watchdog_period must be non-zero");
        }
        Ok(())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - six channels, 1 s poll and watchdog ticks, 8 s liveness window
    /// - stuck threshold of 10 channel-id notifications
    /// - torn polls discarded
    fn default() -> Self {
        Self {
            upstream_address: "com.victronenergy.tank.socketcan_can0_vi0_uc855".to_string(),
            channel_count: 6,
            poll_period: Duration::from_secs(1),
            watchdog_period: Duration::from_secs(1),
            watchdog_timeout: Duration::from_secs(8),
            stuck_threshold: 10,
            tear_policy: TearPolicy::Discard,
            service_prefix: "com.victronenergy.tank.Repeater".to_string(),
            product_label: "Tank Repeater".to_string(),
            bus_capacity: 1024,
            inbound_capacity: 256,
            handle_signals: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_eight_ticks() {
        assert_eq!(Config::default().timeout_ticks(), 8);
    }

    #[test]
    fn timeout_ticks_never_zero() {
        let cfg = Config {
            watchdog_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.timeout_ticks(), 1);
    }

    #[test]
    fn clamps() {
        let cfg = Config {
            stuck_threshold: 0,
            bus_capacity: 0,
            inbound_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.stuck_threshold_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.inbound_capacity_clamped(), 1);
    }

    #[test]
    fn empty_channel_space_is_rejected() {
        let cfg = Config {
            channel_count: 0,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.as_label(), "runtime_invalid_config");
        assert!(Config::default().validate().is_ok());
    }
}
