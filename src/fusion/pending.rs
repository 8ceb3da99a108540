//! Pending (uncommitted) notification state and stuck-value counters.

use tokio::time::Instant;

/// Values received through notifications, not yet committed.
///
/// `channel` is the raw id of the most recent channel-id notification; `level` and
/// `capacity` are the most recent sentinel-filtered field notifications. They are
/// committed together when the next channel-id notification arrives.
/// `level_at` / `capacity_at` record when each field was last received or promoted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pending {
    pub channel: Option<i64>,
    pub level: Option<f64>,
    pub capacity: Option<f64>,
    pub level_at: Option<Instant>,
    pub capacity_at: Option<Instant>,
}

/// Last values seen on a consistent poll, used for stuck-value promotion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Polled {
    pub level: Option<f64>,
    pub capacity: Option<f64>,
}

/// Consecutive channel-id notifications seen while a pending field stayed unknown
/// and a polled value was available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StuckCounters {
    pub level: u32,
    pub capacity: u32,
}

/// Advances one stuck counter; returns the value to promote once `threshold` is reached.
pub(super) fn advance(
    counter: &mut u32,
    pending: Option<f64>,
    polled: Option<f64>,
    threshold: u32,
) -> Option<f64> {
    match (pending, polled) {
        (None, Some(value)) => {
            *counter += 1;
            if *counter >= threshold {
                *counter = 0;
                Some(value)
            } else {
                None
            }
        }
        _ => {
            *counter = 0;
            None
        }
    }
}
