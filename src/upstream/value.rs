//! Upstream field identities and values.
//!
//! The feed exposes three fields under a single address. Values arrive as loosely
//! typed bus variants; the reserved [`SENTINEL`] means "not reported" and is turned
//! into `None` by [`Value::sample`] so it can never be mistaken for a real zero.

use std::sync::Arc;

/// Reserved upstream value meaning "unknown/unreported".
pub const SENTINEL: i64 = -99;

/// One of the three fields exposed by the upstream address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Id of the channel currently being reported.
    ChannelId,
    /// Fill level of the current channel (percent).
    Level,
    /// Capacity of the current channel (upstream native units).
    Capacity,
}

impl Field {
    /// Object path of the field on the upstream service.
    pub fn path(self) -> &'static str {
        match self {
            Field::ChannelId => "/FluidType",
            Field::Level => "/Level",
            Field::Capacity => "/Capacity",
        }
    }

    /// Short name used in events and logs.
    pub fn name(self) -> &'static str {
        match self {
            Field::ChannelId => "channel_id",
            Field::Level => "level",
            Field::Capacity => "capacity",
        }
    }
}

/// Value read from, or notified by, the upstream bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(Arc<str>),
    /// Field exists but carries no value.
    Empty,
}

impl Value {
    /// Numeric view of the value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value; floats must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Sentinel-filtered numeric sample: `None` when unreported.
    pub fn sample(&self) -> Option<f64> {
        self.as_f64().filter(|v| *v != SENTINEL as f64)
    }

    /// Raw channel id; anything non-integral maps to [`SENTINEL`] so it is dropped
    /// by the range check instead of being indexed.
    pub fn channel_id(&self) -> i64 {
        self.as_i64().unwrap_or(SENTINEL)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Unique id of the bus connection that owns the upstream address.
///
/// Notifications carry the origin of their sender; only those from the resolved
/// owner are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginId(Arc<str>);

impl OriginId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Field-change notification delivered by the bus subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub field: Field,
    pub value: Value,
    pub origin: OriginId,
}

impl Notification {
    pub fn new(field: Field, value: impl Into<Value>, origin: OriginId) -> Self {
        Self {
            field,
            value: value.into(),
            origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_not_a_sample() {
        assert_eq!(Value::Int(SENTINEL).sample(), None);
        assert_eq!(Value::Float(-99.0).sample(), None);
        assert_eq!(Value::Int(0).sample(), Some(0.0));
        assert_eq!(Value::Float(12.5).sample(), Some(12.5));
    }

    #[test]
    fn non_numeric_values_have_no_sample() {
        assert_eq!(Value::Empty.sample(), None);
        assert_eq!(Value::Text("x".into()).sample(), None);
        assert_eq!(Value::Float(f64::NAN).sample(), None);
    }

    #[test]
    fn channel_id_requires_integral_value() {
        assert_eq!(Value::Int(3).channel_id(), 3);
        assert_eq!(Value::Float(5.0).channel_id(), 5);
        assert_eq!(Value::Float(5.5).channel_id(), SENTINEL);
        assert_eq!(Value::Empty.channel_id(), SENTINEL);
    }

    #[test]
    fn field_paths() {
        assert_eq!(Field::ChannelId.path(), "/FluidType");
        assert_eq!(Field::Level.path(), "/Level");
        assert_eq!(Field::Capacity.path(), "/Capacity");
    }
}
