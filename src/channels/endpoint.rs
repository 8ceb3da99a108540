//! # Downstream endpoints
//!
//! Each published channel gets one endpoint with a fixed field set:
//!
//! | Field        | Path          | Wire value                         | Writable |
//! |--------------|---------------|------------------------------------|----------|
//! | `Connected`  | `/Connected`  | `Int(1)` / `Int(0)`                | no       |
//! | `ChannelId`  | `/FluidType`  | `Int(id)`                          | yes      |
//! | `Level`      | `/Level`      | `Float(percent)`                   | yes      |
//! | `Capacity`   | `/Capacity`   | `Float(native units)`              | yes      |
//! | `Remaining`  | `/Remaining`  | `Float(capacity * level / 100)`    | yes      |
//!
//! Identity metadata ([`EndpointIdentity`]) is set once at creation and never written again.
//! Connectivity is a `bool` inside the relay; the integer encoding exists only here,
//! at the boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PublishError;

use super::id::ChannelId;

/// Derived remaining quantity, in the capacity's native units.
#[inline]
pub fn remaining(level: f64, capacity: f64) -> f64 {
    capacity * level / 100.0
}

/// Published, mutable field of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointField {
    Connected,
    ChannelId,
    Level,
    Capacity,
    Remaining,
}

impl EndpointField {
    pub fn path(self) -> &'static str {
        match self {
            EndpointField::Connected => "/Connected",
            EndpointField::ChannelId => "/FluidType",
            EndpointField::Level => "/Level",
            EndpointField::Capacity => "/Capacity",
            EndpointField::Remaining => "/Remaining",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/Connected" => Some(EndpointField::Connected),
            "/FluidType" => Some(EndpointField::ChannelId),
            "/Level" => Some(EndpointField::Level),
            "/Capacity" => Some(EndpointField::Capacity),
            "/Remaining" => Some(EndpointField::Remaining),
            _ => None,
        }
    }

    /// Whether operators may write this field through the endpoint.
    pub fn is_writable(self) -> bool {
        !matches!(self, EndpointField::Connected)
    }
}

/// Value written to an endpoint field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(Arc<str>),
}

impl FieldValue {
    /// Wire encoding of the connectivity flag.
    pub fn connected(flag: bool) -> Self {
        FieldValue::Int(i64::from(flag))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

/// Snapshot of the mutable fields of an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointFields {
    pub connected: bool,
    pub channel: u32,
    pub level: f64,
    pub capacity: f64,
    pub remaining: f64,
}

impl EndpointFields {
    pub fn new(channel: ChannelId, level: f64, capacity: f64, connected: bool) -> Self {
        Self {
            connected,
            channel: channel.get(),
            level,
            capacity,
            remaining: remaining(level, capacity),
        }
    }

    /// Fields in wire form, in publication order.
    pub fn entries(&self) -> [(EndpointField, FieldValue); 5] {
        [
            (EndpointField::ChannelId, FieldValue::Int(i64::from(self.channel))),
            (EndpointField::Level, FieldValue::Float(self.level)),
            (EndpointField::Capacity, FieldValue::Float(self.capacity)),
            (EndpointField::Remaining, FieldValue::Float(self.remaining)),
            (EndpointField::Connected, FieldValue::connected(self.connected)),
        ]
    }
}

/// Static identity metadata, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointIdentity {
    pub channel: u32,
    pub service_name: String,
    pub product_name: String,
    pub device_instance: u32,
    pub process_name: &'static str,
    pub process_version: &'static str,
    pub connection: &'static str,
    pub product_id: u32,
    pub firmware_version: u32,
    pub hardware_version: u32,
    pub serial: String,
}

impl EndpointIdentity {
    /// Identity for `channel`: service `<prefix><id:02>`, product `<label> <id>`.
    pub fn new(channel: ChannelId, service_prefix: &str, product_label: &str) -> Self {
        let id = channel.get();
        Self {
            channel: id,
            service_name: format!("{service_prefix}{id:02}"),
            product_name: format!("{product_label} {id}"),
            device_instance: id,
            process_name: env!("CARGO_PKG_NAME"),
            process_version: env!("CARGO_PKG_VERSION"),
            connection: "relay",
            product_id: 0,
            firmware_version: 0,
            hardware_version: 0,
            serial: String::new(),
        }
    }
}

/// Opaque handle to a created endpoint, chosen by the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointHandle(u64);

impl EndpointHandle {
    pub fn new(key: u64) -> Self {
        Self(key)
    }

    pub fn key(self) -> u64 {
        self.0
    }
}

/// Downstream publish collaborator.
///
/// The relay guarantees `create_endpoint` is called at most once per successful
/// creation per channel; implementations need not deduplicate.
#[async_trait]
pub trait Publish: Send + Sync + 'static {
    /// Registers a new endpoint already populated with `initial`.
    async fn create_endpoint(
        &self,
        identity: &EndpointIdentity,
        initial: &EndpointFields,
    ) -> Result<EndpointHandle, PublishError>;

    /// Writes one field of an existing endpoint.
    async fn write(
        &self,
        endpoint: EndpointHandle,
        field: EndpointField,
        value: FieldValue,
    ) -> Result<(), PublishError>;
}
