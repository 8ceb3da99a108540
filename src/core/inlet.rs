//! # Inbound queue.
//!
//! Transports never touch relay state directly. Bus callbacks push
//! [`Inbound`] items through a cloneable [`Inlet`] and return immediately; the
//! scheduler task drains the queue between ticks.

use tokio::sync::mpsc;

use crate::channels::{EndpointField, FieldValue};
use crate::error::InletError;
use crate::upstream::Notification;

/// Item delivered to the scheduler from outside its task.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Upstream field-change notification.
    Notification(Notification),
    /// Operator write made through a published endpoint.
    EndpointWrite {
        /// Channel id of the endpoint that was written.
        channel: i64,
        field: EndpointField,
        value: FieldValue,
    },
}

/// Non-blocking handle used by transports to feed the relay.
#[derive(Debug, Clone)]
pub struct Inlet {
    tx: mpsc::Sender<Inbound>,
}

impl Inlet {
    pub(crate) fn new(tx: mpsc::Sender<Inbound>) -> Self {
        Self { tx }
    }

    /// Queues an upstream notification.
    pub fn notify(&self, notification: Notification) -> Result<(), InletError> {
        self.push(Inbound::Notification(notification))
    }

    /// Queues an external write observed on the endpoint of `channel`.
    pub fn endpoint_written(
        &self,
        channel: i64,
        field: EndpointField,
        value: FieldValue,
    ) -> Result<(), InletError> {
        self.push(Inbound::EndpointWrite {
            channel,
            field,
            value,
        })
    }

    pub fn push(&self, inbound: Inbound) -> Result<(), InletError> {
        self.tx.try_send(inbound).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => InletError::Full,
            mpsc::error::TrySendError::Closed(_) => InletError::Closed,
        })
    }
}
