//! Downstream side: one supervisor and one lazily created endpoint per channel.
//!
//! ## Contents
//! - [`ChannelId`], [`ChannelSpace`] range-checked ids over the fixed channel space
//! - [`ChannelSupervisor`] committed state, lazy creation, watchdog
//! - [`ChannelTable`] the pre-allocated supervisor table
//! - [`Publish`] the downstream collaborator, with [`EndpointFields`] / [`EndpointIdentity`]

mod endpoint;
mod id;
mod supervisor;
mod table;

pub use endpoint::{
    EndpointField, EndpointFields, EndpointHandle, EndpointIdentity, FieldValue, Publish,
    remaining,
};
pub use id::{ChannelId, ChannelSpace};
pub use supervisor::{ChannelSupervisor, CommitOutcome, CommittedState, Transition};
pub use table::ChannelTable;
