//! # coinhost-transfer: Multi-asset transfer dispatch.
//!
//! - [`dispatcher::TransferDispatcher`]: routes a [`TransferRequest`] to a
//!   plain, stealth or colored-asset build and carries it through signing
//!   and broadcast
//! - [`journal::BroadcastJournal`]: signed transactions whose broadcast
//!   failed, kept for manual recovery
//!
//! [`TransferRequest`]: coinhost_core::types::TransferRequest

pub mod dispatcher;
pub mod journal;

pub use dispatcher::{TransferDispatcher, route};
pub use journal::{BroadcastJournal, FailedBroadcast};
