//! The broker channel: request/response access to the scene-authority
//! service (spawn, delete, find, resolve, update), plus unsolicited push
//! notifications routed to the replication engine.
//!
//! The wire carries no request id on this link; correlation is strict
//! per-kind FIFO ordering of confirmations against pending requests.

mod channel;
mod message;
mod requests;

pub use channel::{BrokerChannel, BrokerEvent};
pub use message::{BrokerMessage, EntityRecord, EntityUpdateRecord, FindQuery, SceneStats};
pub use requests::{PendingRequests, RequestKind, ResponseKey, ResponsePayload};
