//! The entity replication engine: a local mirror of the remote scene graph
//! with dirty tracking, batched flushes, broadcast coalescing and
//! server-push reconciliation.

mod entity;
mod registry;

pub use entity::Entity;
pub use registry::{
    BatchEntry, BroadcastUpdate, ComponentBatch, EntityRegistry, RemoteComponentUpdate,
};
