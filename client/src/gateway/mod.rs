//! The gateway link: one persistent connection to the remote rendering
//! service. Runs the authentication handshake, demultiplexes inbound frames
//! by channel, and keeps the connection alive with heartbeats.

mod event;
mod heartbeat;
mod link;

pub use event::GatewayEvent;
pub use heartbeat::HeartbeatTracker;
pub use link::GatewayLink;
