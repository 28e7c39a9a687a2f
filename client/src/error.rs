use thiserror::Error;

use scenelink_shared::{AuthenticationStatus, ProtocolError, Rtid, WireError};

use crate::transport::TransportError;

/// Errors that can fail a gateway link. All of these are terminal for the
/// link; reconnection policy belongs to the session-management layer above.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The underlying transport failed or closed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An inbound frame violated the protocol (unknown channel, bad frame)
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A frame body failed to decode
    #[error("Wire decode error: {0}")]
    Wire(#[from] WireError),

    /// The gateway rejected the authentication request
    #[error("Authentication failed: {status:?}")]
    AuthenticationFailed { status: AuthenticationStatus },

    /// The heartbeat went unacknowledged past the missed-ack budget
    #[error("Heartbeat timed out after {missed} consecutive missed acks")]
    HeartbeatTimeout { missed: u32 },

    /// Operation attempted on a link that was already disconnected
    #[error("Link is closed")]
    Closed,
}

/// Errors that can fail a broker request or the broker channel itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The underlying transport failed or closed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The owning session is not in a joinable state
    #[error("Session is not joinable (gateway address or session key unresolved)")]
    NotJoinable,

    /// An inbound message carried a type tag with no registered handler.
    /// Hard failure so protocol drift surfaces immediately instead of
    /// silently dropping data.
    #[error("Unhandled broker message type: {kind}")]
    UnhandledMessage { kind: String },

    /// A message body was not valid JSON or missed required fields
    #[error("Malformed broker message: {detail}")]
    MalformedMessage { detail: String },

    /// The server answered this request with an explicit error payload.
    /// Other in-flight requests are unaffected.
    #[error("Request rejected by server: {message}")]
    Rejected { message: String },

    /// A confirmation arrived for a request kind with no pending waiter
    #[error("Unexpected confirmation for {kind:?} with no pending request")]
    UnexpectedConfirmation { kind: crate::broker::RequestKind },

    /// The channel was disconnected while this request was outstanding
    #[error("Broker channel closed")]
    ChannelClosed,
}

/// Registry invariant violations. These are programmer errors; callers must
/// not ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `add` was called with the null RTID or nil EUID
    #[error("Cannot register an entity without a valid RTID and EUID")]
    NullIdentity,

    /// An entity with this RTID is already registered; never overwritten
    #[error("Entity {rtid} is already registered")]
    DuplicateRtid { rtid: Rtid },

    /// `remove` (or a mutation) referenced an RTID that was never registered
    #[error("Entity {rtid} is not registered")]
    NotRegistered { rtid: Rtid },

    /// A component name outside the fixed table shared with the server
    #[error("Unknown component type: {name}")]
    UnknownComponent { name: String },
}

/// Top-level client failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Gateway link error: {0}")]
    Link(#[from] LinkError),

    #[error("Broker channel error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Operation requires a connected gateway link
    #[error("Gateway link is not connected")]
    GatewayNotConnected,

    /// Operation requires a joined broker channel
    #[error("Broker channel is not connected")]
    BrokerNotConnected,
}
