use std::time::Duration;

use scenelink_shared::Uuid;

/// Typed events produced by pumping a [`crate::GatewayLink`].
///
/// Payload-carrying variants hand the channel payload over unparsed; the
/// consumers named in each variant own the decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// Authentication succeeded; the gateway assigned this client id
    Connected { client_id: Uuid },

    /// An encoded video frame. A video decoder consumes these together
    /// with the metadata frames.
    VideoFrame { payload: Vec<u8> },

    /// Codec configuration preceding the video stream
    VideoStreamHeader { payload: Vec<u8> },

    /// Acknowledgement of previously sent input
    InputAck { payload: Vec<u8> },

    /// Response to a viewer-control request (resize, quality, ...)
    ViewerControl { payload: Vec<u8> },

    /// Response to a client remote operation (e.g. a screen-space ray
    /// cast), correlated by the request id from its sub-header
    RemoteOperation {
        origin: Uuid,
        request_id: u32,
        payload: Vec<u8>,
    },

    /// An editor-originated remote operation payload
    EditorOperation { payload: Vec<u8> },

    /// The roster of connected clients changed
    ClientsChanged { payload: Vec<u8> },

    /// A video frame relayed from another client's stream
    BroadcastVideoFrame { payload: Vec<u8> },

    /// A script event broadcast by another client
    ScriptEvent { payload: Vec<u8> },

    /// A heartbeat ack arrived; round-trip latency as measured
    HeartbeatLatency { round_trip: Duration },
}
