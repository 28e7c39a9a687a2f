// The closed set of logical sub-streams multiplexed over the gateway
// connection, and the 4-byte frame header that names them.

use thiserror::Error;

use crate::wire::{ByteReader, ByteWriter, WireError};

/// Size of the gateway frame header: channel id (1) + payload size (3)
pub const FRAME_HEADER_SIZE: usize = 4;

/// Largest payload the 24-bit size field can describe
pub const MAX_FRAME_PAYLOAD_SIZE: usize = 0xff_ffff;

/// Identifies the logical sub-stream an inbound gateway frame belongs to.
/// Every frame belongs to exactly one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Authentication / registration traffic
    Registration,
    /// Encoded video frame payloads
    VideoStream,
    /// Input acknowledgements
    Inputs,
    /// Viewer control responses (resize, quality, ...)
    ViewerControl,
    /// Per-client remote operations (carry a correlation sub-header)
    ClientRemoteOperations,
    /// Editor-originated remote operations
    EditorRemoteOperations,
    /// Retired channel id 7; accepted and skipped
    Deprecated7,
    /// Roster changes for other connected clients
    BroadcastClients,
    /// Video stream frames relayed from other clients
    BroadcastVideoStream,
    /// Retired channel id 10; accepted and skipped
    Deprecated10,
    /// Heartbeat requests/acks
    Heartbeat,
    /// Codec configuration preceding video frames
    VideoStreamHeader,
    /// Reserved: accepted but not decoded
    AudioStream,
    /// Script events broadcast between clients
    BroadcastScriptEvents,
    /// Reserved: accepted but not decoded
    AssetLoadingEvents,
    /// Reserved: accepted but not decoded
    GpuMemoryProfiler,
}

impl Channel {
    pub fn wire_id(&self) -> u8 {
        match self {
            Channel::Registration => 1,
            Channel::VideoStream => 2,
            Channel::Inputs => 3,
            Channel::ViewerControl => 4,
            Channel::ClientRemoteOperations => 5,
            Channel::EditorRemoteOperations => 6,
            Channel::Deprecated7 => 7,
            Channel::BroadcastClients => 8,
            Channel::BroadcastVideoStream => 9,
            Channel::Deprecated10 => 10,
            Channel::Heartbeat => 11,
            Channel::VideoStreamHeader => 12,
            Channel::AudioStream => 13,
            Channel::BroadcastScriptEvents => 14,
            Channel::AssetLoadingEvents => 15,
            Channel::GpuMemoryProfiler => 16,
        }
    }

    /// Maps a wire id back to a channel. Deprecated ids 7 and 10 decode
    /// without error; anything outside the closed set is a protocol error.
    pub fn from_wire_id(id: u8) -> Result<Self, ProtocolError> {
        match id {
            1 => Ok(Channel::Registration),
            2 => Ok(Channel::VideoStream),
            3 => Ok(Channel::Inputs),
            4 => Ok(Channel::ViewerControl),
            5 => Ok(Channel::ClientRemoteOperations),
            6 => Ok(Channel::EditorRemoteOperations),
            7 => Ok(Channel::Deprecated7),
            8 => Ok(Channel::BroadcastClients),
            9 => Ok(Channel::BroadcastVideoStream),
            10 => Ok(Channel::Deprecated10),
            11 => Ok(Channel::Heartbeat),
            12 => Ok(Channel::VideoStreamHeader),
            13 => Ok(Channel::AudioStream),
            14 => Ok(Channel::BroadcastScriptEvents),
            15 => Ok(Channel::AssetLoadingEvents),
            16 => Ok(Channel::GpuMemoryProfiler),
            _ => Err(ProtocolError::UnknownChannel { id }),
        }
    }

    /// Whether this channel is accepted but intentionally left undecoded
    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            Channel::AudioStream
                | Channel::AssetLoadingEvents
                | Channel::GpuMemoryProfiler
                | Channel::Deprecated7
                | Channel::Deprecated10
        )
    }
}

/// The 4-byte header preceding every gateway frame:
/// `[channel_id:u8][payload_size:u24 little-endian]`.
///
/// The 3 size bytes are the protocol's reserved/size field; a stream
/// transport uses them as the payload length for framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub channel: Channel,
    pub payload_size: usize,
}

impl FrameHeader {
    pub fn new(channel: Channel, payload_size: usize) -> Self {
        Self {
            channel,
            payload_size,
        }
    }

    pub fn ser(&self, writer: &mut ByteWriter) -> usize {
        writer.write_u8(self.channel.wire_id()) + writer.write_u24(self.payload_size as u32)
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, ProtocolError> {
        let channel = Channel::from_wire_id(reader.read_u8()?)?;
        let payload_size = reader.read_u24()? as usize;
        Ok(Self {
            channel,
            payload_size,
        })
    }
}

/// Errors in the framing layer of the gateway protocol. All of these are
/// fatal for the link that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// An inbound frame named a channel id outside the closed set
    #[error("Unknown channel id {id} in frame header")]
    UnknownChannel { id: u8 },

    /// A frame body failed to decode
    #[error("Wire decode error: {0}")]
    Wire(#[from] WireError),

    /// An outbound payload is too large for the 24-bit size field
    #[error("Payload of {size} bytes exceeds the frame size field (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ids_round_trip() {
        for id in 1..=16u8 {
            let channel = Channel::from_wire_id(id).unwrap();
            assert_eq!(channel.wire_id(), id);
        }
    }

    #[test]
    fn deprecated_ids_are_accepted() {
        assert_eq!(Channel::from_wire_id(7).unwrap(), Channel::Deprecated7);
        assert_eq!(Channel::from_wire_id(10).unwrap(), Channel::Deprecated10);
        assert!(Channel::from_wire_id(7).unwrap().is_reserved());
    }

    #[test]
    fn unknown_ids_are_protocol_errors() {
        for id in [0u8, 17, 42, 255] {
            assert_eq!(
                Channel::from_wire_id(id),
                Err(ProtocolError::UnknownChannel { id })
            );
        }
    }

    #[test]
    fn header_round_trip() {
        let header = FrameHeader::new(Channel::VideoStream, 0x012345);
        let mut writer = ByteWriter::new();
        assert_eq!(header.ser(&mut writer), FRAME_HEADER_SIZE);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(FrameHeader::de(&mut reader).unwrap(), header);
    }
}
