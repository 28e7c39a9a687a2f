//! Per-frame metadata riding alongside the video stream, and the correlation
//! sub-header of the client remote-operations channel.

use crate::wire::{ByteReader, ByteWriter, Rtid, Uuid, WireError, RTID_WIRE_SIZE, UUID_WIRE_SIZE};

/// Fixed viewport slot capacity per client. The wire stride per client is
/// constant regardless of how many viewports are actually live.
pub const MAX_VIEWPORTS_PER_CLIENT: usize = 4;

/// Size of one viewport record: camera rtid (4) + 4x4 f32 matrix (64)
pub const VIEWPORT_RECORD_SIZE: usize = RTID_WIRE_SIZE + 16 * 4;

/// Size of the remote-operation sub-header:
/// client uuid (16) + request id (4) + payload size (4)
pub const REMOTE_OPERATION_HEADER_SIZE: usize = UUID_WIRE_SIZE + 4 + 4;

/// One viewport of one client: which camera rendered it, and where that
/// camera sits (world-from-view, column-major 4x4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub camera: Rtid,
    pub world_from_view: [f32; 16],
}

impl Viewport {
    fn de(reader: &mut ByteReader) -> Result<Self, WireError> {
        let camera = Rtid::de(reader)?;
        let mut world_from_view = [0f32; 16];
        for cell in world_from_view.iter_mut() {
            *cell = reader.read_f32()?;
        }
        Ok(Self {
            camera,
            world_from_view,
        })
    }

    fn ser(&self, writer: &mut ByteWriter) -> usize {
        let mut written = self.camera.ser(writer);
        for cell in &self.world_from_view {
            written += writer.write_f32(*cell);
        }
        written
    }
}

/// The viewports of one connected client within a rendered frame
#[derive(Debug, Clone, PartialEq)]
pub struct ClientViewports {
    pub client_id: Uuid,
    pub viewports: Vec<Viewport>,
}

/// Metadata describing one rendered frame: when the renderer produced it,
/// its monotonically increasing counter, and every connected client's
/// viewport cameras.
///
/// Wire layout: `[timestamp:u32][frame_counter:u32][client_count:u8]` then
/// per client `[client_uuid:16][viewport_count:u8]` followed by
/// [`MAX_VIEWPORTS_PER_CLIENT`] viewport slots of [`VIEWPORT_RECORD_SIZE`]
/// bytes each; slots past `viewport_count` are padding.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetadata {
    pub timestamp: u32,
    pub frame_counter: u32,
    pub clients: Vec<ClientViewports>,
}

impl FrameMetadata {
    /// Total encoded size for a given client count
    pub fn wire_size(client_count: usize) -> usize {
        9 + client_count * (UUID_WIRE_SIZE + 1 + MAX_VIEWPORTS_PER_CLIENT * VIEWPORT_RECORD_SIZE)
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, WireError> {
        let timestamp = reader.read_u32()?;
        let frame_counter = reader.read_u32()?;
        let client_count = reader.read_u8()? as usize;

        let mut clients = Vec::with_capacity(client_count);
        for _ in 0..client_count {
            let client_id = Uuid::de(reader)?;
            let viewport_count = reader.read_u8()? as usize;
            if viewport_count > MAX_VIEWPORTS_PER_CLIENT {
                return Err(WireError::CountExceedsCapacity {
                    declared: viewport_count,
                    capacity: MAX_VIEWPORTS_PER_CLIENT,
                });
            }

            let mut viewports = Vec::with_capacity(viewport_count);
            for _ in 0..viewport_count {
                viewports.push(Viewport::de(reader)?);
            }
            // keep the per-client stride fixed
            reader.skip((MAX_VIEWPORTS_PER_CLIENT - viewport_count) * VIEWPORT_RECORD_SIZE)?;

            clients.push(ClientViewports {
                client_id,
                viewports,
            });
        }

        Ok(Self {
            timestamp,
            frame_counter,
            clients,
        })
    }

    pub fn ser(&self, writer: &mut ByteWriter) -> usize {
        let mut written = writer.write_u32(self.timestamp);
        written += writer.write_u32(self.frame_counter);
        written += writer.write_u8(self.clients.len() as u8);
        for client in &self.clients {
            written += client.client_id.ser(writer);
            written += writer.write_u8(client.viewports.len() as u8);
            for viewport in &client.viewports {
                written += viewport.ser(writer);
            }
            let padding =
                (MAX_VIEWPORTS_PER_CLIENT - client.viewports.len()) * VIEWPORT_RECORD_SIZE;
            written += writer.write_bytes(&vec![0u8; padding]);
        }
        written
    }
}

/// Secondary header on the client remote-operations channel, used to
/// correlate responses to the request that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteOperationHeader {
    pub client_id: Uuid,
    pub request_id: u32,
    pub payload_size: u32,
}

impl RemoteOperationHeader {
    pub fn de(reader: &mut ByteReader) -> Result<Self, WireError> {
        let client_id = Uuid::de(reader)?;
        let request_id = reader.read_u32()?;
        let payload_size = reader.read_u32()?;
        Ok(Self {
            client_id,
            request_id,
            payload_size,
        })
    }

    pub fn ser(&self, writer: &mut ByteWriter) -> usize {
        self.client_id.ser(writer)
            + writer.write_u32(self.request_id)
            + writer.write_u32(self.payload_size)
    }
}
