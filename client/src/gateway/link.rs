use log::{debug, trace, warn};

use scenelink_shared::{
    AuthenticationResponse, ByteReader, ByteWriter, Channel, FrameHeader, RemoteOperationHeader,
    Uuid, AUTH_RESPONSE_SIZE, FRAME_HEADER_SIZE, MAX_FRAME_PAYLOAD_SIZE,
};

use crate::{
    config::LinkConfig,
    error::LinkError,
    transport::{Transport, TransportError},
};

use super::{event::GatewayEvent, heartbeat::HeartbeatTracker};

/// Version byte leading the authentication request
const PROTOCOL_VERSION: u8 = 1;

enum LinkState {
    /// Waiting for the authentication response; the first inbound bytes are
    /// read without channel framing
    AwaitingAuth,
    /// Steady state: demultiplexing framed channels
    Connected,
    Closed,
}

/// Owns exactly one connection to the gateway. Poll-driven: the owner calls
/// [`GatewayLink::receive`] from its event loop; sends are immediate.
pub struct GatewayLink {
    transport: Box<dyn Transport>,
    config: LinkConfig,
    state: LinkState,
    recv_buffer: Vec<u8>,
    heartbeat: HeartbeatTracker,
    client_id: Option<Uuid>,
}

impl GatewayLink {
    /// Takes ownership of a freshly opened transport and immediately writes
    /// the authentication request carrying the session key and client
    /// metadata. The handshake completes during subsequent `receive` calls.
    pub fn connect(
        mut transport: Box<dyn Transport>,
        session_key: &str,
        client_name: &str,
        config: LinkConfig,
    ) -> Result<Self, LinkError> {
        let mut body = ByteWriter::new();
        body.write_u8(PROTOCOL_VERSION);
        body.write_u16(session_key.len() as u16);
        body.write_bytes(session_key.as_bytes());
        body.write_u16(client_name.len() as u16);
        body.write_bytes(client_name.as_bytes());

        let mut frame = ByteWriter::with_capacity(FRAME_HEADER_SIZE + body.len());
        FrameHeader::new(Channel::Registration, body.len()).ser(&mut frame);
        frame.write_bytes(body.as_slice());
        transport.send(frame.as_slice())?;

        let heartbeat = HeartbeatTracker::new(&config);
        Ok(Self {
            transport,
            config,
            state: LinkState::AwaitingAuth,
            recv_buffer: Vec::new(),
            heartbeat,
            client_id: None,
        })
    }

    /// The client id assigned by the gateway, once authenticated
    pub fn client_id(&self) -> Option<Uuid> {
        self.client_id
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Connected)
    }

    /// Round-trip latency measured from the most recent heartbeat ack
    pub fn latency(&self) -> Option<std::time::Duration> {
        self.heartbeat.latency()
    }

    /// Pumps the transport once: drains available bytes, completes the
    /// handshake if pending, demultiplexes complete frames into events, and
    /// runs heartbeat maintenance. Errors are terminal for the link.
    pub fn receive(&mut self) -> Result<Vec<GatewayEvent>, LinkError> {
        if matches!(self.state, LinkState::Closed) {
            return Err(LinkError::Closed);
        }

        if let Err(error) = self.drain_transport() {
            self.disconnect();
            return Err(error.into());
        }

        let mut events = Vec::new();

        if matches!(self.state, LinkState::AwaitingAuth) {
            if self.recv_buffer.len() < AUTH_RESPONSE_SIZE {
                return Ok(events);
            }
            let response = {
                let mut reader = ByteReader::new(&self.recv_buffer[..AUTH_RESPONSE_SIZE]);
                AuthenticationResponse::de(&mut reader)?
            };
            self.recv_buffer.drain(..AUTH_RESPONSE_SIZE);

            if !response.status.is_success() {
                self.disconnect();
                return Err(LinkError::AuthenticationFailed {
                    status: response.status,
                });
            }
            debug!("GatewayLink: authenticated as client {}", response.client_id);
            self.client_id = Some(response.client_id);
            self.state = LinkState::Connected;
            events.push(GatewayEvent::Connected {
                client_id: response.client_id,
            });
        }

        // split complete frames off the buffer, in arrival order
        loop {
            if self.recv_buffer.len() < FRAME_HEADER_SIZE {
                break;
            }
            let header = {
                let mut reader = ByteReader::new(&self.recv_buffer[..FRAME_HEADER_SIZE]);
                match FrameHeader::de(&mut reader) {
                    Ok(header) => header,
                    Err(error) => {
                        self.disconnect();
                        return Err(error.into());
                    }
                }
            };
            if self.recv_buffer.len() < FRAME_HEADER_SIZE + header.payload_size {
                break;
            }
            let payload: Vec<u8> = self
                .recv_buffer
                .drain(..FRAME_HEADER_SIZE + header.payload_size)
                .skip(FRAME_HEADER_SIZE)
                .collect();

            match self.dispatch(header.channel, payload) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(error) => {
                    self.disconnect();
                    return Err(error);
                }
            }
        }

        if let Err(error) = self.maintain_heartbeat() {
            self.disconnect();
            return Err(error);
        }

        Ok(events)
    }

    /// Sends a payload on the given channel
    pub fn send(&mut self, channel: Channel, payload: &[u8]) -> Result<(), LinkError> {
        if matches!(self.state, LinkState::Closed) {
            return Err(LinkError::Closed);
        }
        if payload.len() > MAX_FRAME_PAYLOAD_SIZE {
            return Err(scenelink_shared::ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_FRAME_PAYLOAD_SIZE,
            }
            .into());
        }
        let mut frame = ByteWriter::with_capacity(FRAME_HEADER_SIZE + payload.len());
        FrameHeader::new(channel, payload.len()).ser(&mut frame);
        frame.write_bytes(payload);
        self.transport.send(frame.as_slice())?;
        Ok(())
    }

    /// Sends a client remote operation, prefixing the correlation sub-header
    /// with this client's id and the caller's request id.
    pub fn send_remote_operation(
        &mut self,
        request_id: u32,
        payload: &[u8],
    ) -> Result<(), LinkError> {
        let client_id = self.client_id.ok_or(LinkError::Closed)?;
        let mut body = ByteWriter::with_capacity(payload.len() + 24);
        RemoteOperationHeader {
            client_id,
            request_id,
            payload_size: payload.len() as u32,
        }
        .ser(&mut body);
        body.write_bytes(payload);
        self.send(Channel::ClientRemoteOperations, body.as_slice())
    }

    /// Stops the heartbeat and closes the transport. Idempotent.
    pub fn disconnect(&mut self) {
        if !matches!(self.state, LinkState::Closed) {
            debug!("GatewayLink: disconnecting");
        }
        self.state = LinkState::Closed;
        self.transport.close();
    }

    fn drain_transport(&mut self) -> Result<(), TransportError> {
        while let Some(chunk) = self.transport.receive()? {
            self.recv_buffer.extend_from_slice(&chunk);
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        channel: Channel,
        payload: Vec<u8>,
    ) -> Result<Option<GatewayEvent>, LinkError> {
        let event = match channel {
            Channel::VideoStream => GatewayEvent::VideoFrame { payload },
            Channel::VideoStreamHeader => GatewayEvent::VideoStreamHeader { payload },
            Channel::Inputs => GatewayEvent::InputAck { payload },
            Channel::ViewerControl => GatewayEvent::ViewerControl { payload },
            Channel::ClientRemoteOperations => {
                let mut reader = ByteReader::new(&payload);
                let header = RemoteOperationHeader::de(&mut reader)?;
                let body = reader.read_bytes(header.payload_size as usize)?.to_vec();
                GatewayEvent::RemoteOperation {
                    origin: header.client_id,
                    request_id: header.request_id,
                    payload: body,
                }
            }
            Channel::EditorRemoteOperations => GatewayEvent::EditorOperation { payload },
            Channel::BroadcastClients => GatewayEvent::ClientsChanged { payload },
            Channel::BroadcastVideoStream => GatewayEvent::BroadcastVideoFrame { payload },
            Channel::BroadcastScriptEvents => GatewayEvent::ScriptEvent { payload },
            Channel::Heartbeat => {
                return Ok(self
                    .heartbeat
                    .acked()
                    .map(|round_trip| GatewayEvent::HeartbeatLatency { round_trip }));
            }
            Channel::Registration => {
                warn!("GatewayLink: registration frame after authentication; skipping");
                return Ok(None);
            }
            reserved => {
                // audio/asset/profiler and deprecated ids: accepted, not decoded
                trace!("GatewayLink: skipping {} bytes on {:?}", payload.len(), reserved);
                return Ok(None);
            }
        };
        Ok(Some(event))
    }

    fn maintain_heartbeat(&mut self) -> Result<(), LinkError> {
        if !matches!(self.state, LinkState::Connected) {
            return Ok(());
        }

        if let Some(missed) = self.heartbeat.check_overdue() {
            warn!("GatewayLink: heartbeat ack missed ({missed} consecutive)");
            if missed >= self.config.missed_ack_budget {
                return Err(LinkError::HeartbeatTimeout { missed });
            }
        }

        if self.heartbeat.due() {
            self.send(Channel::Heartbeat, &[])?;
            self.heartbeat.mark_sent();
        }
        Ok(())
    }
}

impl Drop for GatewayLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
