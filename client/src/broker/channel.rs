use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;

use scenelink_shared::{Rtid, Uuid};

use crate::{
    config::SessionInfo,
    error::BrokerError,
    transport::{Transport, TransportError},
};

use super::{
    message::{BrokerMessage, EntityRecord, EntityUpdateRecord, FindQuery, SceneStats},
    requests::{PendingRequests, RequestKind, ResponseKey, ResponsePayload},
};

/// Length prefix framing: `[len:u32 little-endian][json bytes]`
const LENGTH_PREFIX_SIZE: usize = 4;

enum BrokerState {
    /// Transport open, waiting for the join-confirmation push
    Joining,
    Joined,
    Closed,
}

/// Notifications surfaced by pumping a [`BrokerChannel`]. Confirmation
/// payloads are not events; they complete response keys instead.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    /// The join-confirmation push arrived; requests may be issued
    Joined,
    /// The confirmation for `key` arrived; redeem it with `take_response`
    ResponseReady { key: ResponseKey },
    /// Another client mutated entities; merge by EUID
    EntitiesUpdated {
        origin: Uuid,
        entities: Vec<EntityUpdateRecord>,
    },
    /// Scene-level counters changed
    SceneStats { stats: SceneStats },
    ClientJoined { client_id: Uuid },
    ClientLeft { client_id: Uuid },
    /// A script event broadcast through the broker
    ScriptEvent { payload: Value },
}

/// Owns one connection to the scene-authority service and correlates
/// request confirmations to pending requests by per-kind FIFO order.
pub struct BrokerChannel {
    transport: Box<dyn Transport>,
    state: BrokerState,
    recv_buffer: Vec<u8>,
    pending: PendingRequests,
}

impl BrokerChannel {
    /// Opens the channel. Fails fast unless the owning session is joinable
    /// (gateway address and session key already resolved). The channel stays
    /// in a joining state until the join-confirmation push arrives.
    pub fn connect(
        mut transport: Box<dyn Transport>,
        session: &SessionInfo,
    ) -> Result<Self, BrokerError> {
        if !session.is_joinable() {
            return Err(BrokerError::NotJoinable);
        }
        let session_key = session
            .session_key
            .clone()
            .unwrap_or_default();
        send_message(&mut *transport, &BrokerMessage::Join { session_key })?;
        Ok(Self {
            transport,
            state: BrokerState::Joining,
            recv_buffer: Vec::new(),
            pending: PendingRequests::new(),
        })
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.state, BrokerState::Joined)
    }

    /// Pumps the transport once, returning push notifications and
    /// response-ready markers in arrival order. A message type with no
    /// registered handler is a hard failure that closes the channel.
    pub fn receive(&mut self) -> Result<Vec<BrokerEvent>, BrokerError> {
        if matches!(self.state, BrokerState::Closed) {
            return Err(BrokerError::ChannelClosed);
        }

        if let Err(error) = self.drain_transport() {
            self.disconnect();
            return Err(error.into());
        }

        let mut events = Vec::new();
        while let Some(body) = self.next_frame() {
            match self.dispatch(&body, &mut events) {
                Ok(()) => {}
                Err(error) => {
                    self.disconnect();
                    return Err(error);
                }
            }
        }
        Ok(events)
    }

    /// Redeems a completed request. `None` until the confirmation arrives.
    pub fn take_response(
        &mut self,
        key: &ResponseKey,
    ) -> Option<Result<ResponsePayload, BrokerError>> {
        self.pending.take(key)
    }

    // -- requests --

    pub fn spawn_entity(
        &mut self,
        name: &str,
        components: HashMap<String, Value>,
    ) -> Result<ResponseKey, BrokerError> {
        self.request(
            RequestKind::Spawn,
            &BrokerMessage::SpawnEntity {
                name: name.to_string(),
                components,
            },
        )
    }

    pub fn delete_entities(&mut self, rtids: &[Rtid]) -> Result<ResponseKey, BrokerError> {
        self.request(
            RequestKind::Delete,
            &BrokerMessage::DeleteEntities {
                rtids: rtids.iter().map(Rtid::value).collect(),
            },
        )
    }

    pub fn find_entities(&mut self, query: FindQuery) -> Result<ResponseKey, BrokerError> {
        self.request(RequestKind::Find, &BrokerMessage::FindEntities { query })
    }

    pub fn resolve_ancestors(&mut self, id: &Uuid) -> Result<ResponseKey, BrokerError> {
        self.request(
            RequestKind::ResolveAncestors,
            &BrokerMessage::ResolveAncestors { id: id.to_string() },
        )
    }

    pub fn get_children(&mut self, rtid: Rtid) -> Result<ResponseKey, BrokerError> {
        self.request(
            RequestKind::Children,
            &BrokerMessage::GetChildren {
                rtid: rtid.value(),
            },
        )
    }

    /// Sends one batched component update: every entity whose `component`
    /// changed this flush, in one message.
    pub fn update_components(
        &mut self,
        component: &str,
        entities: Vec<EntityUpdateRecord>,
    ) -> Result<ResponseKey, BrokerError> {
        self.request(
            RequestKind::UpdateComponents,
            &BrokerMessage::UpdateComponents {
                component: component.to_string(),
                entities,
            },
        )
    }

    /// Pushes auto-broadcast changes to the other connected clients. No
    /// confirmation comes back, so no response key is minted.
    pub fn broadcast_updates(
        &mut self,
        entities: Vec<EntityUpdateRecord>,
    ) -> Result<(), BrokerError> {
        if !matches!(self.state, BrokerState::Joined) {
            return Err(BrokerError::ChannelClosed);
        }
        send_message(&mut *self.transport, &BrokerMessage::BroadcastUpdates { entities })
    }

    /// Closes the channel and fails every outstanding pending request with
    /// [`BrokerError::ChannelClosed`]. Idempotent.
    pub fn disconnect(&mut self) {
        if !matches!(self.state, BrokerState::Closed) {
            debug!(
                "BrokerChannel: disconnecting with {} outstanding requests",
                self.pending.outstanding()
            );
        }
        self.state = BrokerState::Closed;
        self.pending.fail_all(BrokerError::ChannelClosed);
        self.transport.close();
    }

    // -- internals --

    fn request(
        &mut self,
        kind: RequestKind,
        message: &BrokerMessage,
    ) -> Result<ResponseKey, BrokerError> {
        if !matches!(self.state, BrokerState::Joined) {
            return Err(BrokerError::ChannelClosed);
        }
        send_message(&mut *self.transport, message)?;
        Ok(self.pending.push(kind))
    }

    fn drain_transport(&mut self) -> Result<(), TransportError> {
        while let Some(chunk) = self.transport.receive()? {
            self.recv_buffer.extend_from_slice(&chunk);
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Vec<u8>> {
        if self.recv_buffer.len() < LENGTH_PREFIX_SIZE {
            return None;
        }
        let length = u32::from_le_bytes([
            self.recv_buffer[0],
            self.recv_buffer[1],
            self.recv_buffer[2],
            self.recv_buffer[3],
        ]) as usize;
        if self.recv_buffer.len() < LENGTH_PREFIX_SIZE + length {
            return None;
        }
        Some(
            self.recv_buffer
                .drain(..LENGTH_PREFIX_SIZE + length)
                .skip(LENGTH_PREFIX_SIZE)
                .collect(),
        )
    }

    fn dispatch(&mut self, body: &[u8], events: &mut Vec<BrokerEvent>) -> Result<(), BrokerError> {
        let value: Value = serde_json::from_slice(body).map_err(|error| {
            BrokerError::MalformedMessage {
                detail: error.to_string(),
            }
        })?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| BrokerError::MalformedMessage {
                detail: "missing type tag".to_string(),
            })?
            .to_string();

        if !BrokerMessage::known_tags().contains(&tag.as_str()) {
            return Err(BrokerError::UnhandledMessage { kind: tag });
        }

        let message: BrokerMessage =
            serde_json::from_value(value).map_err(|error| BrokerError::MalformedMessage {
                detail: format!("{tag}: {error}"),
            })?;

        match message {
            BrokerMessage::JoinSucceeded => {
                debug!("BrokerChannel: join confirmed");
                self.state = BrokerState::Joined;
                events.push(BrokerEvent::Joined);
            }

            BrokerMessage::SpawnConfirmed { entity } => {
                let key = self
                    .pending
                    .complete_oldest(RequestKind::Spawn, Ok(ResponsePayload::Spawned(entity)))?;
                events.push(BrokerEvent::ResponseReady { key });
            }
            BrokerMessage::DeleteConfirmed { rtids } => {
                let rtids = rtids.iter().map(|value| Rtid::new(*value)).collect();
                let key = self
                    .pending
                    .complete_oldest(RequestKind::Delete, Ok(ResponsePayload::Deleted(rtids)))?;
                events.push(BrokerEvent::ResponseReady { key });
            }
            BrokerMessage::FindConfirmed { entities } => {
                let key = self
                    .pending
                    .complete_oldest(RequestKind::Find, Ok(ResponsePayload::Found(entities)))?;
                events.push(BrokerEvent::ResponseReady { key });
            }
            BrokerMessage::AncestorsResolved { entities } => {
                let key = self.pending.complete_oldest(
                    RequestKind::ResolveAncestors,
                    Ok(ResponsePayload::Ancestors(entities)),
                )?;
                events.push(BrokerEvent::ResponseReady { key });
            }
            BrokerMessage::ChildrenRetrieved { entities } => {
                let key = self.pending.complete_oldest(
                    RequestKind::Children,
                    Ok(ResponsePayload::Children(entities)),
                )?;
                events.push(BrokerEvent::ResponseReady { key });
            }
            BrokerMessage::UpdateConfirmed => {
                let key = self
                    .pending
                    .complete_oldest(RequestKind::UpdateComponents, Ok(ResponsePayload::Updated))?;
                events.push(BrokerEvent::ResponseReady { key });
            }
            BrokerMessage::RequestFailed { request, message } => {
                let kind = RequestKind::from_tag(&request).ok_or_else(|| {
                    BrokerError::MalformedMessage {
                        detail: format!("requestFailed names unknown request {request}"),
                    }
                })?;
                warn!("BrokerChannel: {request} rejected: {message}");
                let key = self
                    .pending
                    .complete_oldest(kind, Err(BrokerError::Rejected { message }))?;
                events.push(BrokerEvent::ResponseReady { key });
            }

            BrokerMessage::EntitiesUpdated { origin, entities } => {
                let origin = parse_uuid(&origin)?;
                events.push(BrokerEvent::EntitiesUpdated { origin, entities });
            }
            BrokerMessage::SceneStats { stats } => {
                events.push(BrokerEvent::SceneStats { stats });
            }
            BrokerMessage::ClientJoined { client_id } => {
                events.push(BrokerEvent::ClientJoined {
                    client_id: parse_uuid(&client_id)?,
                });
            }
            BrokerMessage::ClientLeft { client_id } => {
                events.push(BrokerEvent::ClientLeft {
                    client_id: parse_uuid(&client_id)?,
                });
            }
            BrokerMessage::ScriptEvent { payload } => {
                events.push(BrokerEvent::ScriptEvent { payload });
            }

            // outbound-only tags arriving inbound
            BrokerMessage::Join { .. }
            | BrokerMessage::SpawnEntity { .. }
            | BrokerMessage::DeleteEntities { .. }
            | BrokerMessage::FindEntities { .. }
            | BrokerMessage::ResolveAncestors { .. }
            | BrokerMessage::GetChildren { .. }
            | BrokerMessage::UpdateComponents { .. }
            | BrokerMessage::BroadcastUpdates { .. } => {
                return Err(BrokerError::UnhandledMessage { kind: tag });
            }
        }
        Ok(())
    }
}

impl Drop for BrokerChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn parse_uuid(text: &str) -> Result<Uuid, BrokerError> {
    text.parse().map_err(|_| BrokerError::MalformedMessage {
        detail: format!("malformed uuid {text}"),
    })
}

fn send_message(
    transport: &mut dyn Transport,
    message: &BrokerMessage,
) -> Result<(), BrokerError> {
    let body = serde_json::to_vec(message).map_err(|error| BrokerError::MalformedMessage {
        detail: error.to_string(),
    })?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    transport.send(&frame)?;
    Ok(())
}
