use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;

use scenelink_shared::{ByteReader, ComponentKind, FrameMetadata, Rtid, Timer, Uuid};

use crate::{
    broker::{
        BrokerChannel, BrokerEvent, EntityRecord, EntityUpdateRecord, FindQuery, ResponseKey,
        ResponsePayload, SceneStats,
    },
    config::{LinkConfig, SessionInfo},
    error::{BrokerError, ClientError, LinkError, RegistryError},
    gateway::{GatewayEvent, GatewayLink},
    transport::Transport,
    world::{Entity, EntityRegistry, RemoteComponentUpdate},
};

/// Everything a consumer can observe from one `process_events` pass
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Gateway authentication succeeded
    GatewayConnected { client_id: Uuid },
    /// The gateway link failed; reconnection belongs to the caller
    GatewayDisconnected { reason: LinkError },
    /// The broker confirmed the join
    BrokerConnected,
    /// The broker channel failed; outstanding requests were failed too
    BrokerDisconnected { reason: BrokerError },

    /// One rendered frame: decoded metadata plus the still-encoded bytes
    /// for the video decoder
    VideoFrame {
        metadata: FrameMetadata,
        encoded: Vec<u8>,
    },
    VideoStreamHeader { payload: Vec<u8> },
    InputAck { payload: Vec<u8> },
    ViewerControl { payload: Vec<u8> },
    RemoteOperation {
        origin: Uuid,
        request_id: u32,
        payload: Vec<u8>,
    },
    EditorOperation { payload: Vec<u8> },
    ClientsChanged { payload: Vec<u8> },
    BroadcastVideoFrame { payload: Vec<u8> },
    HeartbeatLatency { round_trip: Duration },

    /// A spawn confirmation promoted its pending placeholder
    EntitySpawned { key: ResponseKey, rtid: Rtid, id: Uuid },
    /// A find/resolve/children response registered these entities
    EntityResolved { key: ResponseKey, rtids: Vec<Rtid> },
    /// A delete confirmation removed these entities
    EntityRemoved { key: ResponseKey, rtids: Vec<Rtid> },
    /// A server push merged component values into these entities
    EntityUpdated { rtids: Vec<Rtid> },
    /// The server answered a request with an error payload
    RequestFailed { key: ResponseKey, error: BrokerError },

    ClientJoined { client_id: Uuid },
    ClientLeft { client_id: Uuid },
    SceneStats { stats: SceneStats },
    ScriptEvent { payload: Value },
}

/// Outcome of an entity lookup by EUID
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Already mirrored locally
    Cached(Vec<Rtid>),
    /// A find request is in flight; completion arrives as
    /// [`ClientEvent::EntityResolved`] carrying this key
    Requested(ResponseKey),
}

struct PendingSpawn {
    name: String,
}

/// The one handle a consumer holds: owns the gateway link, the broker
/// channel and the entity registry, and pumps all three cooperatively.
/// There is exactly one gateway link and one broker channel per client; no
/// global state.
pub struct Client {
    config: LinkConfig,
    session: SessionInfo,
    gateway: Option<GatewayLink>,
    broker: Option<BrokerChannel>,
    registry: EntityRegistry,
    flush_timer: Timer,
    pending_spawns: HashMap<ResponseKey, PendingSpawn>,
    client_id: Option<Uuid>,
}

impl Client {
    pub fn new(session: SessionInfo, config: LinkConfig) -> Self {
        let flush_timer = Timer::new(config.flush_interval);
        Self {
            config,
            session,
            gateway: None,
            broker: None,
            registry: EntityRegistry::new(),
            flush_timer,
            pending_spawns: HashMap::new(),
            client_id: None,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// The client id the gateway assigned at authentication
    pub fn client_id(&self) -> Option<Uuid> {
        self.client_id
    }

    pub fn latency(&self) -> Option<Duration> {
        self.gateway.as_ref().and_then(GatewayLink::latency)
    }

    // -- connection management --

    /// Hands a freshly opened transport to a new gateway link. The
    /// authentication handshake completes during `process_events`.
    pub fn connect_gateway(&mut self, transport: Box<dyn Transport>) -> Result<(), ClientError> {
        let session_key = self
            .session
            .session_key
            .clone()
            .ok_or(BrokerError::NotJoinable)
            .map_err(ClientError::Broker)?;
        let link = GatewayLink::connect(
            transport,
            &session_key,
            &self.session.client_name,
            self.config.clone(),
        )?;
        self.gateway = Some(link);
        Ok(())
    }

    /// Hands a freshly opened transport to a new broker channel. Fails fast
    /// unless the session is joinable.
    pub fn connect_broker(&mut self, transport: Box<dyn Transport>) -> Result<(), ClientError> {
        let channel = BrokerChannel::connect(transport, &self.session)?;
        self.broker = Some(channel);
        Ok(())
    }

    /// Disconnects both links; idempotent
    pub fn disconnect(&mut self) {
        if let Some(mut link) = self.gateway.take() {
            link.disconnect();
        }
        if let Some(mut channel) = self.broker.take() {
            channel.disconnect();
        }
    }

    // -- scene operations --

    /// Requests a new entity from the broker. A pending placeholder is held
    /// until the confirmation promotes it to a registered entry with the
    /// server-assigned RTID and EUID.
    pub fn spawn_entity(
        &mut self,
        name: &str,
        components: HashMap<String, Value>,
    ) -> Result<ResponseKey, ClientError> {
        let broker = self.broker.as_mut().ok_or(ClientError::BrokerNotConnected)?;
        let key = broker.spawn_entity(name, components)?;
        self.pending_spawns.insert(
            key,
            PendingSpawn {
                name: name.to_string(),
            },
        );
        Ok(key)
    }

    /// Number of creation requests still awaiting their confirmation
    pub fn pending_spawns(&self) -> usize {
        self.pending_spawns.len()
    }

    pub fn delete_entities(&mut self, rtids: &[Rtid]) -> Result<ResponseKey, ClientError> {
        let broker = self.broker.as_mut().ok_or(ClientError::BrokerNotConnected)?;
        Ok(broker.delete_entities(rtids)?)
    }

    /// Looks up an entity by EUID, hitting the local cache first. A miss
    /// issues a find request; the resolved entities are registered before
    /// [`ClientEvent::EntityResolved`] surfaces them.
    pub fn resolve_entity(&mut self, id: &Uuid) -> Result<Resolution, ClientError> {
        let cached: Vec<Rtid> = self
            .registry
            .find_by_euid(id)
            .iter()
            .map(|entity| entity.rtid())
            .collect();
        if !cached.is_empty() {
            return Ok(Resolution::Cached(cached));
        }
        let broker = self.broker.as_mut().ok_or(ClientError::BrokerNotConnected)?;
        let key = broker.find_entities(FindQuery {
            id: Some(id.to_string()),
            ..FindQuery::default()
        })?;
        Ok(Resolution::Requested(key))
    }

    /// Resolves the ancestors of an entity the local cache cannot place yet
    pub fn resolve_ancestors(&mut self, id: &Uuid) -> Result<ResponseKey, ClientError> {
        let broker = self.broker.as_mut().ok_or(ClientError::BrokerNotConnected)?;
        Ok(broker.resolve_ancestors(id)?)
    }

    pub fn get_children(&mut self, rtid: Rtid) -> Result<ResponseKey, ClientError> {
        let broker = self.broker.as_mut().ok_or(ClientError::BrokerNotConnected)?;
        Ok(broker.get_children(rtid)?)
    }

    /// Writes a component on a registered entity, marking it dirty for the
    /// next flush
    pub fn set_component(
        &mut self,
        rtid: Rtid,
        name: &str,
        value: Value,
    ) -> Result<(), RegistryError> {
        self.registry.set_component(rtid, name, value)
    }

    /// Sends a remote operation (e.g. a screen-space ray cast) on the
    /// gateway; the response arrives as [`ClientEvent::RemoteOperation`]
    /// with the same request id.
    pub fn send_remote_operation(
        &mut self,
        request_id: u32,
        payload: &[u8],
    ) -> Result<(), ClientError> {
        let gateway = self
            .gateway
            .as_mut()
            .ok_or(ClientError::GatewayNotConnected)?;
        Ok(gateway.send_remote_operation(request_id, payload)?)
    }

    // -- the cooperative pump --

    /// One cooperative pass: pumps the gateway link, pumps the broker
    /// channel, promotes completed requests into the registry, and runs the
    /// periodic dirty flush. All registry mutation happens on this thread of
    /// control.
    pub fn process_events(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        self.pump_gateway(&mut events);
        self.pump_broker(&mut events);
        self.flush_if_due(&mut events);
        events
    }

    fn pump_gateway(&mut self, events: &mut Vec<ClientEvent>) {
        let gateway = match self.gateway.as_mut() {
            Some(gateway) => gateway,
            None => return,
        };

        let gateway_events = match gateway.receive() {
            Ok(gateway_events) => gateway_events,
            Err(reason) => {
                warn!("Client: gateway link failed: {reason}");
                self.gateway = None;
                events.push(ClientEvent::GatewayDisconnected { reason });
                return;
            }
        };

        for event in gateway_events {
            match event {
                GatewayEvent::Connected { client_id } => {
                    self.client_id = Some(client_id);
                    self.registry.set_local_client(client_id);
                    events.push(ClientEvent::GatewayConnected { client_id });
                }
                GatewayEvent::VideoFrame { payload } => {
                    // metadata prefixes the encoded frame; its fixed stride
                    // tells us exactly where the video bytes start
                    let mut reader = ByteReader::new(&payload);
                    match FrameMetadata::de(&mut reader) {
                        Ok(metadata) => {
                            let encoded = payload[reader.consumed()..].to_vec();
                            events.push(ClientEvent::VideoFrame { metadata, encoded });
                        }
                        Err(error) => {
                            let reason = LinkError::Wire(error);
                            warn!("Client: malformed frame metadata: {reason}");
                            if let Some(mut link) = self.gateway.take() {
                                link.disconnect();
                            }
                            events.push(ClientEvent::GatewayDisconnected { reason });
                            return;
                        }
                    }
                }
                GatewayEvent::VideoStreamHeader { payload } => {
                    events.push(ClientEvent::VideoStreamHeader { payload });
                }
                GatewayEvent::InputAck { payload } => {
                    events.push(ClientEvent::InputAck { payload });
                }
                GatewayEvent::ViewerControl { payload } => {
                    events.push(ClientEvent::ViewerControl { payload });
                }
                GatewayEvent::RemoteOperation {
                    origin,
                    request_id,
                    payload,
                } => {
                    events.push(ClientEvent::RemoteOperation {
                        origin,
                        request_id,
                        payload,
                    });
                }
                GatewayEvent::EditorOperation { payload } => {
                    events.push(ClientEvent::EditorOperation { payload });
                }
                GatewayEvent::ClientsChanged { payload } => {
                    events.push(ClientEvent::ClientsChanged { payload });
                }
                GatewayEvent::BroadcastVideoFrame { payload } => {
                    events.push(ClientEvent::BroadcastVideoFrame { payload });
                }
                GatewayEvent::ScriptEvent { payload } => {
                    let payload = serde_json::from_slice(&payload).unwrap_or(Value::Null);
                    events.push(ClientEvent::ScriptEvent { payload });
                }
                GatewayEvent::HeartbeatLatency { round_trip } => {
                    events.push(ClientEvent::HeartbeatLatency { round_trip });
                }
            }
        }
    }

    fn pump_broker(&mut self, events: &mut Vec<ClientEvent>) {
        let broker = match self.broker.as_mut() {
            Some(broker) => broker,
            None => return,
        };

        let broker_events = match broker.receive() {
            Ok(broker_events) => broker_events,
            Err(reason) => {
                warn!("Client: broker channel failed: {reason}");
                self.broker = None;
                self.pending_spawns.clear();
                events.push(ClientEvent::BrokerDisconnected { reason });
                return;
            }
        };

        for event in broker_events {
            match event {
                BrokerEvent::Joined => events.push(ClientEvent::BrokerConnected),
                BrokerEvent::ResponseReady { key } => self.complete_request(key, events),
                BrokerEvent::EntitiesUpdated { origin, entities } => {
                    let updates = to_remote_updates(&entities);
                    let rtids = self.registry.apply_remote_update(&origin, &updates);
                    if !rtids.is_empty() {
                        events.push(ClientEvent::EntityUpdated { rtids });
                    }
                }
                BrokerEvent::SceneStats { stats } => {
                    events.push(ClientEvent::SceneStats { stats });
                }
                BrokerEvent::ClientJoined { client_id } => {
                    events.push(ClientEvent::ClientJoined { client_id });
                }
                BrokerEvent::ClientLeft { client_id } => {
                    events.push(ClientEvent::ClientLeft { client_id });
                }
                BrokerEvent::ScriptEvent { payload } => {
                    events.push(ClientEvent::ScriptEvent { payload });
                }
            }
        }
    }

    fn complete_request(&mut self, key: ResponseKey, events: &mut Vec<ClientEvent>) {
        let broker = match self.broker.as_mut() {
            Some(broker) => broker,
            None => return,
        };
        let result = match broker.take_response(&key) {
            Some(result) => result,
            None => return,
        };

        let payload = match result {
            Ok(payload) => payload,
            Err(error) => {
                self.pending_spawns.remove(&key);
                events.push(ClientEvent::RequestFailed { key, error });
                return;
            }
        };

        match payload {
            ResponsePayload::Spawned(record) => {
                let pending = self.pending_spawns.remove(&key);
                match self.register_record(&record) {
                    Ok(Some(rtid)) => {
                        debug!(
                            "Client: spawn of {:?} confirmed as {}",
                            pending.map(|p| p.name),
                            rtid
                        );
                        events.push(ClientEvent::EntitySpawned {
                            key,
                            rtid,
                            id: record.id.parse().unwrap_or(Uuid::NIL),
                        });
                    }
                    Ok(None) => {}
                    Err(error) => {
                        events.push(ClientEvent::RequestFailed {
                            key,
                            error: BrokerError::MalformedMessage {
                                detail: error.to_string(),
                            },
                        });
                    }
                }
            }
            ResponsePayload::Found(records)
            | ResponsePayload::Ancestors(records)
            | ResponsePayload::Children(records) => {
                let mut rtids = Vec::new();
                for record in &records {
                    match self.register_record(record) {
                        Ok(Some(rtid)) => rtids.push(rtid),
                        // already registered; idempotent de-duplication
                        Ok(None) => rtids.push(Rtid::new(record.rtid)),
                        Err(error) => {
                            warn!("Client: skipping unregistrable entity: {error}");
                        }
                    }
                }
                events.push(ClientEvent::EntityResolved { key, rtids });
            }
            ResponsePayload::Deleted(rtids) => {
                let mut removed = Vec::new();
                for rtid in rtids {
                    // deletion is confirmed; absent entries were never mirrored
                    if self.registry.remove(rtid).is_ok() {
                        removed.push(rtid);
                    }
                }
                events.push(ClientEvent::EntityRemoved { key, rtids: removed });
            }
            ResponsePayload::Updated => {
                // batched component flush acknowledged; nothing to surface
            }
        }
    }

    /// Registers a server-returned entity record. `Ok(None)` means an entity
    /// with this RTID is already registered and the record was skipped.
    fn register_record(&mut self, record: &EntityRecord) -> Result<Option<Rtid>, RegistryError> {
        let rtid = Rtid::new(record.rtid);
        if self.registry.contains(rtid) {
            return Ok(None);
        }
        let id: Uuid = record
            .id
            .parse()
            .map_err(|_| RegistryError::NullIdentity)?;
        let mut entity = Entity::new(rtid, id);
        for (name, value) in &record.components {
            entity.insert_component(ComponentKind::of(name), value.clone());
        }
        self.registry.add(entity)?;
        Ok(Some(rtid))
    }

    fn flush_if_due(&mut self, events: &mut Vec<ClientEvent>) {
        if !self.flush_timer.ringing() {
            return;
        }
        self.flush_timer.reset();

        let broker = match self.broker.as_mut() {
            Some(broker) if broker.is_joined() => broker,
            _ => return,
        };
        if !self.registry.has_dirty() && self.registry.pending_broadcasts() == 0 {
            return;
        }

        for batch in self.registry.advance_frame() {
            let entities: Vec<EntityUpdateRecord> = batch
                .entries
                .into_iter()
                .map(|entry| EntityUpdateRecord {
                    id: entry.id.to_string(),
                    components: HashMap::from([(batch.component.to_string(), entry.value)]),
                })
                .collect();
            if let Err(reason) = broker.update_components(batch.component, entities) {
                warn!("Client: flush failed: {reason}");
                self.broker = None;
                self.pending_spawns.clear();
                events.push(ClientEvent::BrokerDisconnected { reason });
                return;
            }
        }

        let broadcasts = self.registry.drain_broadcasts();
        if !broadcasts.is_empty() {
            let entities: Vec<EntityUpdateRecord> = broadcasts
                .into_iter()
                .map(|update| EntityUpdateRecord {
                    id: update.id.to_string(),
                    components: update
                        .components
                        .into_iter()
                        .map(|(name, value)| (name.to_string(), value))
                        .collect(),
                })
                .collect();
            if let Err(reason) = broker.broadcast_updates(entities) {
                warn!("Client: broadcast push failed: {reason}");
                self.broker = None;
                self.pending_spawns.clear();
                events.push(ClientEvent::BrokerDisconnected { reason });
            }
        }
    }
}

fn to_remote_updates(entities: &[EntityUpdateRecord]) -> Vec<RemoteComponentUpdate> {
    entities
        .iter()
        .filter_map(|record| {
            let id: Uuid = record.id.parse().ok()?;
            Some(RemoteComponentUpdate {
                id,
                components: record.components.clone(),
            })
        })
        .collect()
}
