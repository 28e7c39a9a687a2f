use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A remote entity as the broker reports it: session identity, persistent
/// identity, and the components it currently carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub rtid: u64,
    /// Canonical EUID text (lower-case hyphenated hex)
    pub id: String,
    #[serde(default)]
    pub components: HashMap<String, Value>,
}

/// Component values pushed for one entity, addressed by EUID. The origin
/// client may reference entities this client has not resolved by RTID yet,
/// so pushes never carry RTIDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdateRecord {
    pub id: String,
    pub components: HashMap<String, Value>,
}

/// Search criteria for a find request; at least one field is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
}

/// Scene-level counters pushed by the broker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneStats {
    #[serde(default)]
    pub entity_count: u64,
    #[serde(default)]
    pub client_count: u32,
}

/// Every message that travels the broker link, tagged by `type`.
/// Request/confirmation pairs correlate by per-kind FIFO order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrokerMessage {
    // -- outbound --
    #[serde(rename_all = "camelCase")]
    Join { session_key: String },
    #[serde(rename_all = "camelCase")]
    SpawnEntity {
        name: String,
        components: HashMap<String, Value>,
    },
    DeleteEntities { rtids: Vec<u64> },
    FindEntities { query: FindQuery },
    ResolveAncestors { id: String },
    GetChildren { rtid: u64 },
    #[serde(rename_all = "camelCase")]
    UpdateComponents {
        /// One batch per component type touched this flush
        component: String,
        entities: Vec<EntityUpdateRecord>,
    },
    /// Fire-and-forget push of auto-broadcast changes; fans out to the other
    /// connected clients as `entitiesUpdated`
    BroadcastUpdates { entities: Vec<EntityUpdateRecord> },

    // -- inbound confirmations (FIFO-correlated) --
    SpawnConfirmed { entity: EntityRecord },
    DeleteConfirmed { rtids: Vec<u64> },
    FindConfirmed { entities: Vec<EntityRecord> },
    AncestorsResolved { entities: Vec<EntityRecord> },
    ChildrenRetrieved { entities: Vec<EntityRecord> },
    UpdateConfirmed,
    /// Explicit error answer to the oldest pending request of `request` kind
    RequestFailed { request: String, message: String },

    // -- inbound pushes (never FIFO-correlated) --
    JoinSucceeded,
    #[serde(rename_all = "camelCase")]
    EntitiesUpdated {
        /// Client id of the originating client, canonical UUID text
        origin: String,
        entities: Vec<EntityUpdateRecord>,
    },
    SceneStats { stats: SceneStats },
    #[serde(rename_all = "camelCase")]
    ClientJoined { client_id: String },
    #[serde(rename_all = "camelCase")]
    ClientLeft { client_id: String },
    ScriptEvent { payload: Value },
}

impl BrokerMessage {
    /// The `type` tags this build understands. Anything else on the wire is
    /// protocol drift and handled as a hard failure.
    pub fn known_tags() -> &'static [&'static str] {
        &[
            "join",
            "spawnEntity",
            "deleteEntities",
            "findEntities",
            "resolveAncestors",
            "getChildren",
            "updateComponents",
            "broadcastUpdates",
            "spawnConfirmed",
            "deleteConfirmed",
            "findConfirmed",
            "ancestorsResolved",
            "childrenRetrieved",
            "updateConfirmed",
            "requestFailed",
            "joinSucceeded",
            "entitiesUpdated",
            "sceneStats",
            "clientJoined",
            "clientLeft",
            "scriptEvent",
        ]
    }
}
