use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use scenelink_shared::{ComponentKind, ComponentKinds, ComponentValue, Rtid, Uuid};

use crate::error::RegistryError;

use super::entity::Entity;

/// One flush-time batch: every entity whose `component` changed since the
/// last flush, with its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentBatch {
    pub component: &'static str,
    pub kind: ComponentKind,
    pub entries: Vec<BatchEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub rtid: Rtid,
    pub id: Uuid,
    pub value: ComponentValue,
}

/// Accumulated changes of one auto-broadcast entity, drained when pushed to
/// other connected clients.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastUpdate {
    pub rtid: Rtid,
    pub id: Uuid,
    pub components: HashMap<&'static str, ComponentValue>,
}

/// One entity's pushed component values in a server-push reconciliation,
/// addressed by EUID.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteComponentUpdate {
    pub id: Uuid,
    pub components: HashMap<String, ComponentValue>,
}

/// The local entity cache: an arena indexed by RTID, an EUID multimap for
/// multiply-instanced sub-scenes, and the dirty/broadcast bookkeeping.
///
/// Two independent clocks govern the bookkeeping: the dirty set is cleared
/// by every flush, while broadcast entries accumulate across flushes until
/// drained. Clearing one never touches the other.
pub struct EntityRegistry {
    entities: HashMap<Rtid, Entity>,
    by_euid: HashMap<Uuid, Vec<Rtid>>,
    dirty: HashMap<Rtid, HashSet<ComponentKind>>,
    broadcast: HashMap<Rtid, HashSet<ComponentKind>>,
    kinds: ComponentKinds,
    /// This client's id; pushes originating here are echoes and ignored
    local_client: Option<Uuid>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            by_euid: HashMap::new(),
            dirty: HashMap::new(),
            broadcast: HashMap::new(),
            kinds: ComponentKinds::new(),
            local_client: None,
        }
    }

    /// Records the client id assigned at authentication, enabling echo
    /// suppression on inbound update pushes.
    pub fn set_local_client(&mut self, client_id: Uuid) {
        self.local_client = Some(client_id);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // -- registration --

    /// Registers an entity. Requires a non-null RTID and EUID; fails if an
    /// entity with the same RTID is already registered (never overwrites).
    pub fn add(&mut self, entity: Entity) -> Result<(), RegistryError> {
        if entity.rtid().is_null() || entity.id().is_nil() {
            return Err(RegistryError::NullIdentity);
        }
        let rtid = entity.rtid();
        if self.entities.contains_key(&rtid) {
            return Err(RegistryError::DuplicateRtid { rtid });
        }
        trace!("EntityRegistry: registering {} ({})", rtid, entity.id());
        self.by_euid.entry(entity.id()).or_default().push(rtid);
        self.entities.insert(rtid, entity);
        Ok(())
    }

    /// Unregisters an entity, deleting both index entries and any
    /// outstanding bookkeeping. Fails if the RTID was never registered.
    pub fn remove(&mut self, rtid: Rtid) -> Result<Entity, RegistryError> {
        let entity = self
            .entities
            .remove(&rtid)
            .ok_or(RegistryError::NotRegistered { rtid })?;
        if let Some(instances) = self.by_euid.get_mut(&entity.id()) {
            instances.retain(|instance| *instance != rtid);
            if instances.is_empty() {
                self.by_euid.remove(&entity.id());
            }
        }
        self.dirty.remove(&rtid);
        self.broadcast.remove(&rtid);
        Ok(entity)
    }

    pub fn get(&self, rtid: Rtid) -> Option<&Entity> {
        self.entities.get(&rtid)
    }

    pub fn entity_mut(&mut self, rtid: Rtid) -> Option<&mut Entity> {
        self.entities.get_mut(&rtid)
    }

    /// Every registered instance sharing this EUID (a sub-scene instanced
    /// more than once yields distinct RTIDs for the same EUID)
    pub fn find_by_euid(&self, id: &Uuid) -> Vec<&Entity> {
        self.by_euid
            .get(id)
            .map(|instances| {
                instances
                    .iter()
                    .filter_map(|rtid| self.entities.get(rtid))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, rtid: Rtid) -> bool {
        self.entities.contains_key(&rtid)
    }

    // -- mutation tracking --

    /// Writes a component value on a registered entity and marks the
    /// (entity, component) pair dirty for the next flush. The component name
    /// must be in the fixed table shared with the server.
    pub fn set_component(
        &mut self,
        rtid: Rtid,
        name: &str,
        value: ComponentValue,
    ) -> Result<(), RegistryError> {
        let kind = self
            .kinds
            .name_to_kind(name)
            .ok_or_else(|| RegistryError::UnknownComponent {
                name: name.to_string(),
            })?;
        let entity = self
            .entities
            .get_mut(&rtid)
            .ok_or(RegistryError::NotRegistered { rtid })?;
        entity.insert_component(kind, value);
        self.dirty.entry(rtid).or_default().insert(kind);
        Ok(())
    }

    pub fn get_component(&self, rtid: Rtid, name: &str) -> Option<&ComponentValue> {
        let kind = self.kinds.name_to_kind(name)?;
        self.entities.get(&rtid)?.component(&kind)
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    // -- flush --

    /// Per-frame flush: gathers all dirty entities into one batch per unique
    /// component kind touched, clears the dirty set, and copies the touched
    /// kinds of auto-broadcast entities into the broadcast set (accumulating
    /// per entity, never overwriting).
    pub fn advance_frame(&mut self) -> Vec<ComponentBatch> {
        let mut batches: HashMap<ComponentKind, ComponentBatch> = HashMap::new();

        for (rtid, kinds) in self.dirty.drain() {
            let entity = match self.entities.get(&rtid) {
                Some(entity) => entity,
                // removed after being marked dirty; nothing to send
                None => continue,
            };

            for kind in &kinds {
                let value = match entity.component(kind) {
                    Some(value) => value.clone(),
                    None => continue,
                };
                let name = match self.kinds.kind_to_name(kind) {
                    Some(name) => name,
                    None => continue,
                };
                batches
                    .entry(*kind)
                    .or_insert_with(|| ComponentBatch {
                        component: name,
                        kind: *kind,
                        entries: Vec::new(),
                    })
                    .entries
                    .push(BatchEntry {
                        rtid,
                        id: entity.id(),
                        value,
                    });
            }

            if entity.auto_broadcast() {
                self.broadcast.entry(rtid).or_default().extend(kinds);
            }
        }

        let mut batches: Vec<ComponentBatch> = batches.into_values().collect();
        // deterministic flush order for the wire and the tests
        batches.sort_by_key(|batch| batch.component);
        for batch in &mut batches {
            batch.entries.sort_by_key(|entry| entry.rtid);
        }
        if !batches.is_empty() {
            debug!("EntityRegistry: flushing {} component batches", batches.len());
        }
        batches
    }

    /// Accumulated component names per auto-broadcast entity that have been
    /// flushed but not yet pushed to other clients.
    pub fn pending_broadcasts(&self) -> usize {
        self.broadcast.len()
    }

    /// Drains the broadcast set, pairing each accumulated component with its
    /// current value.
    pub fn drain_broadcasts(&mut self) -> Vec<BroadcastUpdate> {
        let mut updates = Vec::with_capacity(self.broadcast.len());
        for (rtid, kinds) in self.broadcast.drain() {
            let entity = match self.entities.get(&rtid) {
                Some(entity) => entity,
                None => continue,
            };
            let mut components = HashMap::new();
            for kind in kinds {
                if let (Some(name), Some(value)) =
                    (self.kinds.kind_to_name(&kind), entity.component(&kind))
                {
                    components.insert(name, value.clone());
                }
            }
            updates.push(BroadcastUpdate {
                rtid,
                id: entity.id(),
                components,
            });
        }
        updates.sort_by_key(|update| update.rtid);
        updates
    }

    // -- server-push reconciliation --

    /// Merges an inbound entities-updated push. Entities are matched by EUID
    /// (the origin may reference entities this client has not resolved by
    /// RTID); pushed values merge directly, bypassing the dirty/broadcast
    /// pipeline so the merge cannot re-enter the flush loop as an echo.
    ///
    /// A push originating from this client is ignored entirely.
    /// Returns the RTIDs whose entities were mutated.
    pub fn apply_remote_update(
        &mut self,
        origin: &Uuid,
        updates: &[RemoteComponentUpdate],
    ) -> Vec<Rtid> {
        if Some(*origin) == self.local_client {
            trace!("EntityRegistry: suppressing echo of our own update");
            return Vec::new();
        }

        let mut touched = Vec::new();
        for update in updates {
            let instances = match self.by_euid.get(&update.id) {
                Some(instances) => instances.clone(),
                None => continue,
            };
            for rtid in instances {
                let entity = match self.entities.get_mut(&rtid) {
                    Some(entity) => entity,
                    None => continue,
                };
                for (name, value) in &update.components {
                    entity.insert_component(ComponentKind::of(name), value.clone());
                }
                touched.push(rtid);
            }
        }
        touched
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
