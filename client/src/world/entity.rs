use std::collections::HashMap;

use scenelink_shared::{ComponentKind, ComponentValue, Rtid, Uuid};

/// Local mirror of one remote scene node: session identity (`rtid`),
/// persistent identity (`id`), and a sparse set of typed components.
///
/// Component writes go through [`crate::EntityRegistry::set_component`] so
/// the dirty bookkeeping sees them; entities hand out read access only.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    rtid: Rtid,
    id: Uuid,
    components: HashMap<ComponentKind, ComponentValue>,
    auto_broadcast: bool,
}

impl Entity {
    pub fn new(rtid: Rtid, id: Uuid) -> Self {
        Self {
            rtid,
            id,
            components: HashMap::new(),
            auto_broadcast: false,
        }
    }

    pub fn with_components(
        rtid: Rtid,
        id: Uuid,
        components: HashMap<ComponentKind, ComponentValue>,
    ) -> Self {
        Self {
            rtid,
            id,
            components,
            auto_broadcast: false,
        }
    }

    /// Session identity; unique in the registry, never stable across
    /// reconnects
    pub fn rtid(&self) -> Rtid {
        self.rtid
    }

    /// Persistent identity; shared by every instance of a multiply-instanced
    /// sub-scene
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn component(&self, kind: &ComponentKind) -> Option<&ComponentValue> {
        self.components.get(kind)
    }

    pub fn has_component(&self, kind: &ComponentKind) -> bool {
        self.components.contains_key(kind)
    }

    pub fn component_kinds(&self) -> impl Iterator<Item = &ComponentKind> {
        self.components.keys()
    }

    /// Whether flushed changes to this entity are additionally pushed to
    /// other connected clients
    pub fn auto_broadcast(&self) -> bool {
        self.auto_broadcast
    }

    pub fn set_auto_broadcast(&mut self, enabled: bool) {
        self.auto_broadcast = enabled;
    }

    pub(crate) fn insert_component(&mut self, kind: ComponentKind, value: ComponentValue) {
        self.components.insert(kind, value);
    }
}
