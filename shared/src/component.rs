//! Component identity for the replicated entity model.
//!
//! Wire messages carry a stable 32-bit hash of the component's type name
//! instead of the name string. The name→hash mapping is a fixed table shared
//! by client and server builds; both sides must agree on the hash function
//! and the component set.

use std::collections::HashMap;
use std::fmt;

/// A 32-bit stable hash identifying a component type on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKind(u32);

impl ComponentKind {
    /// Hashes a component type name. FNV-1a, matching the server build.
    pub fn of(name: &str) -> Self {
        const FNV_OFFSET: u32 = 0x811c_9dc5;
        const FNV_PRIME: u32 = 0x0100_0193;
        let mut hash = FNV_OFFSET;
        for byte in name.as_bytes() {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        Self(hash)
    }

    pub fn from_wire(hash: u32) -> Self {
        Self(hash)
    }

    pub fn wire_hash(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component:{:08x}", self.0)
    }
}

/// A component's value: independently typed per component, absent when the
/// entity does not carry it. JSON values match the broker's message bodies.
pub type ComponentValue = serde_json::Value;

/// The fixed table of component type names shared by client and server
pub const COMPONENT_NAMES: &[&str] = &[
    "transform",
    "camera",
    "mesh",
    "name",
    "tags",
    "visibility",
    "hierarchy",
];

/// Bidirectional name↔hash lookup over the fixed component table
pub struct ComponentKinds {
    by_kind: HashMap<ComponentKind, &'static str>,
}

impl ComponentKinds {
    pub fn new() -> Self {
        let mut by_kind = HashMap::new();
        for name in COMPONENT_NAMES {
            by_kind.insert(ComponentKind::of(name), *name);
        }
        Self { by_kind }
    }

    /// Resolves a wire hash back to its type name. Unknown hashes are
    /// representable on the wire but unresolvable here.
    pub fn kind_to_name(&self, kind: &ComponentKind) -> Option<&'static str> {
        self.by_kind.get(kind).copied()
    }

    pub fn name_to_kind(&self, name: &str) -> Option<ComponentKind> {
        let kind = ComponentKind::of(name);
        self.by_kind.contains_key(&kind).then_some(kind)
    }
}

impl Default for ComponentKinds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_stable() {
        // FNV-1a reference value; the server build hard-codes the same table
        assert_eq!(ComponentKind::of(""), ComponentKind::from_wire(0x811c_9dc5));
        assert_eq!(ComponentKind::of("transform"), ComponentKind::of("transform"));
        assert_ne!(ComponentKind::of("transform"), ComponentKind::of("camera"));
    }

    #[test]
    fn table_is_bidirectional() {
        let kinds = ComponentKinds::new();
        for name in COMPONENT_NAMES {
            let kind = kinds.name_to_kind(name).unwrap();
            assert_eq!(kinds.kind_to_name(&kind), Some(*name));
        }
    }

    #[test]
    fn unknown_hashes_do_not_resolve() {
        let kinds = ComponentKinds::new();
        assert_eq!(kinds.kind_to_name(&ComponentKind::from_wire(0xdead_beef)), None);
        assert_eq!(kinds.name_to_kind("not-a-component"), None);
    }

    #[test]
    fn table_has_no_hash_collisions() {
        let kinds = ComponentKinds::new();
        assert_eq!(kinds.by_kind.len(), COMPONENT_NAMES.len());
    }
}
